use crate::error::{ConnectionError, QueryError};
use crate::oid::Oid;
use snmp::{SyncSession, Value};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// sysUpTime.0, read once by [`SnmpConnector::connect`] to confirm the agent answers.
pub const SYS_UPTIME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];

/// Upper bound on rows returned by a single walk.
const MAX_WALK_ROWS: usize = 10_000;

/// Owned copy of an SNMP varbind value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    Counter32(u32),
    Unsigned32(u32),
    Timeticks(u32),
    Counter64(u64),
    IpAddress([u8; 4]),
    Null,
    /// A type this collector never reads (opaque, constructed, ...).
    Unsupported,
}

impl SnmpValue {
    pub fn string(s: &str) -> Self {
        SnmpValue::OctetString(s.as_bytes().to_vec())
    }

    /// The value as text, if it is an octet string. Trailing NULs and
    /// surrounding whitespace are stripped.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SnmpValue::OctetString(bytes) => Some(
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// One round of management queries against a single host.
pub trait Session {
    fn hostname(&self) -> &str;

    /// Reads a scalar. `Ok(None)` means the agent has no such object.
    fn get(&mut self, oid: &Oid) -> Result<Option<SnmpValue>, QueryError>;

    /// Reads every object under `prefix`, in agent order.
    fn walk(&mut self, prefix: &Oid) -> Result<Vec<(Oid, SnmpValue)>, QueryError>;
}

/// Opens sessions. One session per host, dropped after use.
pub trait Connector {
    fn connect(&self, hostname: &str) -> Result<Box<dyn Session>, ConnectionError>;
}

/// Transport settings shared by every session of a run.
#[derive(Debug, Clone)]
pub struct SnmpSettings {
    pub community: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self {
            community: "public".to_string(),
            port: 161,
            timeout: Duration::from_secs(5),
        }
    }
}

/// SNMP v2c over UDP.
pub struct SnmpConnector {
    settings: SnmpSettings,
}

impl SnmpConnector {
    pub fn new(settings: SnmpSettings) -> Self {
        Self { settings }
    }

    fn resolve(&self, hostname: &str) -> Result<SocketAddr, ConnectionError> {
        (hostname, self.settings.port)
            .to_socket_addrs()
            .map_err(|e| ConnectionError::new(hostname, format!("cannot resolve: {e}")))?
            .next()
            .ok_or_else(|| ConnectionError::new(hostname, "no address found"))
    }
}

impl Connector for SnmpConnector {
    fn connect(&self, hostname: &str) -> Result<Box<dyn Session>, ConnectionError> {
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return Err(ConnectionError::new(hostname, "empty hostname"));
        }

        let addr = self.resolve(hostname)?;
        let inner = SyncSession::new(
            addr,
            self.settings.community.as_bytes(),
            Some(self.settings.timeout),
            0,
        )
        .map_err(|e| ConnectionError::new(hostname, format!("cannot open socket: {e}")))?;

        let mut session = SnmpSession {
            hostname: hostname.to_string(),
            inner,
        };
        session
            .get(&Oid::from_slice(SYS_UPTIME))
            .map_err(|e| ConnectionError::new(hostname, e.message))?;

        tracing::debug!(host = %hostname, addr = %addr, "Opened SNMP session");
        Ok(Box::new(session))
    }
}

struct SnmpSession {
    hostname: String,
    inner: SyncSession,
}

impl SnmpSession {
    fn query_error(&self, oid: &Oid, message: impl Into<String>) -> QueryError {
        QueryError {
            hostname: self.hostname.clone(),
            oid: oid.to_string(),
            message: message.into(),
        }
    }
}

fn owned_value(value: Value<'_>) -> SnmpValue {
    match value {
        Value::Integer(n) => SnmpValue::Integer(n),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(id) => {
            let mut buf = [0u32; 128];
            match id.read_name(&mut buf) {
                Ok(arcs) => SnmpValue::ObjectIdentifier(Oid::from_slice(arcs)),
                Err(_) => SnmpValue::Unsupported,
            }
        }
        Value::Counter32(n) => SnmpValue::Counter32(n),
        Value::Unsigned32(n) => SnmpValue::Unsigned32(n),
        Value::Timeticks(n) => SnmpValue::Timeticks(n),
        Value::Counter64(n) => SnmpValue::Counter64(n),
        Value::IpAddress(ip) => SnmpValue::IpAddress(ip),
        Value::Null => SnmpValue::Null,
        _ => SnmpValue::Unsupported,
    }
}

impl Session for SnmpSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn get(&mut self, oid: &Oid) -> Result<Option<SnmpValue>, QueryError> {
        let result = match self.inner.get(oid.arcs()) {
            Ok(mut pdu) => {
                if pdu.error_status != 0 {
                    Err(format!("agent error status {}", pdu.error_status))
                } else {
                    Ok(pdu.varbinds.next().map(|(_, value)| owned_value(value)))
                }
            }
            Err(e) => Err(format!("{e:?}")),
        };
        result.map_err(|message| self.query_error(oid, message))
    }

    fn walk(&mut self, prefix: &Oid) -> Result<Vec<(Oid, SnmpValue)>, QueryError> {
        let mut rows = Vec::new();
        let mut cursor = prefix.clone();

        while rows.len() < MAX_WALK_ROWS {
            let next: Result<Option<(Oid, SnmpValue)>, String> =
                match self.inner.getnext(cursor.arcs()) {
                    // A non-zero status here is noSuchName from v1-style agents: end of view.
                    Ok(pdu) if pdu.error_status != 0 => Ok(None),
                    Ok(mut pdu) => match pdu.varbinds.next() {
                        Some((name, value)) => {
                            let mut buf = [0u32; 128];
                            match name.read_name(&mut buf) {
                                Ok(arcs) => {
                                    Ok(Some((Oid::from_slice(arcs), owned_value(value))))
                                }
                                Err(e) => Err(format!("malformed OID in response: {e:?}")),
                            }
                        }
                        // Exception values (endOfMibView, noSuchObject) fail to
                        // decode and surface as an empty varbind list.
                        None => Ok(None),
                    },
                    Err(e) => Err(format!("{e:?}")),
                };
            let next = next.map_err(|message| self.query_error(&cursor, message))?;

            match next {
                Some((oid, value)) if oid.starts_with(prefix) && oid > cursor => {
                    cursor = oid.clone();
                    rows.push((oid, value));
                }
                _ => return Ok(rows),
            }
        }

        tracing::warn!(
            host = %self.hostname,
            prefix = %prefix,
            rows = rows.len(),
            "Walk stopped at row limit"
        );
        Ok(rows)
    }
}
