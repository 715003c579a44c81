//! In-memory [`Session`] and [`Connector`] for tests, backed by a fixed OID
//! table. Available to other crates with the `testing` feature.

use crate::error::{ConnectionError, QueryError};
use crate::oid::Oid;
use crate::session::{Connector, Session, SnmpValue};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    hostname: String,
    objects: BTreeMap<Oid, SnmpValue>,
    failing: Vec<Oid>,
}

impl MemorySession {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            ..Default::default()
        }
    }

    /// Adds an object. Panics on a malformed OID literal.
    pub fn with(mut self, oid: &str, value: SnmpValue) -> Self {
        let oid: Oid = oid.parse().unwrap_or_else(|e| panic!("{e}"));
        self.objects.insert(oid, value);
        self
    }

    pub fn with_text(self, oid: &str, text: &str) -> Self {
        self.with(oid, SnmpValue::string(text))
    }

    /// Makes every query touching `prefix` fail, as a timed-out agent would.
    pub fn failing_under(mut self, prefix: &str) -> Self {
        let oid: Oid = prefix.parse().unwrap_or_else(|e| panic!("{e}"));
        self.failing.push(oid);
        self
    }

    fn check(&self, oid: &Oid) -> Result<(), QueryError> {
        let broken = self
            .failing
            .iter()
            .any(|f| oid.starts_with(f) || f.starts_with(oid));
        if broken {
            return Err(QueryError {
                hostname: self.hostname.clone(),
                oid: oid.to_string(),
                message: "request timed out".to_string(),
            });
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn get(&mut self, oid: &Oid) -> Result<Option<SnmpValue>, QueryError> {
        self.check(oid)?;
        Ok(self.objects.get(oid).cloned())
    }

    fn walk(&mut self, prefix: &Oid) -> Result<Vec<(Oid, SnmpValue)>, QueryError> {
        self.check(prefix)?;
        Ok(self
            .objects
            .range::<Oid, _>((Bound::Excluded(prefix.clone()), Bound::Unbounded))
            .take_while(|(oid, _)| oid.starts_with(prefix))
            .map(|(oid, value)| (oid.clone(), value.clone()))
            .collect())
    }
}

/// Hands out clones of registered sessions; unknown hosts fail to connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    hosts: HashMap<String, MemorySession>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, session: MemorySession) -> Self {
        self.hosts.insert(session.hostname.clone(), session);
        self
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, hostname: &str) -> Result<Box<dyn Session>, ConnectionError> {
        self.hosts
            .get(hostname)
            .cloned()
            .map(|s| Box::new(s) as Box<dyn Session>)
            .ok_or_else(|| ConnectionError::new(hostname, "no response from agent"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_stays_inside_prefix() {
        let mut session = MemorySession::new("h")
            .with("1.3.6.1.2.1.5", SnmpValue::Integer(2))
            .with("1.3.6.1.2.10", SnmpValue::Integer(3));
        let rows = session.walk(&"1.3.6.1.2.1".parse().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn walk_skips_object_at_the_prefix() {
        let mut session = MemorySession::new("h")
            .with("1.3.6.1.2.1", SnmpValue::Integer(1))
            .with("1.3.6.1.2.1.5", SnmpValue::Integer(2));
        let rows = session.walk(&"1.3.6.1.2.1".parse().unwrap()).unwrap();
        let child: Oid = "1.3.6.1.2.1.5".parse().unwrap();
        assert_eq!(rows, vec![(child, SnmpValue::Integer(2))]);
    }

    #[test]
    fn failing_prefix_breaks_walks_and_gets() {
        let mut session = MemorySession::new("h")
            .with("1.3.6.1.2.1.1.1.0", SnmpValue::string("Linux"))
            .failing_under("1.3.6.1.2.1.1");
        assert!(session.walk(&"1.3.6.1.2.1".parse().unwrap()).is_err());
        assert!(session.get(&"1.3.6.1.2.1.1.1.0".parse().unwrap()).is_err());
    }

    #[test]
    fn unknown_host_is_a_connection_error() {
        let connector = MemoryConnector::new().with_host(MemorySession::new("known"));
        assert!(connector.connect("known").is_ok());
        let err = connector.connect("ghost").err().unwrap();
        assert_eq!(err.hostname, "ghost");
    }
}
