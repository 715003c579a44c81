/// Opening a session to a host failed.
///
/// Host-scoped: the orchestrator records the host as failed and moves on.
///
/// # Examples
///
/// ```rust
/// use dfmon_collector::error::ConnectionError;
///
/// let err = ConnectionError::new("filer01", "request timed out");
/// assert!(err.to_string().contains("filer01"));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("Collector: connection to {hostname} failed: {message}")]
pub struct ConnectionError {
    pub hostname: String,
    pub message: String,
}

impl ConnectionError {
    pub fn new(hostname: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            message: message.into(),
        }
    }
}

/// The sysDescr string matched no known host type.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Collector: no such host type known for sysDescr '{descr}'")]
pub struct UnrecognizedHostError {
    pub descr: String,
}

/// A GET or walk against an open session failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Collector: query {oid} on {hostname} failed: {message}")]
pub struct QueryError {
    pub hostname: String,
    pub oid: String,
    pub message: String,
}

/// The host type could not be determined.
///
/// Both cases are host-scoped: the host is recorded as failed and the run
/// moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedHostError),
}

/// A dotted OID string could not be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Collector: invalid OID '{0}'")]
pub struct OidParseError(pub String);
