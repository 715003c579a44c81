use crate::error::OidParseError;
use serde::{Deserialize, Serialize};

/// An SNMP object identifier. Ordering is lexicographic by arc, which is the
/// order agents return rows in.
///
/// # Examples
///
/// ```
/// use dfmon_collector::oid::Oid;
///
/// let table: Oid = "1.3.6.1.4.1.2021.9.1".parse().unwrap();
/// let cell: Oid = ".1.3.6.1.4.1.2021.9.1.2.1".parse().unwrap();
/// assert!(cell.starts_with(&table));
/// assert_eq!(cell.suffix(&table), Some(&[2, 1][..]));
/// assert_eq!(table.to_string(), "1.3.6.1.4.1.2021.9.1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The arcs after `prefix`, or `None` when `prefix` does not match.
    pub fn suffix(&self, prefix: &Oid) -> Option<&[u32]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Err(OidParseError(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|arc| arc.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map(Oid)
            .map_err(|_| OidParseError(s.to_string()))
    }
}

impl TryFrom<String> for Oid {
    type Error = OidParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Oid>().is_err());
        assert!("1.3.x.1".parse::<Oid>().is_err());
        assert!("1..3".parse::<Oid>().is_err());
    }

    #[test]
    fn ordering_follows_arcs_not_text() {
        let a: Oid = "1.3.6.1.2".parse().unwrap();
        let b: Oid = "1.3.6.1.10".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn suffix_requires_whole_prefix() {
        let col: Oid = "1.3.6.1.4.1.789.1.5.4.1.2".parse().unwrap();
        let other: Oid = "1.3.6.1.4.1.789.1.5.4.1.20.7".parse().unwrap();
        assert_eq!(other.suffix(&col), None);
    }
}
