use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of remote host, used to pick the disk usage strategy.
///
/// # Examples
///
/// ```
/// use dfmon_common::types::HostType;
///
/// let kind: HostType = "gpfs-extended".parse().unwrap();
/// assert_eq!(kind, HostType::GpfsExtended);
/// assert_eq!(kind.to_string(), "gpfs-extended");
/// assert!(kind.is_cluster());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostType {
    Linux,
    Netapp,
    Gpfs,
    GpfsExtended,
    Unknown,
}

impl HostType {
    /// True for clustered filesystem members.
    pub fn is_cluster(&self) -> bool {
        matches!(self, HostType::Gpfs | HostType::GpfsExtended)
    }
}

impl std::fmt::Display for HostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostType::Linux => write!(f, "linux"),
            HostType::Netapp => write!(f, "netapp"),
            HostType::Gpfs => write!(f, "gpfs"),
            HostType::GpfsExtended => write!(f, "gpfs-extended"),
            HostType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for HostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(HostType::Linux),
            "netapp" => Ok(HostType::Netapp),
            "gpfs" => Ok(HostType::Gpfs),
            "gpfs-extended" => Ok(HostType::GpfsExtended),
            "unknown" => Ok(HostType::Unknown),
            _ => Err(format!("unknown host type: {s}")),
        }
    }
}

/// Capacity facts for one filesystem, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFacts {
    pub mount_path: String,
    pub total_kb: u64,
    pub used_kb: u64,
}

/// Usage facts keyed by physical path (device or filer volume).
pub type UsageMap = BTreeMap<String, UsageFacts>;

/// Value written to `hosts.snmp_ok`.
///
/// # Examples
///
/// ```
/// use dfmon_common::types::{snmp_ok_code, UsageFacts, UsageMap};
///
/// let mut map = UsageMap::new();
/// assert_eq!(snmp_ok_code(false, &map), 0);
/// map.insert("/vol/vol0".into(), UsageFacts { mount_path: "/vol/vol0".into(), total_kb: 10, used_kb: 1 });
/// assert_eq!(snmp_ok_code(false, &map), 1);
/// assert_eq!(snmp_ok_code(true, &map), -1);
/// ```
pub fn snmp_ok_code(failed: bool, usage: &UsageMap) -> i64 {
    if failed {
        -1
    } else if usage.is_empty() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_type_round_trips_through_display() {
        for kind in [
            HostType::Linux,
            HostType::Netapp,
            HostType::Gpfs,
            HostType::GpfsExtended,
            HostType::Unknown,
        ] {
            assert_eq!(kind.to_string().parse::<HostType>().unwrap(), kind);
        }
    }

    #[test]
    fn host_type_rejects_unknown_names() {
        assert!("solaris".parse::<HostType>().is_err());
    }

    #[test]
    fn only_gpfs_variants_are_cluster_members() {
        assert!(HostType::Gpfs.is_cluster());
        assert!(HostType::GpfsExtended.is_cluster());
        assert!(!HostType::Linux.is_cluster());
        assert!(!HostType::Netapp.is_cluster());
        assert!(!HostType::Unknown.is_cluster());
    }
}
