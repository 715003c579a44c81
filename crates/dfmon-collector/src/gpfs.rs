use crate::session::Session;
use crate::UsageSource;
use dfmon_common::types::{HostType, UsageMap};

/// Cluster members. GPFS filesystems have no `/vol`-style per-mount entries
/// on the gateway, so nothing is enumerated here.
pub struct GpfsMember;

impl UsageSource for GpfsMember {
    fn name(&self) -> &str {
        "gpfs"
    }

    fn host_type(&self) -> HostType {
        HostType::Gpfs
    }

    fn fetch(&self, session: &mut dyn Session, _target: &mut UsageMap) -> usize {
        tracing::debug!(host = %session.hostname(), "Cluster member, per-mount usage not enumerated");
        0
    }
}

/// Hosts whose type could not be determined.
pub struct NoSource;

impl UsageSource for NoSource {
    fn name(&self) -> &str {
        "none"
    }

    fn host_type(&self) -> HostType {
        HostType::Unknown
    }

    fn fetch(&self, _session: &mut dyn Session, _target: &mut UsageMap) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::fetch;
    use crate::memory::MemorySession;
    use crate::session::SnmpValue;

    #[test]
    fn cluster_members_contribute_nothing_even_with_dsk_rows() {
        let mut session = MemorySession::new("gw01")
            .with_text("1.3.6.1.4.1.2021.9.1.2.1", "/")
            .with_text("1.3.6.1.4.1.2021.9.1.3.1", "/dev/sda1")
            .with("1.3.6.1.4.1.2021.9.1.6.1", SnmpValue::Integer(100))
            .with("1.3.6.1.4.1.2021.9.1.8.1", SnmpValue::Integer(10));
        let mut map = UsageMap::new();
        assert_eq!(fetch(&mut session, HostType::Gpfs, &mut map), 0);
        assert_eq!(fetch(&mut session, HostType::GpfsExtended, &mut map), 0);
        assert!(map.is_empty());
    }
}
