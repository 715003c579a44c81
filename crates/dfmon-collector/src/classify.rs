use crate::error::{ResolveError, UnrecognizedHostError};
use crate::oid::Oid;
use crate::session::Session;
use dfmon_common::types::HostType;
use serde::{Deserialize, Serialize};

/// sysDescr.0
pub const SYS_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];

/// GPFS MIB cluster status table, populated only while mmfsd runs on the host.
pub const GPFS_CLUSTER_PROBE: &[u32] = &[1, 3, 6, 1, 4, 1, 2, 6, 212, 1];

/// GPFS MIB filesystem status table, the extended per-host cluster feature.
pub const GPFS_EXTENDED_PROBE: &[u32] = &[1, 3, 6, 1, 4, 1, 2, 6, 212, 3];

const NETAPP_MARKER: &str = "NetApp Release";
const LINUX_VERSION_MARKER: &str = "Linux version";

/// Maps a sysDescr string to a host type. Checks run in order; the first
/// match wins.
///
/// # Examples
///
/// ```
/// use dfmon_collector::classify::classify;
/// use dfmon_common::types::HostType;
///
/// let descr = "NetApp Release 8.2.4P4 7-Mode: Fri Jul 1 2016";
/// assert_eq!(classify(descr).unwrap(), HostType::Netapp);
/// assert_eq!(classify("Linux nfs01 3.10.0-1160.el7.x86_64 #1 SMP").unwrap(), HostType::Linux);
/// assert!(classify("This is an unrecognized sysDescr string").is_err());
/// ```
pub fn classify(descr: &str) -> Result<HostType, UnrecognizedHostError> {
    if descr.contains(NETAPP_MARKER) {
        return Ok(HostType::Netapp);
    }
    if descr.split_whitespace().next() == Some("Linux") || descr.contains(LINUX_VERSION_MARKER) {
        return Ok(HostType::Linux);
    }
    Err(UnrecognizedHostError {
        descr: descr.to_string(),
    })
}

/// Sub-trees whose presence marks a clustered filesystem member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProbes {
    pub member: Oid,
    pub extended: Oid,
}

impl Default for ClusterProbes {
    fn default() -> Self {
        Self {
            member: Oid::from_slice(GPFS_CLUSTER_PROBE),
            extended: Oid::from_slice(GPFS_EXTENDED_PROBE),
        }
    }
}

/// Resolves the [`HostType`] of a connected host.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    probes: ClusterProbes,
}

impl Classifier {
    pub fn new(probes: ClusterProbes) -> Self {
        Self { probes }
    }

    /// True when the cluster process sub-tree has any entries.
    /// Query errors count as "not a member".
    pub fn is_cluster_member(&self, session: &mut dyn Session) -> bool {
        probe(session, &self.probes.member)
    }

    /// Independent probe for the extended cluster feature. Same semantics as
    /// [`Classifier::is_cluster_member`].
    pub fn is_cluster_extended(&self, session: &mut dyn Session) -> bool {
        probe(session, &self.probes.extended)
    }

    /// Reads sysDescr and applies [`classify`], then the cluster probes.
    ///
    /// Cluster membership overrides the description: gateways usually also
    /// report a plain Linux sysDescr.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Query`] if sysDescr cannot be read, and
    /// [`ResolveError::Unrecognized`] when a non-member's description
    /// matches no known host type.
    pub fn resolve(&self, session: &mut dyn Session) -> Result<HostType, ResolveError> {
        let descr = session
            .get(&Oid::from_slice(SYS_DESCR))?
            .and_then(|v| v.as_text())
            .unwrap_or_default();
        let by_descr = classify(&descr);

        if self.is_cluster_member(session) {
            let kind = if self.is_cluster_extended(session) {
                HostType::GpfsExtended
            } else {
                HostType::Gpfs
            };
            tracing::debug!(host = %session.hostname(), kind = %kind, "Cluster probe matched");
            return Ok(kind);
        }

        Ok(by_descr?)
    }
}

fn probe(session: &mut dyn Session, prefix: &Oid) -> bool {
    match session.walk(prefix) {
        Ok(rows) => !rows.is_empty(),
        Err(e) => {
            tracing::debug!(host = %session.hostname(), error = %e, "Probe failed, assuming absent");
            false
        }
    }
}
