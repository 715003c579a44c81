//! Host discovery and disk usage collection over SNMP.
//!
//! A [`session::Connector`] opens one [`session::Session`] per host. The
//! [`classify::Classifier`] turns the host's sysDescr and cluster probes into
//! a [`HostType`], and [`disk::fetch`] dispatches to the [`UsageSource`] for
//! that type to fill a [`UsageMap`].

pub mod classify;
pub mod disk;
pub mod error;
pub mod gpfs;
pub mod linux;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod netapp;
pub mod oid;
pub mod session;

use dfmon_common::types::{HostType, UsageMap};
use session::Session;

/// A per-host-type strategy for reading filesystem usage.
///
/// Adding a host type means adding one [`HostType`] variant and one
/// implementation, then mapping it in [`disk::source_for`].
pub trait UsageSource: Send + Sync {
    /// Short name used in log fields (e.g. `"ucd-dsk"`).
    fn name(&self) -> &str;

    /// The host type this source serves.
    fn host_type(&self) -> HostType;

    /// Adds this host's filesystems to `target` and returns how many rows
    /// were contributed. Query failures are logged, never returned: a broken
    /// column or row yields a partial contribution.
    fn fetch(&self, session: &mut dyn Session, target: &mut UsageMap) -> usize;
}
