use crate::disk::{walk_table, FsTable, WideColumns};
use crate::session::Session;
use crate::UsageSource;
use dfmon_common::types::{HostType, UsageMap};

/// NETAPP-MIB::dfTable. `dfFileSys` is the volume path, `dfMountedOn` where
/// it is exported. `df64TotalKBytes` and `df64UsedKBytes` carry the full
/// capacity on ONTAP 7.3 and later.
pub const DF_TABLE: FsTable = FsTable {
    name: "netapp-df",
    mount: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 10],
    device: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 2],
    total_kb: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 3],
    used_kb: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 4],
    wide: Some(WideColumns::Counter64 {
        total_kb: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 29],
        used_kb: &[1, 3, 6, 1, 4, 1, 789, 1, 5, 4, 1, 30],
    }),
};

pub struct NetappVolumes;

impl UsageSource for NetappVolumes {
    fn name(&self) -> &str {
        DF_TABLE.name
    }

    fn host_type(&self) -> HostType {
        HostType::Netapp
    }

    fn fetch(&self, session: &mut dyn Session, target: &mut UsageMap) -> usize {
        walk_table(session, &DF_TABLE, is_snapshot_reserve, target)
    }
}

/// Every volume has a companion `.snapshot` row for its snapshot reserve.
fn is_snapshot_reserve(path: &str) -> bool {
    path.ends_with("/.snapshot")
}
