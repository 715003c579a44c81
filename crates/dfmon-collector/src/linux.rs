use crate::disk::{walk_table, FsTable, WideColumns};
use crate::session::Session;
use crate::UsageSource;
use dfmon_common::types::{HostType, UsageMap};

/// UCD-SNMP-MIB::dskTable. Only filesystems listed by `disk` /
/// `includeAllDisks` in snmpd.conf appear here.
pub const DSK_TABLE: FsTable = FsTable {
    name: "ucd-dsk",
    mount: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 2],
    device: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 3],
    total_kb: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 6],
    used_kb: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 8],
    wide: Some(WideColumns::Split {
        total_high: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 12],
        total_low: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 11],
        used_high: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 16],
        used_low: &[1, 3, 6, 1, 4, 1, 2021, 9, 1, 15],
    }),
};

pub struct LinuxDisks;

impl UsageSource for LinuxDisks {
    fn name(&self) -> &str {
        DSK_TABLE.name
    }

    fn host_type(&self) -> HostType {
        HostType::Linux
    }

    fn fetch(&self, session: &mut dyn Session, target: &mut UsageMap) -> usize {
        walk_table(session, &DSK_TABLE, is_loop_device, target)
    }
}

/// Squashfs and image mounts show up on loop devices.
fn is_loop_device(device: &str) -> bool {
    device.starts_with("/dev/loop")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySession;
    use crate::session::SnmpValue;

    const DSK: &str = "1.3.6.1.4.1.2021.9.1";

    fn row(session: MemorySession, idx: u32, mount: &str, dev: &str, total: i64, used: i64) -> MemorySession {
        session
            .with_text(&format!("{DSK}.2.{idx}"), mount)
            .with_text(&format!("{DSK}.3.{idx}"), dev)
            .with(&format!("{DSK}.6.{idx}"), SnmpValue::Integer(total))
            .with(&format!("{DSK}.8.{idx}"), SnmpValue::Integer(used))
    }

    #[test]
    fn reads_local_filesystems_and_skips_pseudo_ones() {
        let mut session = MemorySession::new("lx01");
        session = row(session, 1, "/", "/dev/mapper/rhel-root", 52_403_200, 9_018_112);
        session = row(session, 2, "/home", "/dev/sdb1", 1_073_217_536, 612_345_678);
        session = row(session, 3, "/dev/shm", "tmpfs", 8_125_324, 0);
        session = row(session, 4, "/boot/efi", "/dev/sda1", 0, 0);
        session = row(session, 5, "/snap/core/1", "/dev/loop0", 100_000, 100_000);

        let mut map = UsageMap::new();
        let added = LinuxDisks.fetch(&mut session, &mut map);

        assert_eq!(added, 2);
        let root = &map["/dev/mapper/rhel-root"];
        assert_eq!(root.mount_path, "/");
        assert_eq!(root.total_kb, 52_403_200);
        assert_eq!(root.used_kb, 9_018_112);
        assert_eq!(map["/dev/sdb1"].mount_path, "/home");
    }

    #[test]
    fn failed_used_column_drops_rows_but_not_the_host() {
        let mut session = MemorySession::new("lx02");
        session = row(session, 1, "/", "/dev/sda2", 1000, 500);
        let mut session = session.failing_under(&format!("{DSK}.8"));

        let mut map = UsageMap::new();
        assert_eq!(LinuxDisks.fetch(&mut session, &mut map), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn negative_used_value_becomes_zero() {
        let mut session = row(MemorySession::new("lx03"), 1, "/data", "/dev/sdc1", 2048, -1);
        let mut map = UsageMap::new();
        assert_eq!(LinuxDisks.fetch(&mut session, &mut map), 1);
        assert_eq!(map["/dev/sdc1"].used_kb, 0);
    }

    #[test]
    fn split_columns_recover_large_filesystems() {
        // dskTotal and dskUsed saturate at 2^31 - 1 on net-snmp.
        const MAX32: i64 = 2_147_483_647;
        let mut session = row(MemorySession::new("lx04"), 1, "/archive", "/dev/sdd1", MAX32, MAX32)
            .with(&format!("{DSK}.11.1"), SnmpValue::Unsigned32(3_221_225_472))
            .with(&format!("{DSK}.12.1"), SnmpValue::Unsigned32(0))
            .with(&format!("{DSK}.15.1"), SnmpValue::Unsigned32(2_684_354_560))
            .with(&format!("{DSK}.16.1"), SnmpValue::Unsigned32(0));
        session = row(session, 2, "/scratch", "/dev/sde1", MAX32, 100)
            .with(&format!("{DSK}.11.2"), SnmpValue::Unsigned32(0))
            .with(&format!("{DSK}.12.2"), SnmpValue::Unsigned32(5))
            .with(&format!("{DSK}.15.2"), SnmpValue::Unsigned32(100))
            .with(&format!("{DSK}.16.2"), SnmpValue::Unsigned32(0));

        let mut map = UsageMap::new();
        assert_eq!(LinuxDisks.fetch(&mut session, &mut map), 2);
        assert_eq!(map["/dev/sdd1"].total_kb, 3_221_225_472);
        assert_eq!(map["/dev/sdd1"].used_kb, 2_684_354_560);
        assert_eq!(map["/dev/sde1"].total_kb, 21_474_836_480);
        assert_eq!(map["/dev/sde1"].used_kb, 100);
    }
}
