use crate::oid::Oid;
use crate::session::{Session, SnmpValue};
use crate::{gpfs, linux, netapp, UsageSource};
use dfmon_common::types::{HostType, UsageFacts, UsageMap};
use std::collections::BTreeMap;

/// Column layout of a filesystem table: parallel columns sharing a row
/// index.
#[derive(Debug, Clone, Copy)]
pub struct FsTable {
    pub name: &'static str,
    pub mount: &'static [u32],
    pub device: &'static [u32],
    /// 32-bit capacity columns. They wrap for filesystems of 2 TiB and up.
    pub total_kb: &'static [u32],
    pub used_kb: &'static [u32],
    /// 64-bit capacity columns, preferred when the agent serves them.
    pub wide: Option<WideColumns>,
}

/// Where a table keeps capacities that do not fit 32 bits.
#[derive(Debug, Clone, Copy)]
pub enum WideColumns {
    /// One Counter64 column per capacity.
    Counter64 {
        total_kb: &'static [u32],
        used_kb: &'static [u32],
    },
    /// Each capacity split into high and low 32-bit halves.
    Split {
        total_high: &'static [u32],
        total_low: &'static [u32],
        used_high: &'static [u32],
        used_low: &'static [u32],
    },
}

#[derive(Debug, Default)]
struct RawRow {
    mount: Option<String>,
    device: Option<String>,
    total_kb: Option<u64>,
    used_kb: Option<u64>,
    wide_total: Option<u64>,
    wide_used: Option<u64>,
    total_high: Option<u64>,
    total_low: Option<u64>,
    used_high: Option<u64>,
    used_low: Option<u64>,
}

impl RawRow {
    /// Capacities from the wide columns when they are complete and non-zero,
    /// otherwise from the 32-bit ones.
    fn capacity(&self) -> (Option<u64>, Option<u64>) {
        let total = self
            .wide_total
            .or_else(|| join_halves(self.total_high, self.total_low));
        let used = self
            .wide_used
            .or_else(|| join_halves(self.used_high, self.used_low));
        match (total, used) {
            (Some(total), Some(used)) if total > 0 => (Some(total), Some(used)),
            _ => (self.total_kb, self.used_kb),
        }
    }
}

fn join_halves(high: Option<u64>, low: Option<u64>) -> Option<u64> {
    Some(((high? & 0xFFFF_FFFF) << 32) | (low? & 0xFFFF_FFFF))
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Mount,
    Device,
    Total,
    Used,
    WideTotal,
    WideUsed,
    TotalHigh,
    TotalLow,
    UsedHigh,
    UsedLow,
}

impl FsTable {
    fn columns(&self) -> Vec<(Column, &'static [u32])> {
        let mut columns = vec![
            (Column::Mount, self.mount),
            (Column::Device, self.device),
            (Column::Total, self.total_kb),
            (Column::Used, self.used_kb),
        ];
        match self.wide {
            Some(WideColumns::Counter64 { total_kb, used_kb }) => {
                columns.push((Column::WideTotal, total_kb));
                columns.push((Column::WideUsed, used_kb));
            }
            Some(WideColumns::Split {
                total_high,
                total_low,
                used_high,
                used_low,
            }) => {
                columns.push((Column::TotalHigh, total_high));
                columns.push((Column::TotalLow, total_low));
                columns.push((Column::UsedHigh, used_high));
                columns.push((Column::UsedLow, used_low));
            }
            None => {}
        }
        columns
    }
}

/// Picks the usage strategy for a host type.
pub fn source_for(kind: HostType) -> &'static dyn UsageSource {
    match kind {
        HostType::Linux => &linux::LinuxDisks,
        HostType::Netapp => &netapp::NetappVolumes,
        HostType::Gpfs | HostType::GpfsExtended => &gpfs::GpfsMember,
        HostType::Unknown => &gpfs::NoSource,
    }
}

/// Adds the host's filesystems to `target` using the strategy for `kind`.
/// Returns the number of rows contributed.
pub fn fetch(session: &mut dyn Session, kind: HostType, target: &mut UsageMap) -> usize {
    let source = source_for(kind);
    let rows = source.fetch(session, target);
    tracing::debug!(
        host = %session.hostname(),
        source = source.name(),
        rows = rows,
        "Fetched disk usage"
    );
    rows
}

/// Walks `table` and inserts every row that passes the skip rules.
///
/// A row is skipped when any column is missing, when its device is not an
/// absolute path (pseudo or network filesystems), when `skip` matches the
/// device, or when its capacity is zero.
pub fn walk_table(
    session: &mut dyn Session,
    table: &FsTable,
    skip: impl Fn(&str) -> bool,
    target: &mut UsageMap,
) -> usize {
    let mut rows: BTreeMap<Vec<u32>, RawRow> = BTreeMap::new();

    for (column, arcs) in table.columns() {
        let prefix = Oid::from_slice(arcs);
        let cells = match session.walk(&prefix) {
            Ok(cells) => cells,
            Err(e) => {
                tracing::warn!(
                    host = %session.hostname(),
                    table = table.name,
                    error = %e,
                    "Column walk failed, continuing with partial data"
                );
                continue;
            }
        };

        for (oid, value) in cells {
            let Some(index) = oid.suffix(&prefix) else {
                continue;
            };
            let row = rows.entry(index.to_vec()).or_default();
            let kb = || Some(to_kb(&value, session.hostname(), &oid));
            match column {
                Column::Mount => row.mount = value.as_text(),
                Column::Device => row.device = value.as_text(),
                Column::Total => row.total_kb = kb(),
                Column::Used => row.used_kb = kb(),
                Column::WideTotal => row.wide_total = kb(),
                Column::WideUsed => row.wide_used = kb(),
                Column::TotalHigh => row.total_high = kb(),
                Column::TotalLow => row.total_low = kb(),
                Column::UsedHigh => row.used_high = kb(),
                Column::UsedLow => row.used_low = kb(),
            }
        }
    }

    let mut added = 0;
    for (index, row) in rows {
        let (total_kb, used_kb) = row.capacity();
        let (Some(device), Some(mount), Some(total_kb), Some(used_kb)) =
            (row.device, row.mount, total_kb, used_kb)
        else {
            tracing::debug!(host = %session.hostname(), table = table.name, ?index, "Incomplete row skipped");
            continue;
        };

        let physical_path = normalize_path(&device);
        if !physical_path.starts_with('/') || skip(&physical_path) || total_kb == 0 {
            continue;
        }

        target.insert(
            physical_path,
            UsageFacts {
                mount_path: normalize_path(&mount),
                total_kb,
                used_kb,
            },
        );
        added += 1;
    }
    added
}

/// Trims trailing slashes, keeping a lone `/`.
///
/// # Examples
///
/// ```
/// use dfmon_collector::disk::normalize_path;
///
/// assert_eq!(normalize_path("/vol/sata800/"), "/vol/sata800");
/// assert_eq!(normalize_path("/"), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() && path.trim().starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Converts a capacity cell to kilobytes. Anything that is not a
/// non-negative integer becomes 0 and is logged.
pub(crate) fn to_kb(value: &SnmpValue, hostname: &str, oid: &Oid) -> u64 {
    let parsed = match value {
        SnmpValue::Integer(n) => u64::try_from(*n).ok(),
        SnmpValue::Counter32(n) | SnmpValue::Unsigned32(n) => Some(u64::from(*n)),
        SnmpValue::Counter64(n) => Some(*n),
        SnmpValue::OctetString(_) => value.as_text().and_then(|t| t.parse::<u64>().ok()),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        tracing::warn!(host = %hostname, oid = %oid, value = ?value, "Capacity value not usable, using 0");
        0
    })
}
