//! Table and trigger definitions. Each entry is a single statement and safe
//! to re-run against an existing store.

/// Current time as Unix epoch milliseconds, evaluated by SQLite.
macro_rules! now_ms {
    () => {
        "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)"
    };
}

pub const HOSTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS hosts (
    host_id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL UNIQUE,
    snmp_ok INTEGER NOT NULL DEFAULT 0,
    created INTEGER,
    last_modified INTEGER
)";

pub const DISK_USAGE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS disk_usage (
    df_id INTEGER PRIMARY KEY AUTOINCREMENT,
    mount_path TEXT NOT NULL,
    physical_path TEXT NOT NULL UNIQUE,
    total_kb INTEGER NOT NULL CHECK (total_kb >= 0),
    used_kb INTEGER NOT NULL CHECK (used_kb >= 0),
    group_name TEXT NOT NULL,
    created INTEGER,
    last_modified INTEGER
)";

pub const DISK_USAGE_GROUP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_disk_usage_group ON disk_usage(group_name)";

/// `last_modified` on hosts only moves for successful collections.
pub const HOSTS_CREATED_TRIGGER: &str = concat!(
    "
CREATE TRIGGER IF NOT EXISTS hosts_created AFTER INSERT ON hosts
BEGIN
    UPDATE hosts SET
        created = ",
    now_ms!(),
    ",
        last_modified = CASE WHEN NEW.snmp_ok = 1 THEN ",
    now_ms!(),
    " ELSE NULL END
    WHERE host_id = NEW.host_id;
END"
);

pub const HOSTS_MODIFIED_TRIGGER: &str = concat!(
    "
CREATE TRIGGER IF NOT EXISTS hosts_modified AFTER UPDATE ON hosts
WHEN NEW.snmp_ok = 1
BEGIN
    UPDATE hosts SET last_modified = ",
    now_ms!(),
    " WHERE host_id = NEW.host_id;
END"
);

pub const DISK_USAGE_CREATED_TRIGGER: &str = concat!(
    "
CREATE TRIGGER IF NOT EXISTS disk_usage_created AFTER INSERT ON disk_usage
BEGIN
    UPDATE disk_usage SET
        created = ",
    now_ms!(),
    ",
        last_modified = ",
    now_ms!(),
    "
    WHERE df_id = NEW.df_id;
END"
);

pub const DISK_USAGE_MODIFIED_TRIGGER: &str = concat!(
    "
CREATE TRIGGER IF NOT EXISTS disk_usage_modified AFTER UPDATE ON disk_usage
BEGIN
    UPDATE disk_usage SET last_modified = ",
    now_ms!(),
    " WHERE df_id = NEW.df_id;
END"
);

/// Bootstrap order: tables before the triggers that reference them.
pub const BOOTSTRAP: &[&str] = &[
    HOSTS_TABLE,
    DISK_USAGE_TABLE,
    DISK_USAGE_GROUP_INDEX,
    HOSTS_CREATED_TRIGGER,
    HOSTS_MODIFIED_TRIGGER,
    DISK_USAGE_CREATED_TRIGGER,
    DISK_USAGE_MODIFIED_TRIGGER,
];

/// Columns of `disk_usage` accepted as lookup keys.
pub const DISK_USAGE_COLUMNS: &[&str] = &[
    "df_id",
    "mount_path",
    "physical_path",
    "total_kb",
    "used_kb",
    "group_name",
    "created",
    "last_modified",
];
