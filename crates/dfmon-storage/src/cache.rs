use crate::error::{Result, StorageError};
use crate::schema;
use chrono::{DateTime, Utc};
use dfmon_common::retry::RetryPolicy;
use dfmon_common::types::{snmp_ok_code, UsageFacts, UsageMap};
use rusqlite::types::ToSql;
use rusqlite::{CachedStatement, Connection, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pause between attempts to open the store.
pub const CONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Execution budget for every statement.
pub const STATEMENT_POLICY: RetryPolicy = RetryPolicy::fixed(3, Duration::from_millis(10));

const HOST_COLUMNS: &str = "host_id, hostname, snmp_ok, created, last_modified";
const DISK_USAGE_SELECT: &str = "SELECT df_id, mount_path, physical_path, total_kb, used_kb, group_name, created, last_modified FROM disk_usage";

/// A row of the `hosts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRow {
    pub host_id: i64,
    pub hostname: String,
    pub snmp_ok: i64,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A row of the `disk_usage` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskUsageRow {
    pub df_id: i64,
    pub mount_path: String,
    pub physical_path: String,
    pub total_kb: u64,
    pub used_kb: u64,
    pub group_name: String,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Input to [`CacheStore::upsert_disk_usage`]. All five fields are required;
/// they are optional here so incomplete records are rejected by the store
/// rather than silently defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskUsageUpsert {
    pub mount_path: Option<String>,
    pub physical_path: Option<String>,
    pub total_kb: Option<u64>,
    pub used_kb: Option<u64>,
    pub group_name: Option<String>,
}

impl DiskUsageUpsert {
    pub fn from_facts(physical_path: &str, facts: &UsageFacts, group_name: &str) -> Self {
        Self {
            mount_path: Some(facts.mount_path.clone()),
            physical_path: Some(physical_path.to_string()),
            total_kb: Some(facts.total_kb),
            used_kb: Some(facts.used_kb),
            group_name: Some(group_name.to_string()),
        }
    }
}

/// Outcome of a host's collection, as recorded in `hosts.snmp_ok`.
#[derive(Debug, Clone, Copy)]
pub enum HostOutcome<'a> {
    /// Connection or query error.
    Failed,
    /// Collection finished; the map may be empty.
    Collected(&'a UsageMap),
}

impl HostOutcome<'_> {
    /// -1 on error, 1 when usage was found, 0 otherwise.
    pub fn snmp_ok(&self) -> i64 {
        match self {
            HostOutcome::Failed => snmp_ok_code(true, &UsageMap::new()),
            HostOutcome::Collected(map) => snmp_ok_code(false, map),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

/// The collector's SQLite cache.
///
/// One handle, one caller at a time. Cross-process contention is handled
/// only by the statement retry budget.
pub struct CacheStore {
    conn: Connection,
    path: PathBuf,
}

impl CacheStore {
    /// Opens (creating if needed) the store at `path` and bootstraps the
    /// schema. Opening is attempted up to `db_tries` times with
    /// [`CONNECT_PAUSE`] between attempts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CacheUnavailable`] when the budget is spent or
    /// the schema cannot be created.
    pub fn prepare(path: &Path, db_tries: u32) -> Result<Self> {
        Self::prepare_with(path, RetryPolicy::fixed(db_tries, CONNECT_PAUSE))
    }

    /// [`CacheStore::prepare`] with an explicit connect policy.
    pub fn prepare_with(path: &Path, connect: RetryPolicy) -> Result<Self> {
        let conn = connect
            .run("cache open", |_| open_connection(path))
            .map_err(|e| StorageError::CacheUnavailable {
                path: path.display().to_string(),
                attempts: e.attempts,
                message: e.last.to_string(),
            })?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store
            .bootstrap()
            .map_err(|e| StorageError::CacheUnavailable {
                path: path.display().to_string(),
                attempts: 1,
                message: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), "Initialized cache store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bootstrap(&self) -> Result<()> {
        for statement in schema::BOOTSTRAP {
            self.execute_update(statement, &[])?;
        }
        Ok(())
    }

    /// Runs `sql` and maps every result row with `map_row`.
    ///
    /// A prepare failure is returned at once (`attempts` = 0). Execution
    /// failures are retried per [`STATEMENT_POLICY`].
    pub fn execute<T, F>(&self, sql: &str, params: &[&dyn ToSql], mut map_row: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.run_statement(sql, |stmt| {
            stmt.query_map(params, &mut map_row)?
                .collect::<rusqlite::Result<Vec<T>>>()
        })
    }

    /// Like [`CacheStore::execute`] for statements without result rows.
    /// Returns the number of rows changed.
    pub fn execute_update(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        self.run_statement(sql, |stmt| stmt.execute(params))
    }

    /// Prepares `sql` once, then runs `op` on it under [`STATEMENT_POLICY`].
    pub(crate) fn run_statement<T, F>(&self, sql: &str, mut op: F) -> Result<T>
    where
        F: FnMut(&mut CachedStatement<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| statement_error(sql, 0, &e))?;
        STATEMENT_POLICY
            .run("statement", |_| op(&mut stmt))
            .map_err(|e| statement_error(sql, e.attempts, &e.last))
    }

    /// Records the outcome of collecting `hostname`. Returns the `snmp_ok`
    /// value written.
    ///
    /// Existing rows always get an UPDATE, even when nothing changed, so the
    /// `last_modified` trigger fires for every successful collection.
    pub fn upsert_host(&self, hostname: &str, outcome: HostOutcome<'_>) -> Result<i64> {
        let snmp_ok = outcome.snmp_ok();
        match self.host_id(hostname)? {
            Some(host_id) => {
                self.execute_update(
                    "UPDATE hosts SET snmp_ok = ?1 WHERE host_id = ?2",
                    &[&snmp_ok, &host_id],
                )?;
            }
            None => {
                self.execute_update(
                    "INSERT INTO hosts (hostname, snmp_ok) VALUES (?1, ?2)",
                    &[&hostname, &snmp_ok],
                )?;
            }
        }
        Ok(snmp_ok)
    }

    fn host_id(&self, hostname: &str) -> Result<Option<i64>> {
        let ids = self.execute(
            "SELECT host_id FROM hosts WHERE hostname = ?1",
            &[&hostname],
            |row| row.get(0),
        )?;
        Ok(ids.into_iter().next())
    }

    /// Inserts or updates the row keyed by `record.physical_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] before touching the store when a
    /// field is missing or a capacity does not fit a SQLite integer.
    pub fn upsert_disk_usage(&self, record: &DiskUsageUpsert) -> Result<Upserted> {
        let mount_path = record
            .mount_path
            .as_deref()
            .ok_or_else(|| StorageError::missing("mount_path"))?;
        let physical_path = record
            .physical_path
            .as_deref()
            .ok_or_else(|| StorageError::missing("physical_path"))?;
        let total_kb = sql_kb("total_kb", record.total_kb)?;
        let used_kb = sql_kb("used_kb", record.used_kb)?;
        let group_name = record
            .group_name
            .as_deref()
            .ok_or_else(|| StorageError::missing("group_name"))?;

        let existing = self.execute(
            "SELECT df_id FROM disk_usage WHERE physical_path = ?1",
            &[&physical_path],
            |row| row.get::<_, i64>(0),
        )?;

        match existing.first() {
            Some(df_id) => {
                self.execute_update(
                    "UPDATE disk_usage SET mount_path = ?1, total_kb = ?2, used_kb = ?3, group_name = ?4 WHERE df_id = ?5",
                    &[&mount_path, &total_kb, &used_kb, &group_name, df_id],
                )?;
                Ok(Upserted::Updated)
            }
            None => {
                self.execute_update(
                    "INSERT INTO disk_usage (mount_path, physical_path, total_kb, used_kb, group_name) VALUES (?1, ?2, ?3, ?4, ?5)",
                    &[&mount_path, &physical_path, &total_kb, &used_kb, &group_name],
                )?;
                Ok(Upserted::Inserted)
            }
        }
    }

    /// Rows of `disk_usage` where column `key` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Validation`] if `key` is not a column of the table.
    pub fn fetch(&self, key: &str, value: &dyn ToSql) -> Result<Vec<DiskUsageRow>> {
        if !schema::DISK_USAGE_COLUMNS.contains(&key) {
            return Err(StorageError::Validation {
                field: key.to_string(),
                reason: "is not a disk_usage column".to_string(),
            });
        }
        let sql = format!("{DISK_USAGE_SELECT} WHERE {key} = ?1 ORDER BY df_id");
        self.execute(&sql, &[value], disk_usage_from_row)
    }

    pub fn fetch_host(&self, hostname: &str) -> Result<Option<HostRow>> {
        let sql = format!("SELECT {HOST_COLUMNS} FROM hosts WHERE hostname = ?1");
        let rows = self.execute(&sql, &[&hostname], host_from_row)?;
        Ok(rows.into_iter().next())
    }

    pub fn list_hosts(&self) -> Result<Vec<HostRow>> {
        let sql = format!("SELECT {HOST_COLUMNS} FROM hosts ORDER BY hostname");
        self.execute(&sql, &[], host_from_row)
    }

    pub fn disk_usage_count(&self) -> Result<u64> {
        let counts = self.execute("SELECT COUNT(*) FROM disk_usage", &[], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(counts
            .first()
            .map(|n| u64::try_from(*n).unwrap_or_default())
            .unwrap_or_default())
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    // Lock contention is left to the statement retry budget.
    conn.busy_timeout(Duration::ZERO)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

fn statement_error(sql: &str, attempts: u32, err: &rusqlite::Error) -> StorageError {
    StorageError::Statement {
        sql: sql.trim().to_string(),
        attempts,
        message: err.to_string(),
    }
}

fn sql_kb(field: &str, value: Option<u64>) -> Result<i64> {
    let value = value.ok_or_else(|| StorageError::missing(field))?;
    i64::try_from(value).map_err(|_| StorageError::Validation {
        field: field.to_string(),
        reason: format!("value {value} is out of range"),
    })
}

fn millis(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(DateTime::from_timestamp_millis)
}

fn host_from_row(row: &Row<'_>) -> rusqlite::Result<HostRow> {
    Ok(HostRow {
        host_id: row.get(0)?,
        hostname: row.get(1)?,
        snmp_ok: row.get(2)?,
        created: millis(row.get(3)?),
        last_modified: millis(row.get(4)?),
    })
}

fn disk_usage_from_row(row: &Row<'_>) -> rusqlite::Result<DiskUsageRow> {
    Ok(DiskUsageRow {
        df_id: row.get(0)?,
        mount_path: row.get(1)?,
        physical_path: row.get(2)?,
        total_kb: u64::try_from(row.get::<_, i64>(3)?).unwrap_or_default(),
        used_kb: u64::try_from(row.get::<_, i64>(4)?).unwrap_or_default(),
        group_name: row.get(5)?,
        created: millis(row.get(6)?),
        last_modified: millis(row.get(7)?),
    })
}
