use chrono::{DateTime, Utc};
use dfmon_collector::classify::Classifier;
use dfmon_collector::disk;
use dfmon_collector::error::ResolveError;
use dfmon_collector::session::{Connector, Session};
use dfmon_common::types::{HostType, UsageMap};
use dfmon_storage::{CacheStore, DiskUsageUpsert, HostOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// Connection failed, or sysDescr was unreadable or unrecognized;
    /// recorded as `snmp_ok = -1`.
    Failed { reason: String },
    /// Collection finished with `rows` filesystems (possibly none).
    Collected { host_type: HostType, rows: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub hostname: String,
    pub host_type: Option<HostType>,
    pub status: HostStatus,
}

#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub hosts: Vec<HostReport>,
    /// Every filesystem seen this run, keyed by physical path.
    pub usage: UsageMap,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| matches!(h.status, HostStatus::Collected { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.hosts.len() - self.succeeded()
    }
}

/// Drives one inventory pass: connect, classify, fetch, persist, per host.
pub struct Collector<'a> {
    connector: &'a dyn Connector,
    classifier: Classifier,
    store: &'a CacheStore,
}

impl<'a> Collector<'a> {
    pub fn new(connector: &'a dyn Connector, classifier: Classifier, store: &'a CacheStore) -> Self {
        Self {
            connector,
            classifier,
            store,
        }
    }

    /// Visits every host exactly once, in order. Host failures are recorded
    /// and never stop the run.
    pub fn run(&self, hosts: &[String]) -> RunReport {
        let started_at = Utc::now();
        let mut usage = UsageMap::new();
        let reports = hosts
            .iter()
            .map(|hostname| self.collect_host(hostname, &mut usage))
            .collect();

        RunReport {
            started_at,
            finished_at: Utc::now(),
            hosts: reports,
            usage,
        }
    }

    fn collect_host(&self, hostname: &str, usage: &mut UsageMap) -> HostReport {
        let mut session = match self.connector.connect(hostname) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(host = %hostname, error = %e, "Connect failed");
                return self.record_failure(hostname, e.to_string());
            }
        };

        let host_type = match self.classifier.resolve(session.as_mut()) {
            Ok(kind) => kind,
            Err(ResolveError::Unrecognized(e)) => {
                tracing::warn!(host = %hostname, error = %e, "Host type not recognized");
                let mut report = self.record_failure(hostname, e.to_string());
                report.host_type = Some(HostType::Unknown);
                return report;
            }
            Err(e) => {
                tracing::warn!(host = %hostname, error = %e, "Host type query failed");
                return self.record_failure(hostname, e.to_string());
            }
        };

        let found = fetch_usage(session.as_mut(), host_type);
        drop(session);

        for (physical_path, facts) in &found {
            let record = DiskUsageUpsert::from_facts(physical_path, facts, hostname);
            if let Err(e) = self.store.upsert_disk_usage(&record) {
                tracing::warn!(host = %hostname, path = %physical_path, error = %e, "Failed to store disk usage");
            }
        }
        if let Err(e) = self
            .store
            .upsert_host(hostname, HostOutcome::Collected(&found))
        {
            tracing::warn!(host = %hostname, error = %e, "Failed to store host status");
        }

        let rows = found.len();
        tracing::info!(host = %hostname, host_type = %host_type, rows = rows, "Host collected");
        usage.extend(found);

        HostReport {
            hostname: hostname.to_string(),
            host_type: Some(host_type),
            status: HostStatus::Collected { host_type, rows },
        }
    }

    fn record_failure(&self, hostname: &str, reason: String) -> HostReport {
        if let Err(e) = self.store.upsert_host(hostname, HostOutcome::Failed) {
            tracing::warn!(host = %hostname, error = %e, "Failed to store host status");
        }
        HostReport {
            hostname: hostname.to_string(),
            host_type: None,
            status: HostStatus::Failed { reason },
        }
    }
}

fn fetch_usage(session: &mut dyn Session, host_type: HostType) -> UsageMap {
    let mut found = UsageMap::new();
    disk::fetch(session, host_type, &mut found);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfmon_collector::memory::{MemoryConnector, MemorySession};
    use dfmon_collector::session::SnmpValue;
    use tempfile::TempDir;

    const DESCR: &str = "1.3.6.1.2.1.1.1.0";
    const DF: &str = "1.3.6.1.4.1.789.1.5.4.1";
    const DSK: &str = "1.3.6.1.4.1.2021.9.1";

    fn filer(name: &str) -> MemorySession {
        let mut session =
            MemorySession::new(name).with_text(DESCR, "NetApp Release 8.2.4P4 7-Mode: Fri Jul 1 2016");
        for (idx, path, total, used) in [
            (1, "/vol/sata800/", 838_860_800, 412_000_000),
            (2, "/vol/sata800/.snapshot", 209_715_200, 1_000),
            (3, "/vol/sata900/", 943_718_400, 5_000),
        ] {
            session = session
                .with_text(&format!("{DF}.2.{idx}"), path)
                .with_text(&format!("{DF}.10.{idx}"), path)
                .with(&format!("{DF}.3.{idx}"), SnmpValue::Integer(total))
                .with(&format!("{DF}.4.{idx}"), SnmpValue::Integer(used));
        }
        session
    }

    fn linux(name: &str) -> MemorySession {
        MemorySession::new(name)
            .with_text(DESCR, "Linux web01 5.4.0-150-generic #167-Ubuntu SMP x86_64")
            .with_text(&format!("{DSK}.2.1"), "/")
            .with_text(&format!("{DSK}.3.1"), "/dev/sda1")
            .with(&format!("{DSK}.6.1"), SnmpValue::Integer(41_152_736))
            .with(&format!("{DSK}.8.1"), SnmpValue::Integer(9_000_000))
    }

    fn store() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::prepare(&dir.path().join("cache.db"), 1).unwrap();
        (dir, store)
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn every_host_is_attempted_once() {
        let (_dir, store) = store();
        let connector = MemoryConnector::new()
            .with_host(filer("filer01"))
            .with_host(linux("web01"));
        let collector = Collector::new(&connector, Classifier::default(), &store);

        let report = collector.run(&hosts(&["filer01", "offline", "web01"]));

        assert_eq!(report.hosts.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.hosts[0].status,
            HostStatus::Collected {
                host_type: HostType::Netapp,
                rows: 2
            }
        );
        assert!(matches!(report.hosts[1].status, HostStatus::Failed { .. }));
        assert_eq!(report.hosts[2].host_type, Some(HostType::Linux));
        assert_eq!(report.usage.len(), 3);

        let offline = store.fetch_host("offline").unwrap().unwrap();
        assert_eq!(offline.snmp_ok, -1);
        assert_eq!(store.fetch_host("filer01").unwrap().unwrap().snmp_ok, 1);
        assert_eq!(store.list_hosts().unwrap().len(), 3);
    }

    #[test]
    fn usage_is_stored_under_the_collecting_host() {
        let (_dir, store) = store();
        let connector = MemoryConnector::new().with_host(filer("filer01"));
        let collector = Collector::new(&connector, Classifier::default(), &store);

        collector.run(&hosts(&["filer01"]));

        assert_eq!(store.disk_usage_count().unwrap(), 2);
        let rows = store.fetch("group_name", &"filer01").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].physical_path, "/vol/sata800");
        assert_eq!(rows[0].used_kb, 412_000_000);
    }

    #[test]
    fn repeated_runs_update_in_place() {
        let (_dir, store) = store();
        let connector = MemoryConnector::new().with_host(linux("web01"));
        let collector = Collector::new(&connector, Classifier::default(), &store);

        collector.run(&hosts(&["web01"]));
        collector.run(&hosts(&["web01"]));

        assert_eq!(store.disk_usage_count().unwrap(), 1);
        assert_eq!(store.list_hosts().unwrap().len(), 1);
    }

    #[test]
    fn unreadable_descr_is_a_host_failure() {
        let (_dir, store) = store();
        let connector = MemoryConnector::new()
            .with_host(MemorySession::new("flaky").failing_under("1.3.6.1.2.1.1"));
        let collector = Collector::new(&connector, Classifier::default(), &store);

        let report = collector.run(&hosts(&["flaky"]));

        assert_eq!(report.failed(), 1);
        assert_eq!(store.fetch_host("flaky").unwrap().unwrap().snmp_ok, -1);
    }

    #[test]
    fn unrecognized_host_is_recorded_as_failed() {
        let (_dir, store) = store();
        let connector = MemoryConnector::new().with_host(
            MemorySession::new("switch01").with_text(DESCR, "This is an unrecognized sysDescr string"),
        );
        let collector = Collector::new(&connector, Classifier::default(), &store);

        let report = collector.run(&hosts(&["switch01"]));

        assert_eq!(report.failed(), 1);
        assert_eq!(report.hosts[0].host_type, Some(HostType::Unknown));
        assert!(matches!(report.hosts[0].status, HostStatus::Failed { .. }));
        assert!(report.usage.is_empty());
        assert_eq!(store.fetch_host("switch01").unwrap().unwrap().snmp_ok, -1);
        assert_eq!(store.disk_usage_count().unwrap(), 0);
    }

    #[test]
    fn cluster_members_store_no_usage() {
        let (_dir, store) = store();
        let member = linux("gpfs01").with_text("1.3.6.1.4.1.2.6.212.1.1.1.0", "cluster01");
        let connector = MemoryConnector::new().with_host(member);
        let collector = Collector::new(&connector, Classifier::default(), &store);

        let report = collector.run(&hosts(&["gpfs01"]));

        assert_eq!(report.hosts[0].host_type, Some(HostType::Gpfs));
        assert_eq!(store.disk_usage_count().unwrap(), 0);
    }
}
