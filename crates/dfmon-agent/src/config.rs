use dfmon_collector::classify::{ClusterProbes, GPFS_CLUSTER_PROBE, GPFS_EXTENDED_PROBE};
use dfmon_collector::oid::Oid;
use dfmon_collector::session::SnmpSettings;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Hosts to inventory, processed in this order.
    pub hosts: Vec<String>,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Attempts to open the cache before the run is abandoned.
    #[serde(default = "default_db_tries")]
    pub db_tries: u32,
    #[serde(default)]
    pub snmp: SnmpConfig,
}

#[derive(Debug, Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cluster_probe_oid")]
    pub cluster_probe_oid: Oid,
    #[serde(default = "default_cluster_extended_oid")]
    pub cluster_extended_oid: Oid,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_community(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            cluster_probe_oid: default_cluster_probe_oid(),
            cluster_extended_oid: default_cluster_extended_oid(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/dfmon.db")
}

fn default_db_tries() -> u32 {
    5
}

fn default_community() -> String {
    "public".to_string()
}

fn default_port() -> u16 {
    161
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_cluster_probe_oid() -> Oid {
    Oid::from_slice(GPFS_CLUSTER_PROBE)
}

fn default_cluster_extended_oid() -> Oid {
    Oid::from_slice(GPFS_EXTENDED_PROBE)
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.hosts = clean_hosts(config.hosts);
        Ok(config)
    }
}

impl SnmpConfig {
    pub fn settings(&self) -> SnmpSettings {
        SnmpSettings {
            community: self.community.clone(),
            port: self.port,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn probes(&self) -> ClusterProbes {
        ClusterProbes {
            member: self.cluster_probe_oid.clone(),
            extended: self.cluster_extended_oid.clone(),
        }
    }
}

fn clean_hosts(hosts: Vec<String>) -> Vec<String> {
    hosts
        .into_iter()
        .filter_map(|host| {
            let trimmed = host.trim();
            if trimmed.is_empty() {
                tracing::warn!("Ignoring empty hostname in config");
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_omitted() {
        let config = AgentConfig::parse(r#"hosts = ["filer01"]"#).unwrap();
        assert_eq!(config.hosts, vec!["filer01".to_string()]);
        assert_eq!(config.cache_path, PathBuf::from("data/dfmon.db"));
        assert_eq!(config.db_tries, 5);
        assert_eq!(config.snmp.community, "public");
        assert_eq!(config.snmp.settings().timeout, Duration::from_secs(5));
        assert_eq!(config.snmp.probes(), ClusterProbes::default());
    }

    #[test]
    fn full_config_overrides_defaults() {
        let config = AgentConfig::parse(
            r#"
hosts = ["filer01", "linux01"]
cache_path = "/var/cache/dfmon.db"
db_tries = 2

[snmp]
community = "ops"
port = 1161
timeout_secs = 1
cluster_probe_oid = ".1.3.6.1.4.1.9999.1"
"#,
        )
        .unwrap();
        assert_eq!(config.db_tries, 2);
        assert_eq!(config.snmp.port, 1161);
        assert_eq!(config.snmp.cluster_probe_oid.to_string(), "1.3.6.1.4.1.9999.1");
        assert_eq!(
            config.snmp.cluster_extended_oid,
            Oid::from_slice(GPFS_EXTENDED_PROBE)
        );
    }

    #[test]
    fn empty_hostnames_are_dropped() {
        let config = AgentConfig::parse(r#"hosts = ["", " web01 ", "   "]"#).unwrap();
        assert_eq!(config.hosts, vec!["web01".to_string()]);
    }

    #[test]
    fn invalid_oid_fails_loading() {
        let result = AgentConfig::parse(
            r#"
hosts = []
[snmp]
cluster_probe_oid = "1.3.x"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_hosts_is_an_error() {
        assert!(AgentConfig::parse("db_tries = 3").is_err());
    }
}
