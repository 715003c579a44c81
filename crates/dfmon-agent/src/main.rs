use anyhow::Result;
use dfmon_agent::config::AgentConfig;
use dfmon_agent::Collector;
use dfmon_collector::classify::Classifier;
use dfmon_collector::session::SnmpConnector;
use dfmon_storage::CacheStore;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dfmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    let config = AgentConfig::load(&config_path)?;
    tracing::info!(
        hosts = config.hosts.len(),
        cache = %config.cache_path.display(),
        "dfmon-agent starting"
    );

    let store = CacheStore::prepare(&config.cache_path, config.db_tries)?;
    let connector = SnmpConnector::new(config.snmp.settings());
    let collector = Collector::new(&connector, Classifier::new(config.snmp.probes()), &store);

    let report = collector.run(&config.hosts);
    let elapsed = report.finished_at - report.started_at;
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        cluster_members = report
            .hosts
            .iter()
            .filter(|h| h.host_type.is_some_and(|kind| kind.is_cluster()))
            .count(),
        filesystems = report.usage.len(),
        elapsed_ms = elapsed.num_milliseconds(),
        "Collection run finished"
    );

    Ok(())
}
