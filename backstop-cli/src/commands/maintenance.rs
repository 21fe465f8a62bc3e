//! Local maintenance command handlers
//!
//! Runs the `tsm` command on this node through the process runner and
//! forwards its exit code to monitoring.

use anyhow::{Context, Result};
use backstop_core::command::{RunMode, build_command};
use backstop_core::config::Config;
use backstop_core::outcome::Outcome;
use backstop_runner::ProcessRunner;
use tracing::{debug, info};

use crate::monitor::{self, MetricSink, ZabbixSender};

/// Runs the maintenance command and reports its exit code
pub async fn run(status_only: bool, config: &Config) -> Result<Outcome> {
    let mode = if status_only {
        RunMode::Status
    } else {
        RunMode::Backup
    };
    let spec = build_command(mode, &config.tsm);
    let sender = metric_sink(config)?;

    info!("Running {}", spec);
    let result = ProcessRunner::new()
        .run(&spec)
        .await
        .map(Outcome::from_exit_code)
        .with_context(|| format!("Failed to run {}", spec));
    monitor::report_result(sender.as_ref().map(|s| s as &dyn MetricSink), result).await
}

/// Sends 1 to the monitoring item
pub async fn zsend(config: &Config) -> Result<Outcome> {
    let sender = metric_sink(config)?.context("No zabbix section in the configuration")?;
    sender.send(1).await?;
    Ok(Outcome::SUCCESS)
}

pub(crate) fn metric_sink(config: &Config) -> Result<Option<ZabbixSender>> {
    match &config.zabbix {
        Some(settings) => {
            debug!("zabbix_item: {}", settings.item);
            ZabbixSender::from_settings(settings).map(Some)
        }
        None => Ok(None),
    }
}
