//! Outcome delivery to monitoring
//!
//! Each run ends by sending one integer to a Zabbix trapper item. The
//! Zabbix server address and this host's name are read from the local
//! agent configuration, the same file the agent itself uses.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use backstop_core::config::ZabbixSettings;
use backstop_core::outcome::Outcome;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};

const DEFAULT_TRAPPER_PORT: u16 = 10051;
const HEADER: &[u8; 5] = b"ZBXD\x01";
const MAX_RESPONSE_LEN: u64 = 1 << 20;
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives the outcome value of a run
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn send(&self, value: i64) -> Result<()>;
}

/// Sends the outcome to `sink`, if monitoring is configured
pub async fn report(sink: Option<&dyn MetricSink>, outcome: Outcome) -> Result<()> {
    match sink {
        Some(sink) => sink
            .send(i64::from(outcome.code()))
            .await
            .context("Failed to send outcome to monitoring"),
        None => {
            debug!("Monitoring not configured, outcome {} not sent", outcome.code());
            Ok(())
        }
    }
}

/// Forwards the result of a run: its outcome, or FAILURE when it errored
///
/// A failed delivery after a failed run is logged, the run's own error
/// is the one returned.
pub async fn report_result(
    sink: Option<&dyn MetricSink>,
    result: Result<Outcome>,
) -> Result<Outcome> {
    match result {
        Ok(outcome) => {
            report(sink, outcome).await?;
            Ok(outcome)
        }
        Err(e) => {
            error!("{:#}", e);
            if let Err(report_err) = report(sink, Outcome::FAILURE).await {
                warn!("{:#}", report_err);
            }
            Err(e)
        }
    }
}

/// Server address and host name from a Zabbix agent configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// `host:port` of the first `ServerActive` entry
    pub server: String,
    pub hostname: String,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Error reading from file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid agent config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut server = None;
        let mut hostname = None;

        for line in contents.lines().map(str::trim) {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "ServerActive" => server = value.split(',').map(str::trim).find(|s| !s.is_empty()),
                "Hostname" => hostname = Some(value.trim()).filter(|s| !s.is_empty()),
                _ => {}
            }
        }

        let server = server.context("ServerActive is not set")?;
        let hostname = hostname.context("Hostname is not set")?;

        Ok(Self {
            server: with_default_port(server),
            hostname: hostname.to_string(),
        })
    }
}

fn with_default_port(entry: &str) -> String {
    let has_port = if entry.starts_with('[') {
        entry.contains("]:")
    } else {
        entry.matches(':').count() == 1
    };

    if has_port {
        entry.to_string()
    } else if entry.contains(':') {
        format!("[{}]:{}", entry, DEFAULT_TRAPPER_PORT)
    } else {
        format!("{}:{}", entry, DEFAULT_TRAPPER_PORT)
    }
}

/// Zabbix sender protocol client for one item
#[derive(Debug, Clone)]
pub struct ZabbixSender {
    agent: AgentConfig,
    item: String,
}

#[derive(Debug, Deserialize)]
struct SenderResponse {
    response: String,
    #[serde(default)]
    info: String,
}

impl ZabbixSender {
    pub fn new(agent: AgentConfig, item: impl Into<String>) -> Self {
        Self {
            agent,
            item: item.into(),
        }
    }

    pub fn from_settings(settings: &ZabbixSettings) -> Result<Self> {
        let agent = AgentConfig::load(&settings.config)?;
        debug!("Zabbix server: {}, hostname: {}", agent.server, agent.hostname);
        Ok(Self::new(agent, settings.item.clone()))
    }

    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect(&self.agent.server)
            .await
            .with_context(|| format!("Failed to connect to {}", self.agent.server))?;

        stream.write_all(&encode_packet(payload)).await?;

        let mut header = [0u8; 13];
        stream
            .read_exact(&mut header)
            .await
            .context("Zabbix server closed the connection")?;
        if &header[..5] != HEADER {
            bail!("Unexpected Zabbix response header");
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&header[5..]);
        let len = u64::from_le_bytes(len);
        if len > MAX_RESPONSE_LEN {
            bail!("Zabbix response too large ({} bytes)", len);
        }

        let mut body = vec![0u8; len as usize];
        stream.read_exact(&mut body).await?;
        Ok(body)
    }
}

#[async_trait]
impl MetricSink for ZabbixSender {
    async fn send(&self, value: i64) -> Result<()> {
        let request = json!({
            "request": "sender data",
            "data": [{
                "host": self.agent.hostname,
                "key": self.item,
                "value": value.to_string(),
            }]
        });
        debug!("Send {} to {}", request, self.agent.server);

        let body = timeout(SEND_TIMEOUT, self.exchange(&serde_json::to_vec(&request)?))
            .await
            .with_context(|| format!("Timed out talking to {}", self.agent.server))??;

        let response: SenderResponse =
            serde_json::from_slice(&body).context("Failed to parse Zabbix response")?;
        if response.response != "success" {
            bail!("Zabbix rejected the value: {}", response.info);
        }
        if failed_count(&response.info).is_some_and(|n| n > 0) {
            bail!("Zabbix did not accept item {}: {}", self.item, response.info);
        }

        info!("Sent {}={} to Zabbix ({})", self.item, value, response.info);
        Ok(())
    }
}

fn encode_packet(payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER.len() + 8 + payload.len());
    packet.extend_from_slice(HEADER);
    packet.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// `failed: N` from an info string like "processed: 1; failed: 0; total: 1"
fn failed_count(info: &str) -> Option<u64> {
    info.split(';')
        .filter_map(|part| part.trim().strip_prefix("failed:"))
        .find_map(|n| n.trim().parse().ok())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    /// Keeps every value it is sent
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) values: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl MetricSink for RecordingSink {
        async fn send(&self, value: i64) -> Result<()> {
            self.values.lock().unwrap().push(value);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl MetricSink for BrokenSink {
        async fn send(&self, _value: i64) -> Result<()> {
            bail!("connection refused")
        }
    }

    #[test]
    fn test_parse_agent_config() {
        let agent = AgentConfig::parse(
            "# comment\nServer=10.0.0.1\nServerActive=zabbix.local, backup.local:10052\nHostname=tableau01\n",
        )
        .unwrap();

        assert_eq!(agent.server, "zabbix.local:10051");
        assert_eq!(agent.hostname, "tableau01");
    }

    #[test]
    fn test_parse_agent_config_keeps_port() {
        let agent = AgentConfig::parse("ServerActive=zabbix.local:10099\nHostname=h").unwrap();
        assert_eq!(agent.server, "zabbix.local:10099");

        let agent = AgentConfig::parse("ServerActive=[::1]:10099\nHostname=h").unwrap();
        assert_eq!(agent.server, "[::1]:10099");

        let agent = AgentConfig::parse("ServerActive=::1\nHostname=h").unwrap();
        assert_eq!(agent.server, "[::1]:10051");
    }

    #[test]
    fn test_parse_agent_config_requires_fields() {
        assert!(AgentConfig::parse("Hostname=h").is_err());
        assert!(AgentConfig::parse("ServerActive=z").is_err());
        assert!(AgentConfig::parse("# ServerActive=z\nHostname=h").is_err());
    }

    #[test]
    fn test_encode_packet() {
        let packet = encode_packet(b"{}");
        assert_eq!(&packet[..5], b"ZBXD\x01");
        assert_eq!(&packet[5..13], &2u64.to_le_bytes());
        assert_eq!(&packet[13..], b"{}");
    }

    #[test]
    fn test_failed_count() {
        assert_eq!(failed_count("processed: 1; failed: 0; total: 1"), Some(0));
        assert_eq!(failed_count("processed: 0; failed: 1; total: 1"), Some(1));
        assert_eq!(failed_count(""), None);
    }

    /// Accepts one connection, returns the decoded request and replies with `reply`
    pub(crate) async fn fake_server(reply: serde_json::Value) -> (String, tokio::task::JoinHandle<serde_json::Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut header = [0u8; 13];
            socket.read_exact(&mut header).await.unwrap();
            assert_eq!(&header[..5], b"ZBXD\x01");
            let len = u64::from_le_bytes(header[5..].try_into().unwrap());
            let mut body = vec![0u8; len as usize];
            socket.read_exact(&mut body).await.unwrap();

            let reply = serde_json::to_vec(&reply).unwrap();
            socket.write_all(&encode_packet(&reply)).await.unwrap();
            serde_json::from_slice(&body).unwrap()
        });

        (addr, handle)
    }

    fn sender(server: String) -> ZabbixSender {
        ZabbixSender::new(
            AgentConfig {
                server,
                hostname: "tableau01".to_string(),
            },
            "tableau.backup",
        )
    }

    #[tokio::test]
    async fn test_send_value() {
        let (addr, server) = fake_server(serde_json::json!({
            "response": "success",
            "info": "processed: 1; failed: 0; total: 1; seconds spent: 0.000055"
        }))
        .await;

        sender(addr).send(3).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request["request"], "sender data");
        assert_eq!(request["data"][0]["host"], "tableau01");
        assert_eq!(request["data"][0]["key"], "tableau.backup");
        assert_eq!(request["data"][0]["value"], "3");
    }

    #[tokio::test]
    async fn test_rejected_item_is_an_error() {
        let (addr, server) = fake_server(serde_json::json!({
            "response": "success",
            "info": "processed: 0; failed: 1; total: 1; seconds spent: 0.000055"
        }))
        .await;

        assert!(sender(addr).send(0).await.is_err());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_report_without_sink() {
        report(None, Outcome::FAILURE).await.unwrap();
    }

    #[tokio::test]
    async fn test_report_forwards_outcome_code() {
        let (addr, server) = fake_server(serde_json::json!({
            "response": "success",
            "info": "processed: 1; failed: 0; total: 1"
        }))
        .await;
        let sink = sender(addr);

        report(Some(&sink), Outcome::FAILURE).await.unwrap();

        assert_eq!(server.await.unwrap()["data"][0]["value"], "1");
    }

    #[tokio::test]
    async fn test_report_result_forwards_outcome() {
        let sink = RecordingSink::default();

        let outcome = report_result(Some(&sink), Ok(Outcome::from_exit_code(3)))
            .await
            .unwrap();

        assert_eq!(outcome.code(), 3);
        assert_eq!(*sink.values.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_report_result_sends_failure_on_error() {
        let sink = RecordingSink::default();

        let err = report_result(Some(&sink), Err(anyhow::anyhow!("login rejected")))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "login rejected");
        assert_eq!(*sink.values.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_report_result_keeps_run_error() {
        let err = report_result(Some(&BrokenSink), Err(anyhow::anyhow!("spawn failed")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "spawn failed");

        assert!(report_result(Some(&BrokenSink), Ok(Outcome::SUCCESS)).await.is_err());
    }
}
