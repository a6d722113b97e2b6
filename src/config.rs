use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::EvictionPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub signatures: SignatureConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/netsentry/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("netsentry/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Path to the classifier artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Probability cutoff above which the classifier flags a packet.
    /// Deliberately below 0.5 to bias toward recall.
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            decision_threshold: default_decision_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// ICMP payload length at or above which an echo request is oversized
    #[serde(default = "default_ping_of_death_payload")]
    pub ping_of_death_payload: u32,

    /// UDP packets per source before UDP-Flood fires
    #[serde(default = "default_udp_flood_threshold")]
    pub udp_flood_threshold: u64,

    /// TCP packets to port 80 per source before HTTP-Flood fires
    #[serde(default = "default_http_flood_threshold")]
    pub http_flood_threshold: u64,

    /// SYN-only packets to port 80 per source before Slowloris fires
    #[serde(default = "default_slowloris_threshold")]
    pub slowloris_threshold: u64,

    /// Connection attempts per source before FTP/SSH brute force fires
    #[serde(default = "default_brute_force_threshold")]
    pub brute_force_threshold: u64,

    /// The only address allowed to source DNS-port responses
    #[serde(default = "default_trusted_resolver")]
    pub trusted_resolver: IpAddr,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            ping_of_death_payload: default_ping_of_death_payload(),
            udp_flood_threshold: default_udp_flood_threshold(),
            http_flood_threshold: default_http_flood_threshold(),
            slowloris_threshold: default_slowloris_threshold(),
            brute_force_threshold: default_brute_force_threshold(),
            trusted_resolver: default_trusted_resolver(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Eviction policy for the per-source counter store
    #[serde(default)]
    pub counter_eviction: EvictionPolicy,

    /// Eviction policy for the ARP table
    #[serde(default)]
    pub arp_eviction: EvictionPolicy,

    /// Housekeeping tick applying the policies (seconds)
    #[serde(default = "default_housekeeping_secs")]
    pub housekeeping_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            counter_eviction: EvictionPolicy::default(),
            arp_eviction: EvictionPolicy::default(),
            housekeeping_secs: default_housekeeping_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Append-only detection log (one JSON record per line)
    #[serde(default = "default_detection_log")]
    pub detection_log: PathBuf,

    /// Periodic metrics summaries, kept separate from detections
    #[serde(default = "default_metrics_log")]
    pub metrics_log: PathBuf,

    /// Bounded queue between detection and the writer task. A full queue
    /// blocks the capture callback rather than dropping records.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Total append attempts per record before the sink gives up and
    /// surfaces a fatal error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff (doubles per attempt)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Log every processed packet (audit trail) instead of alerts only
    #[serde(default)]
    pub log_all: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            detection_log: default_detection_log(),
            metrics_log: default_metrics_log(),
            queue_size: default_queue_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            log_all: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between rolling-window metric reports
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,

    /// Label pairs the rolling window retains (oldest evicted)
    #[serde(default = "default_metrics_window")]
    pub window: usize,

    /// Below this many pairs, a report interval is skipped
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
            window: default_metrics_window(),
            min_samples: default_min_samples(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("/var/lib/netsentry/model.json")
}

fn default_decision_threshold() -> f32 {
    0.3
}

fn default_ping_of_death_payload() -> u32 {
    65535
}

fn default_udp_flood_threshold() -> u64 {
    100
}

fn default_http_flood_threshold() -> u64 {
    200
}

fn default_slowloris_threshold() -> u64 {
    50
}

fn default_brute_force_threshold() -> u64 {
    10
}

fn default_trusted_resolver() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))
}

fn default_housekeeping_secs() -> u64 {
    60
}

fn default_detection_log() -> PathBuf {
    PathBuf::from("/var/log/netsentry/detections.log")
}

fn default_metrics_log() -> PathBuf {
    PathBuf::from("/var/log/netsentry/metrics.log")
}

fn default_queue_size() -> usize {
    1024
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_metrics_interval_secs() -> u64 {
    30
}

fn default_metrics_window() -> usize {
    100
}

fn default_min_samples() -> usize {
    10
}
