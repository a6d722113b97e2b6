//! netsentry: realtime network intrusion detection
//!
//! Packets flow through a two-stage pipeline: a registry of attack
//! signatures (stateless checks, per-source thresholds, an ARP table,
//! DNS provenance) and a logistic classifier over an NSL-KDD shaped
//! feature vector. Every alert lands in a durable JSON-line log, and a
//! rolling window reports precision/recall/F1/AUC over recent traffic.

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod ml;
pub mod signatures;
pub mod sink;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::core::{DetectionRecord, MetricsSummary, PacketRecord};
use crate::engine::DetectionEngine;
use crate::error::Result;
use crate::ml::Classifier;
use crate::sink::{AlertSink, SinkItem};

/// The assembled detection service: engine plus durable sink
pub struct Sentry {
    engine: Arc<DetectionEngine>,
    sink: AlertSink,
    log_all: bool,
}

impl Sentry {
    /// Load the model, build the pipeline and spawn the log writer
    pub fn new(config: &Config) -> Result<Self> {
        let classifier = Classifier::load(
            &config.detection.model_path,
            config.detection.decision_threshold,
        )?;
        let engine = DetectionEngine::new(config, classifier)?;
        let sink = AlertSink::spawn(&config.sink);
        Ok(Self {
            engine: Arc::new(engine),
            sink,
            log_all: config.sink.log_all,
        })
    }

    /// Detect on one packet and persist the record when it is an alert
    /// (or unconditionally in audit-trail mode)
    pub async fn process(&self, packet: &PacketRecord) -> Result<DetectionRecord> {
        let record = self.engine.process(packet);
        if record.is_alert() || self.log_all {
            self.sink.submit(SinkItem::Detection(record.clone())).await?;
        }
        Ok(record)
    }

    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    async fn submit_metrics(&self, summary: MetricsSummary) -> Result<()> {
        self.sink.submit(SinkItem::Metrics(summary)).await
    }

    /// Flush every queued record to disk before returning. A writer that
    /// died on an exhausted append comes back as `SinkWrite` here.
    pub async fn shutdown(self) -> Result<()> {
        self.sink.close().await
    }
}

/// Long-running service loop: consumes packets from a channel, reports
/// metrics on an interval and evicts stale detector state.
pub struct Daemon {
    sentry: Sentry,
    metrics_interval: Duration,
    housekeeping_interval: Duration,
}

impl Daemon {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            sentry: Sentry::new(config)?,
            metrics_interval: Duration::from_secs(config.metrics.interval_secs),
            housekeeping_interval: Duration::from_secs(config.state.housekeeping_secs),
        })
    }

    /// Run until the packet source closes, then flush and return
    pub async fn run(self, mut packets: mpsc::Receiver<PacketRecord>) -> Result<()> {
        let window = self.sentry.engine().metrics_window();
        let mut metrics_tick = tokio::time::interval(self.metrics_interval);
        let mut housekeeping_tick = tokio::time::interval(self.housekeeping_interval);
        // Skip the immediate first tick both intervals fire on creation
        metrics_tick.tick().await;
        housekeeping_tick.tick().await;

        loop {
            tokio::select! {
                maybe_packet = packets.recv() => {
                    match maybe_packet {
                        Some(packet) => {
                            let record = self.sentry.process(&packet).await?;
                            if record.is_alert() {
                                info!(
                                    verdict = %record.verdict,
                                    signatures = ?record.signatures,
                                    "{}", record.summary
                                );
                            }
                        }
                        None => break,
                    }
                }
                _ = metrics_tick.tick() => {
                    if let Some(summary) = window.compute() {
                        info!(
                            precision = summary.precision,
                            recall = summary.recall,
                            f1 = summary.f1,
                            auc = summary.auc,
                            samples = summary.samples,
                            "rolling metrics"
                        );
                        self.sentry.submit_metrics(summary).await?;
                    } else {
                        debug!("metrics interval skipped, not enough samples");
                    }
                }
                _ = housekeeping_tick.tick() => {
                    let (counters, arp) = self.sentry.engine().evict_state();
                    if counters + arp > 0 {
                        debug!(counters, arp, "evicted stale detector state");
                    }
                }
            }
        }

        // Final report so short replays still produce a summary
        if let Some(summary) = window.compute() {
            self.sentry.submit_metrics(summary).await?;
        }
        self.sentry.shutdown().await
    }
}
