//! Durable append-only writer task
//!
//! Records flow through a bounded channel into a dedicated task that
//! serializes each one as a JSON line and appends it to the log file.
//! A full channel applies backpressure to the sender rather than
//! dropping records. Failed appends are retried with doubled backoff;
//! once the retries are exhausted the writer task exits with the error,
//! so a detection can never be silently dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::SinkConfig;
use crate::core::{DetectionRecord, MetricsSummary};
use crate::error::{Result, SentryError};

/// One item for the writer task
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SinkItem {
    Detection(DetectionRecord),
    Metrics(MetricsSummary),
}

/// Handle to the background writer task
pub struct AlertSink {
    tx: mpsc::Sender<SinkItem>,
    handle: JoinHandle<Result<()>>,
}

impl AlertSink {
    /// Spawn the writer task and return its handle
    pub fn spawn(config: &SinkConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size);
        let writer = LogWriter {
            detection_log: config.detection_log.clone(),
            metrics_log: config.metrics_log.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        };
        let handle = tokio::spawn(writer.run(rx));
        Self { tx, handle }
    }

    /// Enqueue a record, waiting while the queue is full. Fails once the
    /// writer task has exited; the exit reason is reported by `close`.
    pub async fn submit(&self, item: SinkItem) -> Result<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| SentryError::SinkClosed("writer task is gone".to_string()))
    }

    /// Close the queue and wait for all queued records to reach disk.
    /// Surfaces the writer's exit status: a write failure that exhausted
    /// its retries comes back as `SinkWrite`.
    pub async fn close(self) -> Result<()> {
        drop(self.tx);
        self.handle
            .await
            .map_err(|e| SentryError::SinkClosed(format!("writer task panicked: {}", e)))?
    }
}

struct LogWriter {
    detection_log: PathBuf,
    metrics_log: PathBuf,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LogWriter {
    async fn run(self, mut rx: mpsc::Receiver<SinkItem>) -> Result<()> {
        while let Some(item) = rx.recv().await {
            let (path, line) = match &item {
                SinkItem::Detection(record) => {
                    (&self.detection_log, serde_json::to_string(record))
                }
                SinkItem::Metrics(summary) => (&self.metrics_log, serde_json::to_string(summary)),
            };
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to serialize sink record: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.append_with_retry(path, &line).await {
                // Fatal: the record cannot reach disk, so the task exits
                // with the error instead of dropping it and carrying on
                error!("Giving up on log append: {}", e);
                return Err(e);
            }
        }
        debug!("Sink writer drained, shutting down");
        Ok(())
    }

    async fn append_with_retry(&self, path: &Path, line: &str) -> Result<()> {
        let mut backoff = self.retry_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::append(path, line).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    warn!(
                        "Append to {} failed (attempt {}): {}, retrying",
                        path.display(),
                        attempt,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(SentryError::SinkWrite {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    async fn append(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PacketRecord, Verdict};
    use std::net::{IpAddr, Ipv4Addr};

    fn sink_config(dir: &Path) -> SinkConfig {
        SinkConfig {
            detection_log: dir.join("detections.log"),
            metrics_log: dir.join("metrics.log"),
            queue_size: 8,
            max_retries: 3,
            retry_backoff_ms: 1,
            log_all: false,
        }
    }

    fn sample_record(verdict: Verdict) -> DetectionRecord {
        let packet = PacketRecord::udp(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            53,
        )
        .with_payload_len(120);
        DetectionRecord::new(&packet, verdict, vec!["UDP-Flood".to_string()], Some(0.9))
    }

    #[tokio::test]
    async fn test_detection_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = sink_config(dir.path());
        let sink = AlertSink::spawn(&config);

        sink.submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
            .await
            .unwrap();
        sink.submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
            .await
            .unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&config.detection_log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let record: DetectionRecord = serde_json::from_str(line).unwrap();
            assert_eq!(record.verdict, Verdict::Anomaly);
            assert_eq!(record.signatures, vec!["UDP-Flood".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_metrics_go_to_separate_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = sink_config(dir.path());
        let sink = AlertSink::spawn(&config);

        sink.submit(SinkItem::Metrics(MetricsSummary::new(1.0, 0.5, 0.66, 0.75, 20)))
            .await
            .unwrap();
        sink.close().await.unwrap();

        assert!(!config.detection_log.exists());
        let content = std::fs::read_to_string(&config.metrics_log).unwrap();
        let summary: MetricsSummary = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(summary.samples, 20);
    }

    #[tokio::test]
    async fn test_close_flushes_queued_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = sink_config(dir.path());
        let sink = AlertSink::spawn(&config);

        for _ in 0..5 {
            sink.submit(SinkItem::Detection(sample_record(Verdict::Normal)))
                .await
                .unwrap();
        }
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&config.detection_log).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        // Regular file where a directory is needed, so every append fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let mut config = sink_config(dir.path());
        config.detection_log = blocker.join("detections.log");
        let sink = AlertSink::spawn(&config);

        sink.submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
            .await
            .unwrap();

        let err = sink.close().await.unwrap_err();
        assert!(matches!(err, SentryError::SinkWrite { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_dead_writer_rejects_further_submits() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let mut config = sink_config(dir.path());
        config.detection_log = blocker.join("detections.log");
        let sink = AlertSink::spawn(&config);

        sink.submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
            .await
            .unwrap();

        // Once the writer task has exited, the channel is closed and the
        // failure is visible at the submitting side too
        let mut rejected = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if sink
                .submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
                .await
                .is_err()
            {
                rejected = true;
                break;
            }
        }
        assert!(rejected);
        assert!(sink.close().await.is_err());
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = sink_config(dir.path());
        config.detection_log = dir.path().join("nested/logs/detections.log");
        let sink = AlertSink::spawn(&config);

        sink.submit(SinkItem::Detection(sample_record(Verdict::Anomaly)))
            .await
            .unwrap();
        sink.close().await.unwrap();

        assert!(config.detection_log.exists());
    }
}
