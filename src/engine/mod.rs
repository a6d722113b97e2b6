//! Per-packet detection pipeline
//!
//! One packet goes through signature evaluation and the classifier, and
//! comes out as a single detection record. The pipeline never fails a
//! packet: classifier errors degrade to a signature-only verdict so one
//! malformed packet cannot stall the capture loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use crate::config::Config;
use crate::core::{DetectionRecord, PacketRecord, Verdict};
use crate::error::{Result, SentryError};
use crate::ml::{Classifier, FeatureExtractor};
use crate::signatures::{registry, SignatureSet};
use crate::sink::{LabelPair, RollingWindow};
use crate::state::{ArpTable, CounterStore};

/// Running totals over the engine's lifetime
#[derive(Debug, Default)]
pub struct EngineStats {
    pub packets: AtomicU64,
    pub alerts: AtomicU64,
    pub classifier_errors: AtomicU64,
}

#[derive(Debug)]
pub struct DetectionEngine {
    signatures: SignatureSet,
    extractor: FeatureExtractor,
    classifier: Classifier,
    counters: CounterStore,
    arp_table: ArpTable,
    window: Arc<RollingWindow>,
    stats: EngineStats,
}

impl DetectionEngine {
    /// Build the pipeline. Fails fast when the feature schema and the
    /// model artifact disagree on width, before any traffic is seen.
    pub fn new(config: &Config, classifier: Classifier) -> Result<Self> {
        let extractor = FeatureExtractor::new();
        if extractor.output_width() != classifier.input_width() {
            return Err(SentryError::SchemaMismatch {
                extractor: extractor.output_width(),
                model: classifier.input_width(),
            });
        }

        let signatures = registry::default_signatures(&config.signatures);
        info!(
            rules = signatures.rules().len(),
            threshold = classifier.decision_threshold(),
            "detection engine ready"
        );

        Ok(Self {
            signatures,
            extractor,
            classifier,
            counters: CounterStore::new(config.state.counter_eviction),
            arp_table: ArpTable::new(config.state.arp_eviction),
            window: Arc::new(RollingWindow::new(
                config.metrics.window,
                config.metrics.min_samples,
            )),
            stats: EngineStats::default(),
        })
    }

    /// Run one packet through both detectors and produce its record.
    /// Infallible by contract: a packet the classifier cannot score
    /// still gets a signature-only verdict.
    pub fn process(&self, packet: &PacketRecord) -> DetectionRecord {
        self.stats.packets.fetch_add(1, Ordering::Relaxed);

        let signatures = self
            .signatures
            .evaluate(packet, &self.counters, &self.arp_table);

        let features = self.extractor.extract(packet);
        let probability = match self.classifier.score(&features) {
            Ok(p) => Some(p),
            Err(e) => {
                self.stats.classifier_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Classifier could not score packet: {}", e);
                None
            }
        };

        let classifier_verdict = probability
            .map(|p| self.classifier.label(p))
            .unwrap_or(Verdict::Normal);
        let verdict = if !signatures.is_empty() || classifier_verdict == Verdict::Anomaly {
            Verdict::Anomaly
        } else {
            Verdict::Normal
        };

        if let Some(p) = probability {
            self.window.push(LabelPair {
                predicted: self.classifier.predict(p),
                actual: self.classifier.label(p) == Verdict::Anomaly,
            });
        }

        if verdict == Verdict::Anomaly {
            self.stats.alerts.fetch_add(1, Ordering::Relaxed);
        }

        DetectionRecord::new(packet, verdict, signatures, probability)
    }

    pub fn metrics_window(&self) -> Arc<RollingWindow> {
        Arc::clone(&self.window)
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    pub fn arp_table(&self) -> &ArpTable {
        &self.arp_table
    }

    /// Apply the configured eviction policies to both state stores
    pub fn evict_state(&self) -> (usize, usize) {
        (self.counters.evict(), self.arp_table.evict())
    }
}
