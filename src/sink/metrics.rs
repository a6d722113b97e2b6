//! Rolling evaluation window over classifier output
//!
//! Each classified packet contributes a (predicted, actual) label pair:
//! predicted is the classifier's 0.5-cutoff call, actual is the alerting
//! decision at the configured threshold. The window keeps the most recent
//! pairs and summarizes them as precision/recall/F1/AUC on demand.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::MetricsSummary;

/// One evaluated packet: (predicted positive, actual positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPair {
    pub predicted: bool,
    pub actual: bool,
}

/// Fixed-capacity window of recent label pairs
#[derive(Debug)]
pub struct RollingWindow {
    inner: Mutex<VecDeque<LabelPair>>,
    capacity: usize,
    min_samples: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            min_samples,
        }
    }

    /// Record a pair, evicting the oldest when the window is full
    pub fn push(&self, pair: LabelPair) {
        let mut window = self.inner.lock();
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(pair);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Summarize the current window. Returns `None` below the minimum
    /// sample count, so early intervals stay silent instead of reporting
    /// noise off a handful of packets.
    pub fn compute(&self) -> Option<MetricsSummary> {
        let window = self.inner.lock();
        if window.len() < self.min_samples {
            return None;
        }

        let mut tp = 0u32;
        let mut fp = 0u32;
        let mut tn = 0u32;
        let mut fne = 0u32;
        for pair in window.iter() {
            match (pair.predicted, pair.actual) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fne += 1,
            }
        }
        let samples = window.len();
        drop(window);

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fne);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        // With binary predictions the ROC curve has a single operating
        // point, so the area reduces to balanced accuracy.
        let tpr = recall;
        let tnr = ratio(tn, tn + fp);
        let auc = (tpr + tnr) / 2.0;

        Some(MetricsSummary::new(precision, recall, f1, auc, samples))
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        f64::from(num) / f64::from(den)
    }
}
