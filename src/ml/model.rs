//! Classifier adapter
//!
//! Wraps the pre-trained binary classifier artifact. The adapter owns
//! invocation and threshold policy only; it never trains or mutates the
//! model. The default decision threshold of 0.3 is a deliberate
//! recall-biased operating point, not a value to round up to 0.5.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::event::Verdict;
use crate::error::{Result, SentryError};

use super::features::FeatureVector;

/// Default probability cutoff above which traffic is flagged
pub const DEFAULT_DECISION_THRESHOLD: f32 = 0.3;

/// On-disk classifier artifact: logistic regression weights plus the
/// declared input width the trainer committed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Declared feature-vector width
    pub input_width: usize,
    /// One weight per feature position
    pub weights: Vec<f32>,
    pub bias: f32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
}

impl ModelArtifact {
    /// Read and parse an artifact file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SentryError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SentryError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Loaded classifier with its decision policy
#[derive(Debug)]
pub struct Classifier {
    artifact: ModelArtifact,
    decision_threshold: f32,
}

impl Classifier {
    /// Load the artifact from disk. Any failure here is fatal at startup.
    pub fn load<P: AsRef<Path>>(path: P, decision_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path)?;

        let classifier = Self::from_artifact(artifact, decision_threshold).map_err(|e| {
            SentryError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        info!(
            width = classifier.input_width(),
            threshold = classifier.decision_threshold,
            "loaded classifier artifact from {}",
            path.display()
        );
        Ok(classifier)
    }

    /// Build from an in-memory artifact (tests, embedded defaults)
    pub fn from_artifact(artifact: ModelArtifact, decision_threshold: f32) -> Result<Self> {
        if artifact.weights.len() != artifact.input_width {
            return Err(SentryError::Config(format!(
                "artifact declares width {} but carries {} weights",
                artifact.input_width,
                artifact.weights.len()
            )));
        }
        if !(0.0..=1.0).contains(&decision_threshold) {
            return Err(SentryError::Config(format!(
                "decision threshold {} outside [0, 1]",
                decision_threshold
            )));
        }
        Ok(Self {
            artifact,
            decision_threshold,
        })
    }

    /// Declared input width, checked against the extractor at startup
    pub fn input_width(&self) -> usize {
        self.artifact.input_width
    }

    pub fn decision_threshold(&self) -> f32 {
        self.decision_threshold
    }

    /// Probability in [0, 1] that the vector is anomalous
    ///
    /// Errors on width disagreement rather than truncating; after the
    /// startup schema check this cannot happen on the live path.
    pub fn score(&self, features: &FeatureVector) -> Result<f32> {
        if features.len() != self.artifact.input_width {
            return Err(SentryError::MalformedPacket(format!(
                "feature vector width {} != model width {}",
                features.len(),
                self.artifact.input_width
            )));
        }

        let z: f32 = features
            .as_slice()
            .iter()
            .zip(&self.artifact.weights)
            .map(|(x, w)| x * w)
            .sum::<f32>()
            + self.artifact.bias;

        let p = sigmoid(z);
        if !p.is_finite() {
            return Err(SentryError::MalformedPacket(format!(
                "non-finite probability from logit {}",
                z
            )));
        }
        Ok(p.clamp(0.0, 1.0))
    }

    /// Operating-point label: ANOMALY iff probability strictly exceeds the
    /// decision threshold.
    pub fn label(&self, probability: f32) -> Verdict {
        if probability > self.decision_threshold {
            Verdict::Anomaly
        } else {
            Verdict::Normal
        }
    }

    /// The model's nominal 0.5-cutoff prediction, kept for the rolling
    /// metrics window.
    pub fn predict(&self, probability: f32) -> bool {
        probability > 0.5
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}
