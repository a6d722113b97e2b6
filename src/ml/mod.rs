//! Feature extraction and classifier scoring
//!
//! The model is trained and evaluated elsewhere; this crate only loads the
//! artifact, derives the matching feature vector from each packet, and
//! applies the decision threshold.

pub mod features;
pub mod model;

pub use features::{FeatureExtractor, FeatureVector, SCHEMA_WIDTH};
pub use model::{Classifier, ModelArtifact};
