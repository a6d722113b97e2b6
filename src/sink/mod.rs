//! Durable output: the detection log writer and the rolling metrics window

pub mod metrics;
pub mod writer;

pub use metrics::{LabelPair, RollingWindow};
pub use writer::{AlertSink, SinkItem};
