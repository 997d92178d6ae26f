//! Scalar metric sinks.

use tracing::debug;

/// Receives `(tag, value, step)` scalars from the training loops.
pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64);
}

/// Emits every scalar as a `tracing` debug event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) {
        debug!(tag, value, step, "scalar");
    }
}

/// Keeps every scalar in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub scalars: Vec<(String, f64, u64)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values recorded under `tag`, in emission order.
    pub fn values(&self, tag: &str) -> Vec<f64> {
        self.scalars
            .iter()
            .filter(|(t, _, _)| t == tag)
            .map(|(_, v, _)| *v)
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) {
        self.scalars.push((tag.to_string(), value, step));
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn add_scalar(&mut self, _tag: &str, _value: f64, _step: u64) {}
}
