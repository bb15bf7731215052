//! Metrics sinks for training scalar series.
//!
//! The trainer emits named scalar time series, each keyed by its own
//! monotonic counter: `action_probability` (per environment step),
//! `episode_reward` (per episode), `policy_loss` / `value_loss` (per
//! training epoch) and `running_reward` (per training epoch). Sinks are
//! purely observational; nothing feeds back into control flow.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Receiver for scalar training metrics.
pub trait MetricsSink {
    /// Record one scalar sample of the series `tag` at step `step`.
    fn scalar(&mut self, tag: &str, step: usize, value: f32);

    /// Flush any buffered output.
    fn flush(&mut self) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn scalar(&mut self, _tag: &str, _step: usize, _value: f32) {}
}

/// Console sink, optionally restricted to a set of tags.
///
/// High-frequency series (per-step action probabilities) are noisy on a
/// terminal; a tag filter keeps the output readable.
pub struct ConsoleSink {
    tags: Option<Vec<String>>,
}

impl ConsoleSink {
    /// Log every series.
    pub fn new() -> Self {
        Self { tags: None }
    }

    /// Log only the given series.
    pub fn with_tags(tags: &[&str]) -> Self {
        Self {
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        }
    }

    fn accepts(&self, tag: &str) -> bool {
        match &self.tags {
            Some(tags) => tags.iter().any(|t| t == tag),
            None => true,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for ConsoleSink {
    fn scalar(&mut self, tag: &str, step: usize, value: f32) {
        if self.accepts(tag) {
            println!("{:>8} {:<24} {:>12.4}", step, tag, value);
        }
    }
}

/// CSV file sink (`tag,step,value` rows) for offline analysis.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create a new CSV sink, truncating any existing file.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "tag,step,value")?;
        Ok(Self { writer })
    }
}

impl MetricsSink for CsvSink {
    fn scalar(&mut self, tag: &str, step: usize, value: f32) {
        let _ = writeln!(self.writer, "{},{},{}", tag, step, value);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fan-out sink writing to multiple backends.
pub struct MultiSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl MultiSink {
    /// Create an empty multi-sink.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink.
    pub fn add<S: MetricsSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Default for MultiSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MultiSink {
    fn scalar(&mut self, tag: &str, step: usize, value: f32) {
        for sink in &mut self.sinks {
            sink.scalar(tag, step, value);
        }
    }

    fn flush(&mut self) {
        for sink in &mut self.sinks {
            sink.flush();
        }
    }
}

/// In-memory sink for assertions in tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySink {
    pub records: Vec<(String, usize, f32)>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, tag: &str) -> Vec<(usize, f32)> {
        self.records
            .iter()
            .filter(|(t, _, _)| t == tag)
            .map(|(_, s, v)| (*s, *v))
            .collect()
    }
}

#[cfg(test)]
impl MetricsSink for MemorySink {
    fn scalar(&mut self, tag: &str, step: usize, value: f32) {
        self.records.push((tag.to_string(), step, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_csv_sink_writes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        {
            let mut sink = CsvSink::new(&path).unwrap();
            sink.scalar("policy_loss", 1, 0.5);
            sink.scalar("value_loss", 1, 0.25);
            sink.flush();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "tag,step,value");
        assert_eq!(lines[1], "policy_loss,1,0.5");
        assert_eq!(lines[2], "value_loss,1,0.25");
    }

    #[test]
    fn test_console_sink_tag_filter() {
        let sink = ConsoleSink::with_tags(&["running_reward"]);
        assert!(sink.accepts("running_reward"));
        assert!(!sink.accepts("action_probability"));

        let sink = ConsoleSink::new();
        assert!(sink.accepts("anything"));
    }

    #[test]
    fn test_multi_sink_fans_out() {
        let mut multi = MultiSink::new().add(NullSink);
        multi.scalar("episode_reward", 3, 1.5);
        multi.flush();
    }

    #[test]
    fn test_memory_sink_series() {
        let mut sink = MemorySink::new();
        sink.scalar("episode_reward", 1, 2.0);
        sink.scalar("policy_loss", 1, 0.1);
        sink.scalar("episode_reward", 2, 3.0);

        assert_eq!(sink.series("episode_reward"), vec![(1, 2.0), (2, 3.0)]);
        assert_eq!(sink.series("policy_loss").len(), 1);
    }
}
