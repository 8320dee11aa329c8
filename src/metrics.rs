//! Metrics collection for Slipstream compression analysis
//!
//! This module provides statistics about compression efficiency over one or
//! many messages.
//!
//! Every figure is measured against a raw size of [`BYTES_PER_RAW_VALUE`]
//! bytes per channel-sample: an 8-byte timestamp, a 4-byte value and a
//! 4-byte quality word. This is a reporting approximation; the timestamp is
//! counted once per channel.

/// Raw bytes charged per channel-sample (8 + 4 + 4)
pub const BYTES_PER_RAW_VALUE: usize = 16;

/// Encoded size as a fraction of the raw size (lower = better)
pub fn compression_ratio(encoded_len: usize, channel_count: usize, samples_per_message: usize) -> f64 {
    let raw = channel_count * BYTES_PER_RAW_VALUE * samples_per_message;
    if raw == 0 {
        return 0.0;
    }
    encoded_len as f64 / raw as f64
}

/// Compression statistics collector
#[derive(Debug, Clone, Default)]
pub struct CompressionMetrics {
    /// Total raw bytes (before compression)
    pub raw_bytes: u64,
    /// Total encoded bytes (after compression)
    pub encoded_bytes: u64,
    /// Number of messages processed
    pub message_count: u64,
    /// Number of samples carried by those messages
    pub sample_count: u64,
    /// Smallest message seen
    pub min_message_size: Option<usize>,
    /// Largest message seen
    pub max_message_size: Option<usize>,
}

impl CompressionMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one encoded message of `samples` samples, `channel_count` wide
    pub fn record_message(&mut self, encoded_len: usize, channel_count: usize, samples: usize) {
        self.raw_bytes += (channel_count * BYTES_PER_RAW_VALUE * samples) as u64;
        self.encoded_bytes += encoded_len as u64;
        self.message_count += 1;
        self.sample_count += samples as u64;
        self.min_message_size = Some(self.min_message_size.map_or(encoded_len, |m| m.min(encoded_len)));
        self.max_message_size = Some(self.max_message_size.map_or(encoded_len, |m| m.max(encoded_len)));
    }

    /// Encoded bytes over raw bytes across all messages
    pub fn compression_ratio(&self) -> f64 {
        if self.raw_bytes == 0 {
            return 0.0;
        }
        self.encoded_bytes as f64 / self.raw_bytes as f64
    }

    /// Calculate space savings percentage
    /// Returns (1 - encoded/raw) * 100
    pub fn space_savings_percent(&self) -> f64 {
        if self.raw_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.compression_ratio()) * 100.0
    }

    /// Get average message size in bytes
    pub fn average_message_size(&self) -> f64 {
        if self.message_count == 0 {
            return 0.0;
        }
        self.encoded_bytes as f64 / self.message_count as f64
    }

    /// Average encoded bytes per sample
    pub fn bytes_per_sample(&self) -> f64 {
        if self.sample_count == 0 {
            return 0.0;
        }
        self.encoded_bytes as f64 / self.sample_count as f64
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Slipstream Compression Metrics ===\n\n");

        report.push_str(&format!("Messages processed: {}\n", self.message_count));
        report.push_str(&format!("Samples: {}\n", self.sample_count));
        report.push_str(&format!("Raw bytes: {} bytes\n", self.raw_bytes));
        report.push_str(&format!("Encoded bytes: {} bytes\n", self.encoded_bytes));
        report.push_str(&format!(
            "Compression ratio: {:.2}%\n",
            self.compression_ratio() * 100.0
        ));
        report.push_str(&format!(
            "Space savings: {:.1}%\n",
            self.space_savings_percent()
        ));
        report.push_str(&format!(
            "Average message size: {:.1} bytes\n",
            self.average_message_size()
        ));
        if let (Some(min), Some(max)) = (self.min_message_size, self.max_message_size) {
            report.push_str(&format!("Message size range: {}..={} bytes\n", min, max));
        }

        report
    }
}
