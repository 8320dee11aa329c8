//! Sample buffers
//!
//! A [`SampleBuffer`] is the unit of data fed to and produced by the codec:
//! a fixed number of timestamped samples, each holding one value and one
//! quality word per channel. Storage is flat so whole messages move as three
//! allocations rather than one per sample.
//!
//! [`SampleRef`] is the borrowed view used to hand a single sample to the
//! encoder. The codec reads it during the call and never keeps it.

use crate::error::EncodeError;

/// Borrowed view of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRef<'a> {
    /// Sample timestamp
    pub timestamp: u64,
    /// One value per channel
    pub values: &'a [i32],
    /// One quality word per channel (0 = good)
    pub qualities: &'a [u32],
}

impl<'a> SampleRef<'a> {
    /// Create a view over a sample's fields
    pub fn new(timestamp: u64, values: &'a [i32], qualities: &'a [u32]) -> Self {
        Self {
            timestamp,
            values,
            qualities,
        }
    }

    /// Number of channels in the view
    pub fn channel_count(&self) -> usize {
        self.values.len()
    }

    /// Check the view is `channel_count` wide in both fields
    pub fn check(&self, channel_count: usize) -> Result<(), EncodeError> {
        if self.values.len() != self.qualities.len() {
            return Err(EncodeError::RaggedSample {
                values: self.values.len(),
                qualities: self.qualities.len(),
            });
        }
        if self.values.len() != channel_count {
            return Err(EncodeError::ChannelCount {
                expected: channel_count,
                actual: self.values.len(),
            });
        }
        Ok(())
    }
}

/// Ordered, fixed-width sequence of samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    channel_count: usize,
    timestamps: Vec<u64>,
    values: Vec<i32>,
    qualities: Vec<u32>,
}

impl SampleBuffer {
    /// Allocate `samples` zeroed samples with timestamps `0..samples`
    pub fn allocate(channel_count: usize, samples: usize) -> Self {
        Self {
            channel_count,
            timestamps: (0..samples as u64).collect(),
            values: vec![0; channel_count * samples],
            qualities: vec![0; channel_count * samples],
        }
    }

    /// Empty buffer with room for `capacity` samples
    pub fn with_capacity(channel_count: usize, capacity: usize) -> Self {
        Self {
            channel_count,
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(channel_count * capacity),
            qualities: Vec::with_capacity(channel_count * capacity),
        }
    }

    /// Release the buffer. Consuming `self` makes a second release impossible.
    pub fn release(self) {}

    /// Number of samples
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Channels per sample
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// View of sample `index`
    pub fn get(&self, index: usize) -> Option<SampleRef<'_>> {
        let timestamp = *self.timestamps.get(index)?;
        let range = self.range(index);
        Some(SampleRef {
            timestamp,
            values: &self.values[range.clone()],
            qualities: &self.qualities[range],
        })
    }

    /// Iterate over all samples in order
    pub fn iter(&self) -> impl Iterator<Item = SampleRef<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Append a sample
    pub fn push(&mut self, sample: SampleRef<'_>) -> Result<(), EncodeError> {
        sample.check(self.channel_count)?;
        self.timestamps.push(sample.timestamp);
        self.values.extend_from_slice(sample.values);
        self.qualities.extend_from_slice(sample.qualities);
        Ok(())
    }

    /// Overwrite sample `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn set(&mut self, index: usize, sample: SampleRef<'_>) -> Result<(), EncodeError> {
        sample.check(self.channel_count)?;
        let range = self.range(index);
        self.timestamps[index] = sample.timestamp;
        self.values[range.clone()].copy_from_slice(sample.values);
        self.qualities[range].copy_from_slice(sample.qualities);
        Ok(())
    }

    /// Timestamp of sample `index`. Panics if out of range.
    pub fn timestamp(&self, index: usize) -> u64 {
        self.timestamps[index]
    }

    /// Set the timestamp of sample `index`. Panics if out of range.
    pub fn set_timestamp(&mut self, index: usize, timestamp: u64) {
        self.timestamps[index] = timestamp;
    }

    /// Value of `channel` in sample `index`. Panics if out of range.
    pub fn value(&self, index: usize, channel: usize) -> i32 {
        self.values(index)[channel]
    }

    /// Quality of `channel` in sample `index`. Panics if out of range.
    pub fn quality(&self, index: usize, channel: usize) -> u32 {
        self.qualities(index)[channel]
    }

    /// All values of sample `index`
    pub fn values(&self, index: usize) -> &[i32] {
        &self.values[self.range(index)]
    }

    /// All qualities of sample `index`
    pub fn qualities(&self, index: usize) -> &[u32] {
        &self.qualities[self.range(index)]
    }

    /// Mutable values of sample `index`
    pub fn values_mut(&mut self, index: usize) -> &mut [i32] {
        let range = self.range(index);
        &mut self.values[range]
    }

    /// Mutable qualities of sample `index`
    pub fn qualities_mut(&mut self, index: usize) -> &mut [u32] {
        let range = self.range(index);
        &mut self.qualities[range]
    }

    /// Copy the first `samples` samples of `other` into the front of `self`
    pub(crate) fn copy_prefix_from(&mut self, other: &SampleBuffer, samples: usize) {
        let n = samples * self.channel_count;
        self.timestamps[..samples].copy_from_slice(&other.timestamps[..samples]);
        self.values[..n].copy_from_slice(&other.values[..n]);
        self.qualities[..n].copy_from_slice(&other.qualities[..n]);
    }

    fn range(&self, index: usize) -> std::ops::Range<usize> {
        let start = index * self.channel_count;
        start..start + self.channel_count
    }
}
