//! Layered delta encoding
//!
//! Sample `j` of a channel is sent as its `min(j, layers)`-th order
//! difference: sample 0 raw, sample 1 as a first difference, sample 2 as a
//! second difference, and so on up to `layers`. Smooth waveforms collapse to
//! small residuals that pack well. Arithmetic differences wrap, so every
//! `i32` input is reversible.

/// Per-channel difference history shared by encoder and decoder
#[derive(Debug, Clone)]
pub struct DeltaState {
    layers: usize,
    xor: bool,
    /// `layers` previous differences per channel, channel-major
    history: Vec<i32>,
    /// Scratch for the differences of the current sample
    diffs: Vec<i32>,
}

impl DeltaState {
    /// Create state for `channels` channels
    pub fn new(channels: usize, layers: usize, xor: bool) -> Self {
        Self {
            layers,
            xor,
            history: vec![0; channels * layers],
            diffs: vec![0; layers + 1],
        }
    }

    /// Number of delta layers
    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Clear all history
    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|v| *v = 0);
    }

    #[inline]
    fn diff(&self, a: i32, b: i32) -> i32 {
        if self.xor {
            a ^ b
        } else {
            a.wrapping_sub(b)
        }
    }

    #[inline]
    fn undiff(&self, a: i32, b: i32) -> i32 {
        if self.xor {
            a ^ b
        } else {
            a.wrapping_add(b)
        }
    }

    /// Encode `value` as sample `index` of `channel`
    pub fn encode(&mut self, channel: usize, index: usize, value: i32) -> i32 {
        let order = index.min(self.layers);
        let base = channel * self.layers;

        self.diffs[0] = value;
        for k in 1..=order {
            self.diffs[k] = self.diff(self.diffs[k - 1], self.history[base + k - 1]);
        }

        self.remember(base, index);
        self.diffs[order]
    }

    /// Recover sample `index` of `channel` from its encoded residual
    pub fn decode(&mut self, channel: usize, index: usize, encoded: i32) -> i32 {
        let order = index.min(self.layers);
        let base = channel * self.layers;

        self.diffs[order] = encoded;
        for k in (1..=order).rev() {
            self.diffs[k - 1] = self.undiff(self.diffs[k], self.history[base + k - 1]);
        }

        self.remember(base, index);
        self.diffs[0]
    }

    fn remember(&mut self, base: usize, index: usize) {
        let keep = (index + 1).min(self.layers);
        self.history[base..base + keep].copy_from_slice(&self.diffs[..keep]);
    }
}
