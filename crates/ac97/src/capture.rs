//! Edge sampler over an in-memory logic capture.
//!
//! Samples are packed one byte per sample, bit `n` holding probe `n` (the
//! sigrok "binary" layout with unit size 1). Transitions are detected between
//! consecutive samples; the first sample has no predecessor, so an edge can
//! never be reported at position 0.

use crate::lines::{ChannelAssignment, LineLevels, LineSet};
use crate::sampler::{conditions_hold, Condition, EdgeSample, EdgeSampler};

/// [`EdgeSampler`] walking a borrowed capture buffer.
pub struct LogicCapture<'a> {
    samples: &'a [u8],
    channels: ChannelAssignment,
    cursor: usize,
    previous: Option<LineLevels>,
    base: u64,
}

impl<'a> LogicCapture<'a> {
    /// Wrap `samples`, decoding probe bits through `channels`.
    pub fn new(samples: &'a [u8], channels: ChannelAssignment) -> Self {
        Self {
            samples,
            channels,
            cursor: 0,
            previous: None,
            base: 0,
        }
    }

    /// Report positions offset by `base`, for captures split into chunks.
    #[must_use]
    pub fn starting_at(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Number of samples not consumed yet.
    pub fn remaining(&self) -> usize {
        self.samples.len().saturating_sub(self.cursor)
    }

    /// The channel assignment in use.
    pub fn channels(&self) -> &ChannelAssignment {
        &self.channels
    }
}

impl EdgeSampler for LogicCapture<'_> {
    fn bound_lines(&self) -> LineSet {
        self.channels.bound_lines()
    }

    fn wait_for(&mut self, conditions: &[Condition]) -> Option<EdgeSample> {
        while let Some(&raw) = self.samples.get(self.cursor) {
            let current = self.channels.levels(raw);
            let previous = self.previous.unwrap_or(current);
            let index = self.cursor;
            self.cursor = self.cursor.saturating_add(1);
            self.previous = Some(current);

            if conditions_hold(conditions, &previous, &current) {
                return Some(EdgeSample {
                    position: self.base.saturating_add(index as u64),
                    levels: current,
                });
            }
        }
        None
    }
}
