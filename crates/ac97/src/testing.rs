//! Host-side helpers for driving the decoder without a capture file.
//!
//! - [`Waveform`]: builds an AC-link sample stream bit by bit or frame by
//!   frame, one [`LineLevels`] per sample
//! - [`ScriptedSampler`]: an [`EdgeSampler`] over such a stream
//! - [`RecordingSink`]: an [`AnnotationSink`] that keeps everything it gets
//!
//! Available with the `std` feature.

use crate::annotation::{Annotation, AnnotationClass, AnnotationRow, AnnotationSink};
use crate::consts::{FRAME_BITS, SLOT_COUNT};
use crate::lines::{ChannelAssignment, LineLevels, LineSet, Signal};
use crate::sampler::{conditions_hold, Condition, EdgeSample, EdgeSampler};
use crate::slot::SlotIndex;

/// Bits during which SYNC is held high at the start of a frame.
pub const SYNC_HIGH_BITS: usize = 16;

// ── Waveform ─────────────────────────────────────────────────────────────────

/// Synthetic AC-link waveform, two samples per BIT_CLK cycle.
///
/// Sample 1 is a priming rising edge. Bit `k` is presented while BIT_CLK is
/// low at sample `2 + 2k` and closed by the rising edge at sample `3 + 2k`,
/// where SYNC is sampled. A frame whose first bit is `k` therefore starts at
/// sample `1 + 2k`.
#[derive(Debug, Clone)]
pub struct Waveform {
    levels: Vec<LineLevels>,
    bits: usize,
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new()
    }
}

impl Waveform {
    /// A waveform holding only the priming clock edge.
    pub fn new() -> Self {
        let low = LineLevels::default();
        let high = LineLevels {
            bit_clk: true,
            ..low
        };
        Self {
            levels: vec![low, high],
            bits: 0,
        }
    }

    /// Sample position at which bit `k` starts.
    pub fn bit_start(k: usize) -> u64 {
        (1 + 2 * k) as u64
    }

    /// Bits appended so far.
    pub fn bit_count(&self) -> usize {
        self.bits
    }

    /// Append one BIT_CLK cycle carrying `output`/`input`, with SYNC at
    /// `sync` on the closing rising edge.
    pub fn bit(&mut self, output: bool, input: bool, sync: bool) -> &mut Self {
        let previous_sync = self.levels.last().is_some_and(|l| l.sync);
        let low = LineLevels {
            data_out: output,
            data_in: input,
            bit_clk: false,
            sync: previous_sync,
            reset: None,
        };
        self.levels.push(low);
        self.levels.push(LineLevels {
            bit_clk: true,
            sync,
            ..low
        });
        self.bits += 1;
        self
    }

    /// Append `cycles` idle cycles: both data lines and SYNC low.
    pub fn idle(&mut self, cycles: usize) -> &mut Self {
        for _ in 0..cycles {
            self.bit(false, false, false);
        }
        self
    }

    /// Append a complete frame with the given slot values.
    pub fn frame(&mut self, output: &[u32; SLOT_COUNT], input: &[u32; SLOT_COUNT]) -> &mut Self {
        self.partial_frame(output, input, FRAME_BITS)
    }

    /// Append the first `bits` bits of a frame.
    pub fn partial_frame(&mut self, output: &[u32; SLOT_COUNT], input: &[u32; SLOT_COUNT], bits: usize) -> &mut Self {
        let out_bits = frame_bits(output);
        let in_bits = frame_bits(input);
        for (n, (o, i)) in out_bits.into_iter().zip(in_bits).take(bits).enumerate() {
            self.bit(o, i, n < SYNC_HIGH_BITS);
        }
        self
    }

    /// Per-sample line levels.
    pub fn levels(&self) -> &[LineLevels] {
        &self.levels
    }

    /// An [`EdgeSampler`] over this waveform with the four mandatory lines
    /// bound.
    pub fn sampler(&self) -> ScriptedSampler {
        ScriptedSampler::new(self.levels.clone())
    }

    /// Pack into one byte per sample, placing lines on the probes of
    /// `channels`.
    pub fn pack(&self, channels: &ChannelAssignment) -> Vec<u8> {
        self.levels
            .iter()
            .map(|levels| {
                Signal::ALL.into_iter().fold(0u8, |byte, signal| {
                    match (channels.probe(signal), levels.level(signal)) {
                        (Some(probe), Some(true)) => byte | (1 << probe),
                        _ => byte,
                    }
                })
            })
            .collect()
    }
}

/// Serialise 13 slot values (MSB first) into the 256 bits of a frame.
pub fn frame_bits(slots: &[u32; SLOT_COUNT]) -> Vec<bool> {
    SlotIndex::all()
        .zip(slots)
        .flat_map(|(index, &value)| {
            let width = u32::from(index.width());
            (0..width).rev().map(move |shift| (value >> shift) & 1 != 0)
        })
        .collect()
}

// ── ScriptedSampler ──────────────────────────────────────────────────────────

/// [`EdgeSampler`] over a scripted list of per-sample levels.
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    levels: Vec<LineLevels>,
    bound: LineSet,
    cursor: usize,
    previous: Option<LineLevels>,
    waits: usize,
}

impl ScriptedSampler {
    /// Script `levels`, one entry per sample, with the mandatory lines bound.
    pub fn new(levels: Vec<LineLevels>) -> Self {
        Self {
            levels,
            bound: LineSet::REQUIRED,
            cursor: 0,
            previous: None,
            waits: 0,
        }
    }

    /// Report `bound` as the set of bound lines.
    #[must_use]
    pub fn with_bound_lines(mut self, bound: LineSet) -> Self {
        self.bound = bound;
        self
    }

    /// Number of `wait_for` calls served.
    pub fn waits(&self) -> usize {
        self.waits
    }
}

impl EdgeSampler for ScriptedSampler {
    fn bound_lines(&self) -> LineSet {
        self.bound
    }

    fn wait_for(&mut self, conditions: &[Condition]) -> Option<EdgeSample> {
        self.waits += 1;
        while let Some(&current) = self.levels.get(self.cursor) {
            let previous = self.previous.unwrap_or(current);
            let position = self.cursor as u64;
            self.cursor += 1;
            self.previous = Some(current);
            if conditions_hold(conditions, &previous, &current) {
                return Some(EdgeSample {
                    position,
                    levels: current,
                });
            }
        }
        None
    }
}

// ── RecordingSink ────────────────────────────────────────────────────────────

/// [`AnnotationSink`] that keeps every annotation in emission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Everything emitted so far.
    pub annotations: Vec<Annotation>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations of `class`, in emission order.
    pub fn of_class(&self, class: AnnotationClass) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations.iter().filter(move |a| a.class == class)
    }

    /// Annotations displayed in `row`, in emission order.
    pub fn in_row(&self, row: AnnotationRow) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations.iter().filter(move |a| a.class.row() == row)
    }

    /// Primary texts of `class`, in emission order.
    pub fn texts(&self, class: AnnotationClass) -> Vec<&str> {
        self.of_class(class).map(Annotation::primary).collect()
    }

    /// Number of annotations of `class`.
    pub fn count(&self, class: AnnotationClass) -> usize {
        self.of_class(class).count()
    }
}

impl AnnotationSink for RecordingSink {
    fn emit(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::lines::ChannelMap;

    #[test]
    fn test_frame_bits_layout() {
        let mut slots = [0u32; SLOT_COUNT];
        slots[0] = 0x8000;
        slots[12] = 1;
        let bits = frame_bits(&slots);
        assert_eq!(bits.len(), FRAME_BITS);
        assert!(bits[0]);
        assert!(bits[255]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 2);
    }

    #[test]
    fn test_waveform_positions() {
        let mut wave = Waveform::new();
        wave.bit(true, false, true);
        let mut sampler = wave.sampler();
        let prime = sampler.wait_for(&[Condition::BIT_CLK_RISING]).expect("priming edge");
        assert_eq!(prime.position, Waveform::bit_start(0));
        let fall = sampler.wait_for(&[Condition::BIT_CLK_FALLING]).expect("falling edge");
        assert!(fall.levels.data_out);
        let rise = sampler.wait_for(&[Condition::BIT_CLK_RISING]).expect("rising edge");
        assert_eq!(rise.position, Waveform::bit_start(1));
        assert!(rise.levels.sync);
        assert_eq!(sampler.waits(), 3);
    }

    #[test]
    fn test_pack_uses_probe_map() {
        let mut wave = Waveform::new();
        wave.bit(true, true, true);
        let channels = ChannelMap::default().resolve().expect("default map");
        let bytes = wave.pack(&channels);
        assert_eq!(bytes.len(), 4);
        assert_eq!(bytes[1], 0b0100);
        assert_eq!(bytes[3], 0b1111);
    }

    #[test]
    fn test_recording_sink_filters() {
        let mut sink = RecordingSink::new();
        sink.emit(Annotation::new(0, 1, AnnotationClass::BitsOut).text(format_args!("1")));
        sink.emit(Annotation::new(0, 1, AnnotationClass::Warning));
        assert_eq!(sink.texts(AnnotationClass::BitsOut), ["1"]);
        assert_eq!(sink.in_row(AnnotationRow::Warnings).count(), 1);
        assert_eq!(sink.count(AnnotationClass::Error), 0);
    }
}
