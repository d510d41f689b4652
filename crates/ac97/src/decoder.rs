//! The decode loop.
//!
//! [`Ac97Decoder`] pulls BIT_CLK edges from an [`EdgeSampler`] and pushes
//! annotations into an [`AnnotationSink`]:
//!
//! ```text
//! AwaitingFirstEdge ──rising──► SteadyState
//!                                 │  falling: sample SDATA_OUT / SDATA_IN
//!                                 │  rising:  sample SYNC, 0→1 opens a Frame
//!                                 │  accumulate → segment → decode fields
//!                                 └─ until the sampler is exhausted
//! ```
//!
//! Only a malformed line binding fails; everything observed in the stream
//! becomes an annotation.

use crate::annotation::{Annotation, AnnotationClass, AnnotationSink};
use crate::bits::hex_text;
use crate::consts::FRAME_BITS;
use crate::error::ConfigError;
use crate::fields::decode_slot;
use crate::frame::Frame;
use crate::lines::{DataLine, LineLevels};
use crate::sampler::{Condition, EdgeSampler};
use crate::slot::{segment, CompletedSlot};
use crate::sync::SyncDetector;

// ── Configuration ────────────────────────────────────────────────────────────

/// What to do with a frame that never received all 256 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PartialFramePolicy {
    /// Discard it silently.
    #[default]
    Drop,
    /// Discard it and emit one [`AnnotationClass::Warning`] over its bits.
    Warn,
}

/// Decoder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderConfig {
    /// Handling of frames cut short by end of stream or an early SYNC.
    pub partial_frame: PartialFramePolicy,
}

/// Host metadata notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Metadata {
    /// Capture sample rate in Hz.
    SampleRate(u64),
}

/// Counters for one decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodeSummary {
    /// BIT_CLK cycles seen after the first rising edge.
    pub cycles: u64,
    /// Frame starts detected.
    pub frames: u64,
    /// Frames that received all 256 bits.
    pub complete_frames: u64,
    /// Frames discarded before completing.
    pub partial_frames: u64,
    /// Slots completed across all frames.
    pub slots: u64,
    /// Field annotations emitted (both lines).
    pub fields: u64,
    /// Non-zero reserved fields found (both lines).
    pub reserved_violations: u64,
}

// ── Decoder ──────────────────────────────────────────────────────────────────

/// AC-link frame, slot and field decoder.
///
/// State is rebuilt at the start of every [`decode`](Ac97Decoder::decode)
/// call, so one instance can be reused across captures.
#[derive(Debug, Clone, Default)]
pub struct Ac97Decoder {
    config: DecoderConfig,
    samplerate: Option<u64>,
    sync: SyncDetector,
    frame: Option<Frame>,
    summary: DecodeSummary,
}

impl Ac97Decoder {
    /// Create a decoder with `config`.
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration.
    pub fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Record a metadata notification. Frame decoding does not depend on it.
    pub fn metadata(&mut self, meta: Metadata) {
        match meta {
            Metadata::SampleRate(rate) => self.samplerate = Some(rate),
        }
    }

    /// Sample rate from the last [`Metadata::SampleRate`], if any.
    pub fn samplerate(&self) -> Option<u64> {
        self.samplerate
    }

    /// Summary of the most recent decode.
    pub fn summary(&self) -> DecodeSummary {
        self.summary
    }

    /// Drop all per-stream state. Configuration and sample rate are kept.
    pub fn reset(&mut self) {
        self.sync.reset();
        self.frame = None;
        self.summary = DecodeSummary::default();
    }

    /// Decode the whole stream from `sampler` into `sink`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingLine`] if the sampler does not bind one of the
    /// mandatory lines. Nothing is read from the sampler in that case.
    pub fn decode<E, S>(&mut self, sampler: &mut E, sink: &mut S) -> Result<DecodeSummary, ConfigError>
    where
        E: EdgeSampler + ?Sized,
        S: AnnotationSink + ?Sized,
    {
        self.reset();
        if let Some(missing) = sampler.bound_lines().missing_required() {
            return Err(ConfigError::MissingLine(missing));
        }

        // AwaitingFirstEdge
        let Some(first) = sampler.wait_for(&[Condition::BIT_CLK_RISING]) else {
            return Ok(self.finish(sink));
        };
        self.sync.prime(first.levels.sync);
        let mut prev_position = first.position;

        // SteadyState
        loop {
            let Some(fall) = sampler.wait_for(&[Condition::BIT_CLK_FALLING]) else {
                break;
            };
            let Some(rise) = sampler.wait_for(&[Condition::BIT_CLK_RISING]) else {
                break;
            };
            if self.sync.observe(rise.levels.sync) {
                self.start_frame(prev_position, sink);
            }
            self.handle_bits(prev_position, rise.position, &fall.levels, sink);
            prev_position = rise.position;
        }

        Ok(self.finish(sink))
    }

    fn start_frame<S: AnnotationSink + ?Sized>(&mut self, position: u64, sink: &mut S) {
        if let Some(previous) = self.frame.take() {
            if !previous.is_full() {
                self.partial(&previous, "early SYNC", sink);
            }
        }
        tracing::debug!(start = position, "frame start");
        self.frame = Some(Frame::new(position));
        self.summary.frames += 1;
    }

    fn handle_bits<S: AnnotationSink + ?Sized>(&mut self, start: u64, end: u64, levels: &LineLevels, sink: &mut S) {
        self.summary.cycles += 1;
        for (line, class) in [
            (DataLine::Output, AnnotationClass::BitsOut),
            (DataLine::Input, AnnotationClass::BitsIn),
        ] {
            let bit = u8::from(levels.data(line));
            sink.emit(Annotation::new(start, end, class).text(format_args!("{bit}")));
        }

        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        if !frame.push_bits(end, levels.data_out, levels.data_in) {
            return;
        }
        if frame.is_full() {
            self.summary.complete_frames += 1;
        }
        let Some(slot) = segment(frame) else {
            return;
        };
        self.summary.slots += 1;

        emit_raw(frame, &slot, sink);
        let mut errors = SlotErrors::new(sink);
        for line in DataLine::ALL {
            let outcome = decode_slot(frame, &slot, line, &mut errors);
            if let Some(bitmap) = outcome.validity {
                frame.set_validity(line, bitmap);
            }
            self.summary.fields += u64::from(outcome.fields);
            self.summary.reserved_violations += u64::from(outcome.violations);
        }
        errors.flush();
    }

    fn finish<S: AnnotationSink + ?Sized>(&mut self, sink: &mut S) -> DecodeSummary {
        if let Some(frame) = self.frame.take() {
            if !frame.is_full() {
                self.partial(&frame, "end of stream", sink);
            }
        }
        let s = &self.summary;
        tracing::info!(
            cycles = s.cycles,
            frames = s.frames,
            complete = s.complete_frames,
            partial = s.partial_frames,
            violations = s.reserved_violations,
            "stream exhausted"
        );
        self.summary
    }

    fn partial<S: AnnotationSink + ?Sized>(&mut self, frame: &Frame, reason: &str, sink: &mut S) {
        self.summary.partial_frames += 1;
        let bits = frame.bit_count();
        match self.config.partial_frame {
            PartialFramePolicy::Drop => {
                tracing::debug!(start = frame.start(), bits, reason, "partial frame dropped");
            }
            PartialFramePolicy::Warn => {
                sink.emit(
                    Annotation::new(frame.start(), frame.end(), AnnotationClass::Warning)
                        .text(format_args!("{reason}: {bits}/{FRAME_BITS} bits"))
                        .text(format_args!("partial frame: {bits}/{FRAME_BITS} bits"))
                        .text(format_args!("partial")),
                );
            }
        }
    }
}

// ── Error ordering ───────────────────────────────────────────────────────────

/// At most two reserved fields per slot layout, on each of the two lines.
const SLOT_ERROR_CAPACITY: usize = 4;

/// Passes field annotations straight through and holds back one slot's
/// errors from both lines, so the Errors row stays in start order even when
/// an input-line error starts before an output-line one.
struct SlotErrors<'a, S: ?Sized> {
    sink: &'a mut S,
    held: heapless::Vec<Annotation, SLOT_ERROR_CAPACITY>,
}

impl<'a, S: AnnotationSink + ?Sized> SlotErrors<'a, S> {
    fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            held: heapless::Vec::new(),
        }
    }

    fn flush(mut self) {
        self.held.sort_unstable_by_key(|a| (a.start, a.end));
        for annotation in self.held {
            self.sink.emit(annotation);
        }
    }
}

impl<S: AnnotationSink + ?Sized> AnnotationSink for SlotErrors<'_, S> {
    fn emit(&mut self, annotation: Annotation) {
        if annotation.class != AnnotationClass::Error {
            self.sink.emit(annotation);
            return;
        }
        if let Err(overflow) = self.held.push(annotation) {
            self.sink.emit(overflow);
        }
    }
}

fn emit_raw<S: AnnotationSink + ?Sized>(frame: &Frame, slot: &CompletedSlot, sink: &mut S) {
    let Some((start, end)) = frame.span(slot.index.start_bit(), slot.index.end_bit()) else {
        return;
    };
    for line in DataLine::ALL {
        let hex = hex_text(slot.value(line), slot.width());
        sink.emit(Annotation::new(start, end, AnnotationClass::SlotRaw(line)).text(format_args!("{hex}")));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationRow;
    use crate::consts::SLOT_COUNT;
    use crate::lines::{LineSet, Signal};
    use crate::slot::SlotIndex;
    use crate::testing::{RecordingSink, Waveform};

    fn run(decoder: &mut Ac97Decoder, wave: &Waveform) -> (DecodeSummary, RecordingSink) {
        let mut sink = RecordingSink::new();
        let summary = decoder
            .decode(&mut wave.sampler(), &mut sink)
            .expect("mandatory lines bound");
        (summary, sink)
    }

    fn tag_out(valid: u32) -> [u32; SLOT_COUNT] {
        let mut slots = [0u32; SLOT_COUNT];
        slots[0] = 0x8000 | (valid << 3);
        slots
    }

    #[test]
    fn test_missing_line_is_fatal() {
        let wave = Waveform::new();
        let mut sampler = wave.sampler().with_bound_lines(LineSet::EMPTY.with(Signal::DataOut));
        let mut sink = RecordingSink::new();
        let err = Ac97Decoder::default().decode(&mut sampler, &mut sink);
        assert_eq!(err, Err(ConfigError::MissingLine(Signal::DataIn)));
        assert_eq!(sampler.waits(), 0);
        assert!(sink.annotations.is_empty());
    }

    #[test]
    fn test_empty_stream() {
        let (summary, sink) = run(&mut Ac97Decoder::default(), &Waveform::new());
        assert_eq!(summary, DecodeSummary::default());
        assert!(sink.annotations.is_empty());
    }

    #[test]
    fn test_bits_annotated_before_any_frame() {
        let mut wave = Waveform::new();
        wave.bit(true, false, false).bit(false, true, false);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.frames, 0);
        assert_eq!(sink.texts(AnnotationClass::BitsOut), ["1", "0"]);
        assert_eq!(sink.texts(AnnotationClass::BitsIn), ["0", "1"]);
        let first = sink.of_class(AnnotationClass::BitsOut).next().expect("bit");
        assert_eq!((first.start, first.end), (Waveform::bit_start(0), Waveform::bit_start(1)));
    }

    #[test]
    fn test_frame_starts_one_bit_before_sync_rise() {
        let mut wave = Waveform::new();
        wave.idle(3).frame(&tag_out(0), &[0; SLOT_COUNT]);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.complete_frames, 1);
        assert_eq!(summary.slots, SLOT_COUNT as u64);
        let tag = sink
            .of_class(AnnotationClass::SlotRaw(DataLine::Output))
            .next()
            .expect("tag raw value");
        assert_eq!(tag.start, Waveform::bit_start(3));
        assert_eq!(tag.end, Waveform::bit_start(3 + 16));
        assert_eq!(tag.primary(), "8000");
    }

    #[test]
    fn test_raw_values_for_every_slot() {
        let mut wave = Waveform::new();
        let mut input = [0u32; SLOT_COUNT];
        input[2] = 0xABCDE;
        wave.idle(1).frame(&tag_out(0), &input);
        let (_, sink) = run(&mut Ac97Decoder::default(), &wave);
        let raw_in = sink.texts(AnnotationClass::SlotRaw(DataLine::Input));
        assert_eq!(raw_in.len(), SLOT_COUNT);
        assert_eq!(raw_in[0], "0000");
        assert_eq!(raw_in[2], "abcde");
        // Nothing valid on either line beyond the tags.
        assert_eq!(sink.in_row(AnnotationRow::SlotsOut).count(), 4);
        assert_eq!(sink.in_row(AnnotationRow::SlotsIn).count(), 4);
    }

    #[test]
    fn test_validity_gates_fields() {
        let mut wave = Waveform::new();
        let mut out = tag_out(0xA00);
        out[1] = 0x82000;
        out[2] = 0x1234A;
        out[3] = 0x00042;
        wave.idle(1).frame(&out, &[0; SLOT_COUNT]);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);

        let tag = AnnotationClass::SlotField(DataLine::Output, SlotIndex::TAG);
        assert_eq!(sink.texts(tag), ["READY: 1", "VALID: a00", "RSV: 0", "CODEC: 0"]);
        let addr = AnnotationClass::SlotField(DataLine::Output, SlotIndex::ADDRESS);
        assert_eq!(sink.texts(addr), ["READ", "ADDR: 02", "RSV: 000"]);
        let data = AnnotationClass::SlotField(DataLine::Output, SlotIndex::DATA);
        assert_eq!(sink.count(data), 0);
        let slot3 = AnnotationClass::SlotField(DataLine::Output, SlotIndex::new(3).expect("slot 3"));
        assert_eq!(sink.texts(slot3), ["SLOT 03: 00042 (undecoded)"]);
        // Slot 2's reserved nibble is set but the slot is not valid.
        assert_eq!(summary.reserved_violations, 0);
        assert_eq!(sink.count(AnnotationClass::Error), 0);
    }

    #[test]
    fn test_validity_does_not_leak_across_frames() {
        let mut wave = Waveform::new();
        let mut first = tag_out(0x400);
        first[2] = 0x12340;
        let mut second = tag_out(0);
        second[2] = 0x56780;
        wave.idle(1).frame(&first, &[0; SLOT_COUNT]).frame(&second, &[0; SLOT_COUNT]);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);
        assert_eq!(summary.frames, 2);
        let data = AnnotationClass::SlotField(DataLine::Output, SlotIndex::DATA);
        assert_eq!(sink.texts(data), ["DATA: 1234", "RSV: 0"]);
    }

    #[test]
    fn test_slot_errors_ordered_across_lines() {
        let mut out = tag_out(0x800);
        out[1] = 0x00001;
        let mut inp = tag_out(0x800);
        inp[1] = 0x80000;
        let mut wave = Waveform::new();
        wave.idle(1).frame(&out, &inp);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);

        assert_eq!(summary.reserved_violations, 2);
        // The input line's direction bit precedes the output line's tail.
        assert_eq!(
            sink.texts(AnnotationClass::Error),
            ["reserved bits set, in slot 1", "reserved bits set, out slot 1"]
        );
        let starts: std::vec::Vec<u64> = sink.of_class(AnnotationClass::Error).map(|a| a.start).collect();
        assert!(starts[0] < starts[1]);
    }

    #[test]
    fn test_partial_frame_dropped_by_default() {
        let mut wave = Waveform::new();
        wave.idle(1).partial_frame(&tag_out(0), &[0; SLOT_COUNT], 40);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.complete_frames, 0);
        assert_eq!(summary.partial_frames, 1);
        assert_eq!(summary.slots, 2);
        assert_eq!(sink.count(AnnotationClass::Warning), 0);
    }

    #[test]
    fn test_partial_frame_warns_when_asked() {
        let mut wave = Waveform::new();
        wave.idle(1).partial_frame(&tag_out(0), &[0; SLOT_COUNT], 40);
        let mut decoder = Ac97Decoder::new(DecoderConfig {
            partial_frame: PartialFramePolicy::Warn,
        });
        let (_, sink) = run(&mut decoder, &wave);
        let warn = sink.of_class(AnnotationClass::Warning).next().expect("warning");
        assert_eq!(warn.start, Waveform::bit_start(1));
        assert_eq!(warn.end, Waveform::bit_start(41));
        assert_eq!(warn.primary(), "end of stream: 40/256 bits");
        assert_eq!(warn.texts[1].as_str(), "partial frame: 40/256 bits");
    }

    #[test]
    fn test_early_sync_restarts_frame() {
        let mut wave = Waveform::new();
        wave.idle(1)
            .partial_frame(&tag_out(0), &[0; SLOT_COUNT], 100)
            .frame(&tag_out(0), &[0; SLOT_COUNT]);
        let mut decoder = Ac97Decoder::new(DecoderConfig {
            partial_frame: PartialFramePolicy::Warn,
        });
        let (summary, sink) = run(&mut decoder, &wave);
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.complete_frames, 1);
        assert_eq!(summary.partial_frames, 1);
        assert_eq!(sink.count(AnnotationClass::Warning), 1);
    }

    #[test]
    fn test_bits_after_full_frame_are_not_accumulated() {
        let mut wave = Waveform::new();
        wave.idle(1).frame(&tag_out(0), &[0; SLOT_COUNT]).idle(30);
        let (summary, sink) = run(&mut Ac97Decoder::default(), &wave);
        assert_eq!(summary.slots, SLOT_COUNT as u64);
        assert_eq!(summary.partial_frames, 0);
        assert_eq!(sink.count(AnnotationClass::BitsOut), 1 + FRAME_BITS + 30);
    }

    #[test]
    fn test_reset_between_streams() {
        let mut truncated = Waveform::new();
        truncated.idle(1).partial_frame(&tag_out(0xFFF), &[0; SLOT_COUNT], 50);
        let mut clean = Waveform::new();
        clean.idle(2).frame(&tag_out(0x800), &[0; SLOT_COUNT]);

        let mut reused = Ac97Decoder::default();
        let _ = run(&mut reused, &truncated);
        let (summary_a, sink_a) = run(&mut reused, &clean);
        let (summary_b, sink_b) = run(&mut Ac97Decoder::default(), &clean);
        assert_eq!(summary_a, summary_b);
        assert_eq!(sink_a.annotations, sink_b.annotations);
    }

    #[test]
    fn test_metadata_recorded_and_survives_reset() {
        let mut decoder = Ac97Decoder::default();
        assert_eq!(decoder.samplerate(), None);
        decoder.metadata(Metadata::SampleRate(50_000_000));
        decoder.reset();
        assert_eq!(decoder.samplerate(), Some(50_000_000));
    }
}
