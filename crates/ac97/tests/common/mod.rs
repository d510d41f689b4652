//! Packed-capture builder shared by the integration tests.
//!
//! Produces the byte-per-sample layout `LogicCapture` reads, with each
//! BIT_CLK half period held for several samples the way a logic analyzer
//! oversamples a real link.

#![allow(dead_code)]

use ac97::{ChannelAssignment, ChannelMap, Signal};

pub const SLOTS: usize = 13;

/// Samples per BIT_CLK half period.
pub const HALF_PERIOD: usize = 3;

/// Slot values for one frame, output and input.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSpec {
    pub output: [u32; SLOTS],
    pub input: [u32; SLOTS],
}

impl FrameSpec {
    /// A frame whose output tag has READY set and `valid` as its VALID field.
    pub fn with_out_tag(valid: u32) -> Self {
        let mut spec = Self::default();
        spec.output[0] = 0x8000 | (valid << 3);
        spec
    }

    /// A frame whose input tag has READY set and `valid` as its VALID field.
    pub fn with_in_tag(mut self, valid: u32) -> Self {
        self.input[0] = 0x8000 | (valid << 3);
        self
    }

    pub fn out_slot(mut self, slot: usize, value: u32) -> Self {
        self.output[slot] = value;
        self
    }

    pub fn in_slot(mut self, slot: usize, value: u32) -> Self {
        self.input[slot] = value;
        self
    }
}

fn slot_width(slot: usize) -> u32 {
    if slot == 0 { 16 } else { 20 }
}

fn serialise(slots: &[u32; SLOTS]) -> Vec<bool> {
    slots
        .iter()
        .enumerate()
        .flat_map(|(slot, &value)| (0..slot_width(slot)).rev().map(move |s| (value >> s) & 1 != 0))
        .collect()
}

/// Byte-per-sample capture under construction.
pub struct CaptureBuilder {
    channels: ChannelAssignment,
    bytes: Vec<u8>,
    sync: bool,
    bits: usize,
}

impl CaptureBuilder {
    /// Start with BIT_CLK low then one priming rising edge.
    pub fn new(map: ChannelMap) -> Self {
        let channels = map.resolve().expect("valid channel map");
        let mut builder = Self {
            channels,
            bytes: Vec::new(),
            sync: false,
            bits: 0,
        };
        builder.hold(false, false, false);
        builder.hold(true, false, false);
        builder
    }

    pub fn channels(&self) -> ChannelAssignment {
        self.channels
    }

    fn hold(&mut self, clk: bool, out: bool, inp: bool) {
        let mut byte = 0u8;
        for (signal, level) in [
            (Signal::BitClk, clk),
            (Signal::DataOut, out),
            (Signal::DataIn, inp),
            (Signal::Sync, self.sync),
        ] {
            if let (Some(probe), true) = (self.channels.probe(signal), level) {
                byte |= 1 << probe;
            }
        }
        self.bytes.extend(std::iter::repeat(byte).take(HALF_PERIOD));
    }

    /// One BIT_CLK cycle: data while low, SYNC switched with the rising edge.
    pub fn bit(&mut self, out: bool, inp: bool, sync: bool) -> &mut Self {
        self.hold(false, out, inp);
        self.sync = sync;
        self.hold(true, out, inp);
        self.bits += 1;
        self
    }

    pub fn idle(&mut self, cycles: usize) -> &mut Self {
        for _ in 0..cycles {
            self.bit(false, false, false);
        }
        self
    }

    pub fn frame(&mut self, spec: &FrameSpec) -> &mut Self {
        self.partial(spec, 256)
    }

    pub fn partial(&mut self, spec: &FrameSpec, bits: usize) -> &mut Self {
        let out = serialise(&spec.output);
        let inp = serialise(&spec.input);
        for (n, (o, i)) in out.into_iter().zip(inp).take(bits).enumerate() {
            self.bit(o, i, n < 16);
        }
        self
    }

    /// Sample position of the rising edge that opens bit `k`.
    pub fn bit_start(k: usize) -> u64 {
        ((2 * k + 1) * HALF_PERIOD) as u64
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
