//! Per-frame accumulator.
//!
//! A [`Frame`] is created fresh at every detected frame start and dropped
//! when the next one begins, so nothing decoded in one frame can leak into
//! the next. It owns the bit history of both data lines, the sample
//! boundaries of every bit, the completed slot values and the validity
//! bitmaps written by the tag slot.

use heapless::Vec;

use crate::consts::{FRAME_BITS, SLOT_COUNT, VALIDITY_BITS};
use crate::lines::DataLine;
use crate::slot::SlotIndex;

const BOUNDARY_CAPACITY: usize = FRAME_BITS + 1;

// ── ValidityBitmap ───────────────────────────────────────────────────────────

/// Which of slots 1..12 carry valid data, from the tag's 12-bit VALID field.
///
/// The field is MSB first: bit 11 flags slot 1, bit 0 flags slot 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ValidityBitmap(u16);

impl ValidityBitmap {
    /// Build from the raw VALID field; bits above 12 are ignored.
    pub const fn from_field(valid: u32) -> Self {
        ValidityBitmap((valid & 0x0FFF) as u16)
    }

    /// The raw 12-bit field.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether `slot` is flagged valid. The tag slot is always valid.
    pub const fn is_valid(self, slot: SlotIndex) -> bool {
        match slot.get() {
            0 => true,
            n => {
                let shift = VALIDITY_BITS as u8 - n;
                (self.0 >> shift) & 1 != 0
            }
        }
    }

    /// Flags for slots 1..12, in slot order.
    pub fn flags(self) -> [bool; VALIDITY_BITS] {
        core::array::from_fn(|i| {
            let shift = VALIDITY_BITS - 1 - i;
            (self.0 >> shift) & 1 != 0
        })
    }

    /// Number of valid data slots.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

// ── Frame ────────────────────────────────────────────────────────────────────

/// Bits, boundaries and decoded state of the frame being received.
///
/// Invariant: both bit sequences have the same length, one less than the
/// boundary sequence, and never exceed [`FRAME_BITS`].
#[derive(Debug, Clone)]
pub struct Frame {
    boundaries: Vec<u64, BOUNDARY_CAPACITY>,
    bits: [Vec<bool, FRAME_BITS>; 2],
    slots: [Vec<u32, SLOT_COUNT>; 2],
    validity: [Option<ValidityBitmap>; 2],
}

impl Frame {
    /// Open a frame whose first bit interval begins at sample `start`.
    pub fn new(start: u64) -> Self {
        let mut boundaries = Vec::new();
        // Capacity is FRAME_BITS + 1; the first push cannot fail.
        let _ = boundaries.push(start);
        Self {
            boundaries,
            bits: [Vec::new(), Vec::new()],
            slots: [Vec::new(), Vec::new()],
            validity: [None, None],
        }
    }

    /// Sample at which the frame began.
    pub fn start(&self) -> u64 {
        self.boundaries.first().copied().unwrap_or_default()
    }

    /// Sample at which the most recent bit interval ended.
    pub fn end(&self) -> u64 {
        self.boundaries.last().copied().unwrap_or_default()
    }

    /// Bits accumulated so far on each line.
    pub fn bit_count(&self) -> usize {
        self.bits[0].len()
    }

    /// Whether all 256 bits have been received.
    pub fn is_full(&self) -> bool {
        self.bit_count() >= FRAME_BITS
    }

    /// Append one bit per line for the interval ending at sample `end`.
    ///
    /// Returns `false`, leaving the frame untouched, once it is full.
    pub fn push_bits(&mut self, end: u64, output: bool, input: bool) -> bool {
        if self.is_full() {
            return false;
        }
        let [out_bits, in_bits] = &mut self.bits;
        // is_full() guards all three pushes: bits < 256, boundaries < 257.
        let _ = out_bits.push(output);
        let _ = in_bits.push(input);
        let _ = self.boundaries.push(end);
        true
    }

    /// Bits received on `line`.
    pub fn bits(&self, line: DataLine) -> &[bool] {
        match line {
            DataLine::Output => &self.bits[0],
            DataLine::Input => &self.bits[1],
        }
    }

    /// Sample boundaries: entry `n` is where bit `n` starts.
    pub fn boundaries(&self) -> &[u64] {
        &self.boundaries
    }

    /// Sample range covering frame bits `first..last`.
    pub fn span(&self, first: usize, last: usize) -> Option<(u64, u64)> {
        Some((*self.boundaries.get(first)?, *self.boundaries.get(last)?))
    }

    /// Number of completed slots.
    pub fn completed_slots(&self) -> usize {
        self.slots[0].len()
    }

    /// Completed slot values on `line`, in slot order.
    pub fn slot_values(&self, line: DataLine) -> &[u32] {
        match line {
            DataLine::Output => &self.slots[0],
            DataLine::Input => &self.slots[1],
        }
    }

    pub(crate) fn record_slot(&mut self, output: u32, input: u32) {
        let [out_slots, in_slots] = &mut self.slots;
        // Only called by the segmenter, at most SLOT_COUNT times per frame.
        let _ = out_slots.push(output);
        let _ = in_slots.push(input);
    }

    /// Validity bitmap decoded from this frame's tag on `line`.
    ///
    /// `None` until the tag slot has completed.
    pub fn validity(&self, line: DataLine) -> Option<ValidityBitmap> {
        match line {
            DataLine::Output => self.validity[0],
            DataLine::Input => self.validity[1],
        }
    }

    /// Whether `slot` on `line` is flagged valid in this frame.
    pub fn is_slot_valid(&self, line: DataLine, slot: SlotIndex) -> bool {
        self.validity(line).is_some_and(|v| v.is_valid(slot))
    }

    /// Store the tag's bitmap for `line`. Write-once: a second write for the
    /// same line is ignored.
    pub(crate) fn set_validity(&mut self, line: DataLine, bitmap: ValidityBitmap) {
        let [out_valid, in_valid] = &mut self.validity;
        let slot = match line {
            DataLine::Output => out_valid,
            DataLine::Input => in_valid,
        };
        if slot.is_none() {
            *slot = Some(bitmap);
        }
    }
}
