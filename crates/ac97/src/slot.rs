//! Slot indices and the slot segmenter.
//!
//! Slot boundaries are protocol constants ([`SLOT_BOUNDARIES`]); only which
//! slots carry meaningful data varies per frame. The segmenter fires when
//! the frame's bit count lands exactly on the next boundary.

use crate::bits::bits_to_int;
use crate::consts::{DATA_SLOT_BITS, SLOT_BOUNDARIES, SLOT_COUNT, TAG_SLOT_BITS};
use crate::frame::Frame;
use crate::lines::DataLine;

// ── SlotIndex ────────────────────────────────────────────────────────────────

/// Index of a slot within a frame, `0..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Slot 0: tag.
    pub const TAG: SlotIndex = SlotIndex(0);
    /// Slot 1: command address (output) / status address (input).
    pub const ADDRESS: SlotIndex = SlotIndex(1);
    /// Slot 2: command data (output) / status data (input).
    pub const DATA: SlotIndex = SlotIndex(2);
    /// Slot 12: modem I/O control (output) / status (input).
    pub const IO: SlotIndex = SlotIndex(12);

    /// Slot `index`, or `None` past slot 12.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < SLOT_COUNT {
            Some(SlotIndex(index))
        } else {
            None
        }
    }

    /// All thirteen slots in wire order.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT as u8).map(SlotIndex)
    }

    /// Numeric index.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Numeric index as `usize`.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Width in bits: 16 for the tag, 20 otherwise.
    pub const fn width(self) -> u8 {
        if self.0 == 0 {
            TAG_SLOT_BITS
        } else {
            DATA_SLOT_BITS
        }
    }

    /// First bit of the slot within the frame.
    #[allow(clippy::indexing_slicing)] // index < SLOT_COUNT by construction
    pub const fn start_bit(self) -> usize {
        SLOT_BOUNDARIES[self.0 as usize]
    }

    /// One past the last bit of the slot within the frame.
    #[allow(clippy::indexing_slicing)] // index + 1 <= SLOT_COUNT by construction
    pub const fn end_bit(self) -> usize {
        SLOT_BOUNDARIES[self.0 as usize + 1]
    }

    /// Decoding routine for this slot.
    pub const fn kind(self) -> SlotKind {
        match self.0 {
            0 => SlotKind::Tag,
            1 => SlotKind::Address,
            2 => SlotKind::Data,
            _ => SlotKind::Fallback,
        }
    }
}

// ── SlotKind ─────────────────────────────────────────────────────────────────

/// Closed set of slot decoding routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotKind {
    /// Slot 0: READY, VALID bitmap, reserved bit, codec ID.
    Tag,
    /// Slot 1: read/write flag, register address, reserved tail.
    Address,
    /// Slot 2: 16-bit register data, reserved nibble.
    Data,
    /// Slots 3..12: PCM / modem payloads, shown as raw values.
    Fallback,
}

// ── Segmenter ────────────────────────────────────────────────────────────────

/// A slot that just completed, with its value on both lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletedSlot {
    /// Which slot.
    pub index: SlotIndex,
    /// SDATA_OUT value, MSB first.
    pub output: u32,
    /// SDATA_IN value, MSB first.
    pub input: u32,
}

impl CompletedSlot {
    /// Value on `line`.
    pub const fn value(&self, line: DataLine) -> u32 {
        match line {
            DataLine::Output => self.output,
            DataLine::Input => self.input,
        }
    }

    /// Slot width in bits.
    pub const fn width(&self) -> u8 {
        self.index.width()
    }

    /// First bit of the slot within the frame.
    pub const fn start_bit(&self) -> usize {
        self.index.start_bit()
    }
}

/// Complete the next slot of `frame` if its bit count sits exactly on that
/// slot's upper boundary.
///
/// The slot values are recorded in the frame, so each slot fires at most
/// once per frame.
pub fn segment(frame: &mut Frame) -> Option<CompletedSlot> {
    let index = SlotIndex::new(u8::try_from(frame.completed_slots()).ok()?)?;
    if frame.bit_count() != index.end_bit() {
        return None;
    }

    let range = index.start_bit()..index.end_bit();
    let output = bits_to_int(frame.bits(DataLine::Output).get(range.clone())?);
    let input = bits_to_int(frame.bits(DataLine::Input).get(range)?);
    frame.record_slot(output, input);

    tracing::trace!(slot = index.get(), output, input, "slot complete");
    Some(CompletedSlot {
        index,
        output,
        input,
    })
}
