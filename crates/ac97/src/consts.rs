//! AC-link protocol constants.
//!
//! A frame is 256 BIT_CLK cycles long: one 16-bit tag slot followed by
//! twelve 20-bit slots. At the nominal 12.288 MHz bit clock this gives the
//! 48 kHz frame rate.

/// Bits per frame on each data line.
pub const FRAME_BITS: usize = 256;

/// Slots per frame (tag + 12 data slots).
pub const SLOT_COUNT: usize = 13;

/// Width of slot 0 (tag).
pub const TAG_SLOT_BITS: u8 = 16;

/// Width of slots 1..12.
pub const DATA_SLOT_BITS: u8 = 20;

/// Number of slots covered by the tag's VALID bitmap (slots 1..12).
pub const VALIDITY_BITS: usize = 12;

/// Cumulative slot boundaries within a frame, in bits.
///
/// Slot `n` spans `SLOT_BOUNDARIES[n]..SLOT_BOUNDARIES[n + 1]`.
pub const SLOT_BOUNDARIES: [usize; SLOT_COUNT + 1] = [
    0, 16, 36, 56, 76, 96, 116, 136, 156, 176, 196, 216, 236, 256,
];

/// Nominal BIT_CLK frequency in Hz.
pub const NOMINAL_BIT_CLK_HZ: u32 = 12_288_000;

/// Nominal frame rate in Hz.
pub const NOMINAL_FRAME_RATE_HZ: u32 = 48_000;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_cover_frame() {
        assert_eq!(SLOT_BOUNDARIES[0], 0);
        assert_eq!(SLOT_BOUNDARIES[SLOT_COUNT], FRAME_BITS);
    }

    #[test]
    fn test_boundaries_follow_slot_widths() {
        assert_eq!(SLOT_BOUNDARIES[1], usize::from(TAG_SLOT_BITS));
        for pair in SLOT_BOUNDARIES[1..].windows(2) {
            assert_eq!(pair[1] - pair[0], usize::from(DATA_SLOT_BITS));
        }
    }

    #[test]
    fn test_nominal_clock_gives_frame_rate() {
        assert_eq!(NOMINAL_BIT_CLK_HZ / FRAME_BITS as u32, NOMINAL_FRAME_RATE_HZ);
    }
}
