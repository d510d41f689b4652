//! Bit-position helpers shared by the segmenter and field decoders.
//!
//! Slots are at most 20 bits wide, so every slot value fits a `u32`. Bit 0 of
//! a slot is the first bit on the wire and the most significant bit of its
//! integer value.

use core::fmt::Write;

/// Digits needed to print a `width`-bit value in hex.
pub const fn nibble_digits(width: u8) -> usize {
    (width as usize).div_ceil(4)
}

/// Mask with the low `width` bits set.
pub const fn mask(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Convert an MSB-first bit sequence into an unsigned value.
///
/// Sequences longer than 32 bits keep the last 32.
pub fn bits_to_int(bits: &[bool]) -> u32 {
    bits.iter()
        .fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit))
}

/// Extract the field at `offset..offset + width` (MSB-first) from a
/// `slot_width`-bit value.
///
/// Out-of-range views yield 0 rather than panicking.
pub fn extract(value: u32, slot_width: u8, offset: u8, width: u8) -> u32 {
    let Some(shift) = slot_width
        .checked_sub(offset)
        .and_then(|rest| rest.checked_sub(width))
    else {
        return 0;
    };
    value.checked_shr(u32::from(shift)).unwrap_or(0) & mask(width)
}

/// Place `field` at `offset..offset + width` of a `slot_width`-bit value.
///
/// Inverse of [`extract`]; bits of `field` above `width` are dropped.
pub fn insert(field: u32, slot_width: u8, offset: u8, width: u8) -> u32 {
    let Some(shift) = slot_width
        .checked_sub(offset)
        .and_then(|rest| rest.checked_sub(width))
    else {
        return 0;
    };
    (field & mask(width)).checked_shl(u32::from(shift)).unwrap_or(0)
}

/// Zero-padded lower-case hex text for a `width`-bit value.
pub fn hex_text(value: u32, width: u8) -> heapless::String<8> {
    let mut text = heapless::String::new();
    // At most 8 digits for a u32; never exceeds capacity.
    let _ = write!(text, "{:0digits$x}", value & mask(width), digits = nibble_digits(width));
    text
}
