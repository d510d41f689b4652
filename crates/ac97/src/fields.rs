//! Slot field layouts and the per-slot decoding routines.
//!
//! Each structured slot is described by a static table of [`FieldSpec`]s
//! whose `(offset, width)` pairs partition the slot. Routines never fail:
//! a non-zero reserved field produces an [`AnnotationClass::Error`]
//! annotation over exactly those bits next to the field annotation itself.

use crate::annotation::{Annotation, AnnotationClass, AnnotationSink};
use crate::bits::{extract, hex_text};
use crate::frame::{Frame, ValidityBitmap};
use crate::lines::DataLine;
use crate::slot::{CompletedSlot, SlotIndex, SlotKind};

// ── Layout tables ────────────────────────────────────────────────────────────

/// How a field value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    /// Single-bit flag, shown as `0`/`1`.
    Flag,
    /// Slot validity bitmap (tag only).
    Bitmap,
    /// Plain value in hex.
    Hex,
    /// Must be zero; anything else is a protocol violation.
    Reserved,
    /// Command direction: 1 = read, 0 = write.
    ReadWrite,
}

/// One named bit range of a slot, MSB-first offset from the slot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldSpec {
    /// Full label.
    pub label: &'static str,
    /// Abbreviated label.
    pub short: &'static str,
    /// First bit within the slot.
    pub offset: u8,
    /// Width in bits.
    pub width: u8,
    /// Rendering and validation rule.
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(label: &'static str, short: &'static str, offset: u8, width: u8, kind: FieldKind) -> Self {
        Self {
            label,
            short,
            offset,
            width,
            kind,
        }
    }

    /// Extract this field from a `slot_width`-bit slot value.
    pub fn value(&self, slot_value: u32, slot_width: u8) -> u32 {
        extract(slot_value, slot_width, self.offset, self.width)
    }

    /// One past the last bit of the field within the slot.
    pub const fn end(&self) -> u8 {
        self.offset + self.width
    }
}

/// Slot 0 on either line.
pub const TAG_LAYOUT: [FieldSpec; 4] = [
    FieldSpec::new("READY", "RDY", 0, 1, FieldKind::Flag),
    FieldSpec::new("VALID", "V", 1, 12, FieldKind::Bitmap),
    FieldSpec::new("RSV", "R", 13, 1, FieldKind::Reserved),
    FieldSpec::new("CODEC", "ID", 14, 2, FieldKind::Hex),
];

/// Slot 1 on SDATA_OUT: command address.
pub const ADDRESS_OUT_LAYOUT: [FieldSpec; 3] = [
    FieldSpec::new("R/W", "RW", 0, 1, FieldKind::ReadWrite),
    FieldSpec::new("ADDR", "A", 1, 7, FieldKind::Hex),
    FieldSpec::new("RSV", "R", 8, 12, FieldKind::Reserved),
];

/// Slot 1 on SDATA_IN: status address.
///
/// The 12-bit tail also carries slot requests on codecs with variable rate
/// support; it is only checked as reserved here.
pub const ADDRESS_IN_LAYOUT: [FieldSpec; 3] = [
    FieldSpec::new("RSV", "R", 0, 1, FieldKind::Reserved),
    FieldSpec::new("ADDR", "A", 1, 7, FieldKind::Hex),
    FieldSpec::new("RSV", "R", 8, 12, FieldKind::Reserved),
];

/// Slot 2 on either line: command / status data.
pub const DATA_LAYOUT: [FieldSpec; 2] = [
    FieldSpec::new("DATA", "D", 0, 16, FieldKind::Hex),
    FieldSpec::new("RSV", "R", 16, 4, FieldKind::Reserved),
];

/// Field layout for a slot kind on `line`; empty for [`SlotKind::Fallback`].
pub fn layout(kind: SlotKind, line: DataLine) -> &'static [FieldSpec] {
    match (kind, line) {
        (SlotKind::Tag, _) => &TAG_LAYOUT,
        (SlotKind::Address, DataLine::Output) => &ADDRESS_OUT_LAYOUT,
        (SlotKind::Address, DataLine::Input) => &ADDRESS_IN_LAYOUT,
        (SlotKind::Data, _) => &DATA_LAYOUT,
        (SlotKind::Fallback, _) => &[],
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// What decoding one slot on one line produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotOutcome {
    /// Whether the slot passed the validity gate and was decoded.
    pub decoded: bool,
    /// Field annotations emitted.
    pub fields: u32,
    /// Reserved fields found non-zero.
    pub violations: u32,
    /// VALID bitmap, set by the tag slot only.
    pub validity: Option<ValidityBitmap>,
}

/// Decode `slot` on `line` and emit its field annotations.
///
/// The tag slot is always decoded; slots 1..12 only when this frame's tag on
/// the same line flags them valid. The returned bitmap is for the caller to
/// store: this routine only reads the frame.
pub fn decode_slot<S>(frame: &Frame, slot: &CompletedSlot, line: DataLine, sink: &mut S) -> SlotOutcome
where
    S: AnnotationSink + ?Sized,
{
    let kind = slot.index.kind();
    if kind != SlotKind::Tag && !frame.is_slot_valid(line, slot.index) {
        return SlotOutcome::default();
    }

    let mut outcome = SlotOutcome {
        decoded: true,
        ..SlotOutcome::default()
    };

    if kind == SlotKind::Fallback {
        if let Some((start, end)) = frame.span(slot.index.start_bit(), slot.index.end_bit()) {
            sink.emit(undecoded(start, end, slot, line));
            outcome.fields = 1;
        }
        return outcome;
    }

    let value = slot.value(line);
    for spec in layout(kind, line) {
        let field = spec.value(value, slot.width());
        let first = slot.start_bit() + usize::from(spec.offset);
        let last = slot.start_bit() + usize::from(spec.end());
        let Some((start, end)) = frame.span(first, last) else {
            continue;
        };

        let class = AnnotationClass::SlotField(line, slot.index);
        sink.emit(field_annotation(start, end, class, spec, field));
        outcome.fields += 1;

        match spec.kind {
            FieldKind::Bitmap => outcome.validity = Some(ValidityBitmap::from_field(field)),
            FieldKind::Reserved if field != 0 => {
                tracing::debug!(
                    slot = slot.index.get(),
                    line = line.id(),
                    offset = spec.offset,
                    value = field,
                    "reserved bits set"
                );
                sink.emit(reserved_violation(start, end, slot.index, line));
                outcome.violations += 1;
            }
            _ => {}
        }
    }
    outcome
}

fn field_annotation(start: u64, end: u64, class: AnnotationClass, spec: &FieldSpec, field: u32) -> Annotation {
    let ann = Annotation::new(start, end, class);
    if spec.kind == FieldKind::ReadWrite {
        return if field == 0 {
            ann.text(format_args!("WRITE")).text(format_args!("WR")).text(format_args!("W"))
        } else {
            ann.text(format_args!("READ")).text(format_args!("RD")).text(format_args!("R"))
        };
    }
    let hex = hex_text(field, spec.width);
    ann.text(format_args!("{}: {}", spec.label, hex))
        .text(format_args!("{}: {}", spec.short, hex))
        .text(format_args!("{hex}"))
}

fn reserved_violation(start: u64, end: u64, index: SlotIndex, line: DataLine) -> Annotation {
    Annotation::new(start, end, AnnotationClass::Error)
        .text(format_args!("reserved bits set, {} slot {}", line.id(), index.get()))
        .text(format_args!("reserved bits set"))
        .text(format_args!("RSV"))
}

fn undecoded(start: u64, end: u64, slot: &CompletedSlot, line: DataLine) -> Annotation {
    let hex = hex_text(slot.value(line), slot.width());
    let index = slot.index.get();
    Annotation::new(start, end, AnnotationClass::SlotField(line, slot.index))
        .text(format_args!("SLOT {index:02}: {hex} (undecoded)"))
        .text(format_args!("S{index:02}: {hex}"))
        .text(format_args!("{hex}"))
}
