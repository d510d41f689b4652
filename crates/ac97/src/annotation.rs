//! Annotation records and the write-only sink they are emitted to.
//!
//! Every decoded unit becomes one [`Annotation`]: a sample range, a class
//! and up to three text variants ordered from most to least verbose, so a
//! renderer can pick whichever fits the space it has.

use core::fmt;
use core::fmt::Write;

use crate::lines::DataLine;
use crate::slot::SlotIndex;

/// Capacity of one text variant.
pub const TEXT_CAPACITY: usize = 32;

/// Maximum number of text variants per annotation.
pub const MAX_TEXT_VARIANTS: usize = 3;

/// One text variant.
pub type Text = heapless::String<TEXT_CAPACITY>;

/// Text variants, most verbose first.
pub type TextVariants = heapless::Vec<Text, MAX_TEXT_VARIANTS>;

// ── AnnotationClass ──────────────────────────────────────────────────────────

/// Classification of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AnnotationClass {
    /// One SDATA_OUT bit.
    BitsOut,
    /// One SDATA_IN bit.
    BitsIn,
    /// Raw value of a completed slot, emitted for every slot regardless of
    /// validity.
    SlotRaw(DataLine),
    /// Structured field of a slot, emitted only for valid slots.
    SlotField(DataLine, SlotIndex),
    /// Non-fatal stream irregularity.
    Warning,
    /// Protocol violation (reserved bits set).
    Error,
}

/// Display row grouping annotation classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AnnotationRow {
    /// Output bits.
    BitsOut,
    /// Input bits.
    BitsIn,
    /// Raw output slot values.
    RawOut,
    /// Raw input slot values.
    RawIn,
    /// Decoded output slot fields.
    SlotsOut,
    /// Decoded input slot fields.
    SlotsIn,
    /// Warnings.
    Warnings,
    /// Errors.
    Errors,
}

const OUT_FIELD_IDS: [&str; 13] = [
    "slot-out-tag",
    "slot-out-cmd-addr",
    "slot-out-cmd-data",
    "slot-out-03",
    "slot-out-04",
    "slot-out-05",
    "slot-out-06",
    "slot-out-07",
    "slot-out-08",
    "slot-out-09",
    "slot-out-10",
    "slot-out-11",
    "slot-out-io-ctrl",
];

const IN_FIELD_IDS: [&str; 13] = [
    "slot-in-tag",
    "slot-in-sts-addr",
    "slot-in-sts-data",
    "slot-in-03",
    "slot-in-04",
    "slot-in-05",
    "slot-in-06",
    "slot-in-07",
    "slot-in-08",
    "slot-in-09",
    "slot-in-10",
    "slot-in-11",
    "slot-in-io-sts",
];

impl AnnotationClass {
    /// Number of distinct classes.
    pub const COUNT: usize = 32;

    /// Dense numeric index, `0..COUNT`.
    ///
    /// Order: bits out/in, raw out/in, 13 output field classes, 13 input
    /// field classes, warning, error.
    pub fn index(self) -> usize {
        match self {
            AnnotationClass::BitsOut => 0,
            AnnotationClass::BitsIn => 1,
            AnnotationClass::SlotRaw(DataLine::Output) => 2,
            AnnotationClass::SlotRaw(DataLine::Input) => 3,
            AnnotationClass::SlotField(DataLine::Output, slot) => 4 + slot.as_usize(),
            AnnotationClass::SlotField(DataLine::Input, slot) => 17 + slot.as_usize(),
            AnnotationClass::Warning => 30,
            AnnotationClass::Error => 31,
        }
    }

    /// Stable identifier.
    pub fn id(self) -> &'static str {
        match self {
            AnnotationClass::BitsOut => "bits-out",
            AnnotationClass::BitsIn => "bits-in",
            AnnotationClass::SlotRaw(DataLine::Output) => "slot-raw-out",
            AnnotationClass::SlotRaw(DataLine::Input) => "slot-raw-in",
            AnnotationClass::SlotField(line, slot) => {
                let ids = match line {
                    DataLine::Output => &OUT_FIELD_IDS,
                    DataLine::Input => &IN_FIELD_IDS,
                };
                ids.get(slot.as_usize()).copied().unwrap_or("slot")
            }
            AnnotationClass::Warning => "warn",
            AnnotationClass::Error => "err",
        }
    }

    /// Row the class is displayed in.
    pub fn row(self) -> AnnotationRow {
        match self {
            AnnotationClass::BitsOut => AnnotationRow::BitsOut,
            AnnotationClass::BitsIn => AnnotationRow::BitsIn,
            AnnotationClass::SlotRaw(DataLine::Output) => AnnotationRow::RawOut,
            AnnotationClass::SlotRaw(DataLine::Input) => AnnotationRow::RawIn,
            AnnotationClass::SlotField(DataLine::Output, _) => AnnotationRow::SlotsOut,
            AnnotationClass::SlotField(DataLine::Input, _) => AnnotationRow::SlotsIn,
            AnnotationClass::Warning => AnnotationRow::Warnings,
            AnnotationClass::Error => AnnotationRow::Errors,
        }
    }

    /// Data line the class belongs to, if any.
    pub fn line(self) -> Option<DataLine> {
        match self {
            AnnotationClass::BitsOut => Some(DataLine::Output),
            AnnotationClass::BitsIn => Some(DataLine::Input),
            AnnotationClass::SlotRaw(line) | AnnotationClass::SlotField(line, _) => Some(line),
            AnnotationClass::Warning | AnnotationClass::Error => None,
        }
    }
}

impl fmt::Display for AnnotationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ── Annotation ───────────────────────────────────────────────────────────────

/// A classified, human-readable record over a sample range.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Annotation {
    /// First sample covered.
    pub start: u64,
    /// Sample where the range ends.
    pub end: u64,
    /// Classification.
    pub class: AnnotationClass,
    /// Text variants, most verbose first.
    pub texts: TextVariants,
}

impl Annotation {
    /// Create an annotation with no text.
    pub fn new(start: u64, end: u64, class: AnnotationClass) -> Self {
        Self {
            start,
            end,
            class,
            texts: TextVariants::new(),
        }
    }

    /// Append a text variant.
    ///
    /// Variants beyond [`MAX_TEXT_VARIANTS`] are dropped; text beyond
    /// [`TEXT_CAPACITY`] is cut at the formatting piece that overflowed.
    #[must_use]
    pub fn text(mut self, args: fmt::Arguments<'_>) -> Self {
        let mut text = Text::new();
        let _ = text.write_fmt(args);
        let _ = self.texts.push(text);
        self
    }

    /// Most verbose text, or `""` when there is none.
    pub fn primary(&self) -> &str {
        self.texts.first().map_or("", |t| t.as_str())
    }

    /// Least verbose text, or `""` when there is none.
    pub fn shortest(&self) -> &str {
        self.texts.last().map_or("", |t| t.as_str())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {}: {}",
            self.start,
            self.end,
            self.class.id(),
            self.primary()
        )
    }
}

// ── AnnotationSink ───────────────────────────────────────────────────────────

/// Append-only consumer of annotations.
///
/// Annotations arrive in emission order; within one [`AnnotationRow`] their
/// start positions never decrease.
pub trait AnnotationSink {
    /// Accept one annotation.
    fn emit(&mut self, annotation: Annotation);
}

impl<F: FnMut(Annotation)> AnnotationSink for F {
    fn emit(&mut self, annotation: Annotation) {
        self(annotation);
    }
}
