//! AC'97 AC-link decoder.
//!
//! Turns clock-synchronous logic samples of the AC'97 / MC'97 serial link
//! into frames, slots and typed fields, emitted as classified annotations.
//!
//! # Architecture
//!
//! ```text
//! EdgeSampler (host capture, trait)
//!         ↓  falling edge: SDATA_OUT / SDATA_IN, rising edge: SYNC
//! SyncDetector ──► Frame (bit accumulator, write-once validity bitmaps)
//!         ↓
//! slot::segment (16 + 12 × 20 bit boundaries)
//!         ↓
//! fields::decode_slot (tag / address / data / fallback)
//!         ↓
//! AnnotationSink (host renderer, trait)
//! ```
//!
//! The core is `no_std` and allocation free. A concrete sampler over packed
//! one-byte samples is provided by [`capture::LogicCapture`].
//!
//! # Features
//!
//! - `std`: standard library support, enables the [`testing`] helpers
//! - `defmt`: `defmt::Format` derives on the public plain types
//! - `serde`: `Serialize` derives on annotations
//!
//! # Example
//!
//! ```
//! use ac97::{Ac97Decoder, Annotation, ChannelMap, LogicCapture};
//!
//! let samples = [0u8; 64];
//! let assignment = ChannelMap::default().resolve().unwrap();
//! let mut capture = LogicCapture::new(&samples, assignment);
//! let mut count = 0usize;
//! let mut sink = |_: Annotation| count += 1;
//! let summary = Ac97Decoder::default().decode(&mut capture, &mut sink).unwrap();
//! assert_eq!(summary.frames, 0);
//! ```

// Deny-level policy (unwrap/expect/panic/indexing) lives in the workspace
// [lints] table.
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod annotation;
pub mod bits;
pub mod capture;
pub mod consts;
pub mod decoder;
pub mod error;
pub mod fields;
pub mod frame;
pub mod lines;
pub mod sampler;
pub mod slot;
pub mod sync;
#[cfg(any(test, feature = "std"))]
pub mod testing;

pub use annotation::{Annotation, AnnotationClass, AnnotationRow, AnnotationSink, Text};
pub use capture::LogicCapture;
pub use decoder::{Ac97Decoder, DecodeSummary, DecoderConfig, Metadata, PartialFramePolicy};
pub use error::ConfigError;
pub use frame::{Frame, ValidityBitmap};
pub use lines::{ChannelAssignment, ChannelMap, DataLine, LineLevels, LineSet, Signal};
pub use sampler::{Condition, Edge, EdgeSample, EdgeSampler};
pub use slot::{CompletedSlot, SlotIndex, SlotKind};
