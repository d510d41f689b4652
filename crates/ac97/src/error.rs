//! Setup-time errors.
//!
//! Only line configuration can fail. Everything found in the decoded stream
//! (reserved bits set, undecoded slots, truncated frames) is reported as an
//! annotation and never unwinds the decode loop.

use thiserror_no_std::Error;

use crate::lines::Signal;

/// Invalid line configuration; the decoder refuses to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A mandatory line is not bound to any probe.
    #[error("required line {0} is not assigned to a probe")]
    MissingLine(Signal),
    /// A probe index does not exist in the capture format.
    #[error("probe {probe} for {line} is out of range (0..8)")]
    ProbeOutOfRange {
        /// Line the probe was assigned to.
        line: Signal,
        /// Offending probe index.
        probe: u8,
    },
    /// Two lines were bound to the same probe.
    #[error("probe {probe} is assigned to both {first} and {second}")]
    DuplicateProbe {
        /// Shared probe index.
        probe: u8,
        /// Line that claimed the probe first.
        first: Signal,
        /// Line that claimed it again.
        second: Signal,
    },
}
