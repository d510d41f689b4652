//! Logical AC-link lines and their binding to capture probes.
//!
//! The decoder only ever addresses lines by role ([`Signal`]). The host
//! binds roles to physical probe indices through a [`ChannelMap`], which is
//! validated once into a [`ChannelAssignment`] before any decoding starts.

use core::fmt;

use crate::error::ConfigError;

/// Number of probes in a one-byte packed sample.
pub const PROBE_COUNT: u8 = 8;

// ── Signal ───────────────────────────────────────────────────────────────────

/// Logical AC-link line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Signal {
    /// SDATA_OUT: controller → codec serial data.
    DataOut,
    /// SDATA_IN: codec → controller serial data.
    DataIn,
    /// BIT_CLK: 12.288 MHz bit clock driven by the codec.
    BitClk,
    /// SYNC: 48 kHz frame synchronisation driven by the controller.
    Sync,
    /// RESET#: optional, not interpreted by the decoder.
    Reset,
}

impl Signal {
    /// All lines, in default probe order.
    pub const ALL: [Signal; 5] = [
        Signal::DataOut,
        Signal::DataIn,
        Signal::BitClk,
        Signal::Sync,
        Signal::Reset,
    ];

    /// Lines that must be bound before the decoder will run.
    pub const REQUIRED: [Signal; 4] = [
        Signal::DataOut,
        Signal::DataIn,
        Signal::BitClk,
        Signal::Sync,
    ];

    /// Short identifier, as used on the command line.
    pub const fn id(self) -> &'static str {
        match self {
            Signal::DataOut => "out",
            Signal::DataIn => "in",
            Signal::BitClk => "clk",
            Signal::Sync => "sync",
            Signal::Reset => "rst",
        }
    }

    /// Signal name as printed in the AC'97 specification.
    pub const fn name(self) -> &'static str {
        match self {
            Signal::DataOut => "SDATA_OUT",
            Signal::DataIn => "SDATA_IN",
            Signal::BitClk => "BIT_CLK",
            Signal::Sync => "SYNC",
            Signal::Reset => "RESET",
        }
    }

    /// Whether the decoder refuses to run without this line.
    pub const fn is_required(self) -> bool {
        !matches!(self, Signal::Reset)
    }

    const fn bit(self) -> u8 {
        match self {
            Signal::DataOut => 1 << 0,
            Signal::DataIn => 1 << 1,
            Signal::BitClk => 1 << 2,
            Signal::Sync => 1 << 3,
            Signal::Reset => 1 << 4,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Signal::DataOut => 0,
            Signal::DataIn => 1,
            Signal::BitClk => 2,
            Signal::Sync => 3,
            Signal::Reset => 4,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── DataLine ─────────────────────────────────────────────────────────────────

/// One of the two serial data lines decoded in lock-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DataLine {
    /// SDATA_OUT (controller → codec): commands and playback.
    Output,
    /// SDATA_IN (codec → controller): status and capture.
    Input,
}

impl DataLine {
    /// Both lines, output first.
    pub const ALL: [DataLine; 2] = [DataLine::Output, DataLine::Input];

    /// Array index for per-line storage.
    pub const fn index(self) -> usize {
        match self {
            DataLine::Output => 0,
            DataLine::Input => 1,
        }
    }

    /// Short identifier used in annotation class ids.
    pub const fn id(self) -> &'static str {
        match self {
            DataLine::Output => "out",
            DataLine::Input => "in",
        }
    }

    /// The [`Signal`] carrying this line.
    pub const fn signal(self) -> Signal {
        match self {
            DataLine::Output => Signal::DataOut,
            DataLine::Input => Signal::DataIn,
        }
    }
}

// ── LineLevels ───────────────────────────────────────────────────────────────

/// Levels of all bound lines at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineLevels {
    /// SDATA_OUT level.
    pub data_out: bool,
    /// SDATA_IN level.
    pub data_in: bool,
    /// BIT_CLK level.
    pub bit_clk: bool,
    /// SYNC level.
    pub sync: bool,
    /// RESET# level, `None` when the line is not bound.
    pub reset: Option<bool>,
}

impl LineLevels {
    /// Level of `signal`, `None` for an unbound optional line.
    pub const fn level(&self, signal: Signal) -> Option<bool> {
        match signal {
            Signal::DataOut => Some(self.data_out),
            Signal::DataIn => Some(self.data_in),
            Signal::BitClk => Some(self.bit_clk),
            Signal::Sync => Some(self.sync),
            Signal::Reset => self.reset,
        }
    }

    /// Level of a data line.
    pub const fn data(&self, line: DataLine) -> bool {
        match line {
            DataLine::Output => self.data_out,
            DataLine::Input => self.data_in,
        }
    }
}

// ── LineSet ──────────────────────────────────────────────────────────────────

/// Set of bound lines, as reported by an edge sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSet(u8);

impl LineSet {
    /// The empty set.
    pub const EMPTY: LineSet = LineSet(0);

    /// The four mandatory lines.
    pub const REQUIRED: LineSet = LineSet(
        Signal::DataOut.bit() | Signal::DataIn.bit() | Signal::BitClk.bit() | Signal::Sync.bit(),
    );

    /// Add `signal` to the set.
    #[must_use]
    pub const fn with(self, signal: Signal) -> Self {
        LineSet(self.0 | signal.bit())
    }

    /// Whether `signal` is in the set.
    pub const fn contains(self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    /// First mandatory line missing from the set, if any.
    pub fn missing_required(self) -> Option<Signal> {
        Signal::REQUIRED.into_iter().find(|s| !self.contains(*s))
    }
}

// ── ChannelMap ───────────────────────────────────────────────────────────────

/// Host-provided binding of logical lines to probe indices.
///
/// The default map uses the usual probe order: SDATA_OUT on probe
/// 0, SDATA_IN on 1, BIT_CLK on 2, SYNC on 3, RESET unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMap {
    probes: [Option<u8>; 5],
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            probes: [Some(0), Some(1), Some(2), Some(3), None],
        }
    }
}

impl ChannelMap {
    /// A map with no line bound.
    pub const fn unassigned() -> Self {
        Self { probes: [None; 5] }
    }

    /// Bind `signal` to `probe` (or unbind it with `None`).
    #[must_use]
    #[allow(clippy::indexing_slicing)] // slot() < 5
    pub fn with(mut self, signal: Signal, probe: Option<u8>) -> Self {
        self.probes[signal.slot()] = probe;
        self
    }

    /// Probe bound to `signal`.
    #[allow(clippy::indexing_slicing)] // slot() < 5
    pub const fn probe(&self, signal: Signal) -> Option<u8> {
        self.probes[signal.slot()]
    }

    /// Validate the map.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingLine`] when a mandatory line is unbound
    /// - [`ConfigError::ProbeOutOfRange`] when a probe index is not 0..8
    /// - [`ConfigError::DuplicateProbe`] when two lines share a probe
    pub fn resolve(&self) -> Result<ChannelAssignment, ConfigError> {
        if let Some(missing) = Signal::REQUIRED
            .into_iter()
            .find(|s| self.probe(*s).is_none())
        {
            return Err(ConfigError::MissingLine(missing));
        }

        let mut owner: [Option<Signal>; PROBE_COUNT as usize] = [None; PROBE_COUNT as usize];
        for signal in Signal::ALL {
            let Some(probe) = self.probe(signal) else {
                continue;
            };
            let Some(slot) = owner.get_mut(usize::from(probe)) else {
                return Err(ConfigError::ProbeOutOfRange {
                    line: signal,
                    probe,
                });
            };
            if let Some(first) = *slot {
                return Err(ConfigError::DuplicateProbe {
                    probe,
                    first,
                    second: signal,
                });
            }
            *slot = Some(signal);
        }

        Ok(ChannelAssignment { probes: self.probes })
    }
}

// ── ChannelAssignment ────────────────────────────────────────────────────────

/// A validated [`ChannelMap`]: all mandatory lines bound to distinct probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelAssignment {
    probes: [Option<u8>; 5],
}

impl ChannelAssignment {
    /// Probe bound to `signal`.
    #[allow(clippy::indexing_slicing)] // slot() < 5
    pub const fn probe(&self, signal: Signal) -> Option<u8> {
        self.probes[signal.slot()]
    }

    /// The set of bound lines.
    pub fn bound_lines(&self) -> LineSet {
        Signal::ALL
            .into_iter()
            .filter(|s| self.probe(*s).is_some())
            .fold(LineSet::EMPTY, LineSet::with)
    }

    /// Unpack the line levels from one packed sample.
    pub fn levels(&self, sample: u8) -> LineLevels {
        let bit = |signal: Signal| {
            self.probe(signal)
                .map(|probe| sample.checked_shr(u32::from(probe)).unwrap_or(0) & 1 != 0)
        };
        LineLevels {
            data_out: bit(Signal::DataOut).unwrap_or(false),
            data_in: bit(Signal::DataIn).unwrap_or(false),
            bit_clk: bit(Signal::BitClk).unwrap_or(false),
            sync: bit(Signal::Sync).unwrap_or(false),
            reset: bit(Signal::Reset),
        }
    }
}
