//! Frame boundary detection on SYNC.
//!
//! SYNC is sampled at every rising BIT_CLK edge. The controller raises it one
//! bit time ahead of the frame, so a low → high step between two consecutive
//! rising edges means the frame began at the earlier of the two.

/// Two-entry SYNC lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncDetector {
    history: [bool; 2],
    primed: bool,
}

impl SyncDetector {
    /// A detector with no history; it cannot fire until primed.
    pub const fn new() -> Self {
        Self {
            history: [false, false],
            primed: false,
        }
    }

    /// Seed the lookback with SYNC at the first rising edge.
    ///
    /// A capture that opens with SYNC already high misses that frame: there
    /// is no earlier edge to compare against.
    pub fn prime(&mut self, level: bool) {
        self.history = [false, level];
        self.primed = true;
    }

    /// Whether the detector has seen its first rising edge.
    pub const fn is_primed(&self) -> bool {
        self.primed
    }

    /// SYNC level at the most recent rising edge.
    pub const fn level(&self) -> bool {
        self.history[1]
    }

    /// Shift in SYNC at the next rising edge. Returns `true` on a 0 → 1 step.
    ///
    /// An unprimed detector primes itself with `level` and never fires.
    pub fn observe(&mut self, level: bool) -> bool {
        if !self.primed {
            self.prime(level);
            return false;
        }
        let [_, previous] = self.history;
        self.history = [previous, level];
        !previous && level
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
