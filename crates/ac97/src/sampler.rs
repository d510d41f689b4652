//! Edge sampler abstraction.
//!
//! The decoder never walks samples itself. It asks an [`EdgeSampler`] for
//! the next sample at which a clock condition holds and receives the levels
//! of every bound line at that instant. This is the only suspension point of
//! the decode loop; `None` ends the stream.

use crate::lines::{LineLevels, LineSet, Signal};

/// Level or transition required on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Low → high transition.
    Rising,
    /// High → low transition.
    Falling,
    /// Any transition.
    Either,
    /// Line is high.
    High,
    /// Line is low.
    Low,
}

impl Edge {
    /// Whether the pair `previous → current` satisfies this condition.
    pub const fn matches(self, previous: bool, current: bool) -> bool {
        match self {
            Edge::Rising => !previous && current,
            Edge::Falling => previous && !current,
            Edge::Either => previous != current,
            Edge::High => current,
            Edge::Low => !current,
        }
    }
}

/// One wait condition: `line` must show `edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Condition {
    /// Observed line.
    pub line: Signal,
    /// Required level or transition.
    pub edge: Edge,
}

impl Condition {
    /// Rising BIT_CLK edge.
    pub const BIT_CLK_RISING: Condition = Condition::new(Signal::BitClk, Edge::Rising);

    /// Falling BIT_CLK edge.
    pub const BIT_CLK_FALLING: Condition = Condition::new(Signal::BitClk, Edge::Falling);

    /// Build a condition.
    pub const fn new(line: Signal, edge: Edge) -> Self {
        Self { line, edge }
    }
}

/// A sample at which a wait was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeSample {
    /// Sample number within the stream.
    pub position: u64,
    /// Levels of all bound lines at `position`.
    pub levels: LineLevels,
}

/// Whether every condition holds for the step `previous → current`.
///
/// A condition on an unbound line never holds.
pub fn conditions_hold(conditions: &[Condition], previous: &LineLevels, current: &LineLevels) -> bool {
    conditions
        .iter()
        .all(|cond| match (previous.level(cond.line), current.level(cond.line)) {
            (Some(prev), Some(cur)) => cond.edge.matches(prev, cur),
            _ => false,
        })
}

/// Source of clock-edge-aligned samples.
pub trait EdgeSampler {
    /// Lines the host bound for this stream.
    fn bound_lines(&self) -> LineSet;

    /// Block until every condition in `conditions` holds at the same sample.
    ///
    /// Returns `None` once the stream is exhausted. An empty condition list
    /// matches the next sample.
    fn wait_for(&mut self, conditions: &[Condition]) -> Option<EdgeSample>;
}

impl<S: EdgeSampler + ?Sized> EdgeSampler for &mut S {
    fn bound_lines(&self) -> LineSet {
        (**self).bound_lines()
    }

    fn wait_for(&mut self, conditions: &[Condition]) -> Option<EdgeSample> {
        (**self).wait_for(conditions)
    }
}
