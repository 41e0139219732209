//! Core data type for the edge stream

use std::fmt;

/// Direction of a level transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeDirection {
    /// High to low.
    Falling,
    /// Low to high.
    Rising,
}

/// A level transition on the monitored data line.
///
/// The edge stream is run-length encoded: an `Edge` is produced only when the
/// signal changes level, and `value` is the level *after* the transition. The
/// level holds until the next edge's `sample`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Line level after the transition (false = low, true = high)
    pub value: bool,
    /// Sample index at which the transition occurred
    pub sample: u64,
}

impl Edge {
    /// Create a new edge
    pub fn new(value: bool, sample: u64) -> Self {
        Self { value, sample }
    }

    /// A high-to-low transition at the given sample index
    pub fn falling(sample: u64) -> Self {
        Self::new(false, sample)
    }

    /// A low-to-high transition at the given sample index
    pub fn rising(sample: u64) -> Self {
        Self::new(true, sample)
    }

    /// Direction of this transition
    pub fn direction(&self) -> EdgeDirection {
        if self.value {
            EdgeDirection::Rising
        } else {
            EdgeDirection::Falling
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dir = match self.direction() {
            EdgeDirection::Falling => "falling",
            EdgeDirection::Rising => "rising",
        };
        write!(f, "Edge[{} @ {}]", dir, self.sample)
    }
}
