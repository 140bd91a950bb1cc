use serde::{Deserialize, Serialize};
use std::fmt;

/// Occurrence bounds of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    /// `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn exactly_one() -> Self {
        Self::new(1, Some(1))
    }

    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    pub fn unbounded(min: u32) -> Self {
        Self::new(min, None)
    }

    /// Check if more than one occurrence is allowed
    pub fn is_list(&self) -> bool {
        self.max.is_none_or(|max| max > 1)
    }

    pub fn is_zeroed_out(&self) -> bool {
        self.max == Some(0)
    }

    pub fn is_exactly_one(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Intersect two cardinalities, keeping the larger minimum and the
    /// smaller maximum. Returns `None` when the result would be empty.
    pub fn narrow(&self, other: &Cardinality) -> Option<Cardinality> {
        let min = self.min.max(other.min);
        let max = tighter_max(self.max, other.max);
        match max {
            Some(max) if min > max => None,
            _ => Some(Cardinality::new(min, max)),
        }
    }
}

/// The smaller of two optional maxima, where `None` is unbounded.
pub fn tighter_max(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(bound), None) | (None, Some(bound)) => Some(bound),
        (None, None) => None,
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}
