//! Inclusive numeric ranges for growth temperature (`low..high`, °C).

use serde::{Deserialize, Serialize};

/// An inclusive `low..high` temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub low: f64,
    pub high: f64,
}

impl TempRange {
    /// Parse `"low..high"`; whitespace is tolerated. Returns `None` for
    /// anything malformed — comparator semantics treat that as a skip, never
    /// an error.
    pub fn parse(text: &str) -> Option<TempRange> {
        let text = text.replace(' ', "");
        let (low, high) = text.split_once("..")?;
        Some(TempRange {
            low: low.parse().ok()?,
            high: high.parse().ok()?,
        })
    }

    pub fn contains(&self, reading: f64) -> bool {
        self.low <= reading && reading <= self.high
    }

    /// Range overlap, used when comparing an expected range against a
    /// predicted one during evaluation.
    pub fn overlaps(&self, other: &TempRange) -> bool {
        !(self.high < other.low || other.high < self.low)
    }
}
