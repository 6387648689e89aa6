//! Per-genus identification results and confidence blending.

use std::collections::BTreeMap;

use serde::Serialize;

/// Relative weight of core (rule-based) confidence vs extended likelihood in
/// the blended figure. Empirical defaults, surfaced as configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendWeights {
    pub core: f64,
    pub ext: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self { core: 0.7, ext: 0.3 }
    }
}

/// One genus's result for a single identification request. Created per
/// request and discarded with the response.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub genus: String,
    /// Net matches minus mismatches over the scored fields.
    pub total_score: i32,
    pub matched_fields: Vec<String>,
    pub mismatched_fields: Vec<String>,
    /// Observed values that argued for this genus, keyed by field.
    pub reasoning_factors: BTreeMap<String, String>,
    /// Fields the user actually entered a result for.
    pub fields_evaluated: usize,
    /// All non-identifier fields in the reference table.
    pub fields_possible: usize,
    pub extra_notes: String,
    /// Normalized probability from the extended reasoner; `None` means no
    /// extended evidence for this genus, which is distinct from zero.
    pub extended_likelihood: Option<f64>,
    pub extended_explanation: String,
    /// Suggested discriminating tests (attached to the leading candidates).
    pub next_tests: Vec<String>,
    pub narrative: String,
}

impl Candidate {
    pub fn new(genus: &str, fields_possible: usize) -> Self {
        Self {
            genus: genus.to_string(),
            total_score: 0,
            matched_fields: Vec::new(),
            mismatched_fields: Vec::new(),
            reasoning_factors: BTreeMap::new(),
            fields_evaluated: 0,
            fields_possible,
            extra_notes: String::new(),
            extended_likelihood: None,
            extended_explanation: String::new(),
            next_tests: Vec::new(),
            narrative: String::new(),
        }
    }

    /// Confidence over the tests the user actually entered, as a percentage.
    pub fn core_percent(&self) -> u8 {
        percent(self.total_score, self.fields_evaluated)
    }

    /// Confidence over every field the reference table could score.
    pub fn true_percent(&self) -> u8 {
        percent(self.total_score, self.fields_possible)
    }

    /// Blended confidence in [0, 1]: weighted mix of core confidence and the
    /// extended likelihood when one is attached, core alone otherwise.
    pub fn blended_raw(&self, weights: BlendWeights) -> f64 {
        let core = f64::from(self.core_percent()) / 100.0;
        match self.extended_likelihood {
            Some(ext) => weights.core * core + weights.ext * ext,
            None => core,
        }
    }

    pub fn blended_percent(&self, weights: BlendWeights) -> u8 {
        (self.blended_raw(weights) * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

fn percent(score: i32, denominator: usize) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let pct = (f64::from(score) / denominator as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
