//! Identification orchestrator: runs the comparator across every reference
//! profile, folds in extended likelihoods, and returns ranked candidates.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use bactid_schema::{CategoricalValue, CoreSchema, ObservationSet};
use bactid_store::{LearnedArtifacts, ReferenceStore};

use crate::candidate::{BlendWeights, Candidate};
use crate::compare::{compare_field, FieldComparison};
use crate::narrative::reasoning_paragraph;
use crate::reasoner::score_extended;

/// Fields never offered as next-test suggestions: identifiers, free-text
/// notes, and colony morphology (not a bench test).
const UNSUGGESTABLE_FIELDS: &[&str] = &["Extra Notes", "Colony Morphology"];

/// Engine tunables. The defaults reproduce the empirically chosen constants;
/// they are configuration rather than literals so deployments can adjust
/// them without touching scoring code.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub blend: BlendWeights,
    /// Laplace smoothing constant for the extended reasoner.
    pub alpha: f64,
    /// How many discriminating next tests to suggest.
    pub next_test_limit: usize,
    /// Ranked candidates returned per request.
    pub max_results: usize,
    /// Seed for the presentation-only RNG (phrase choice, suggestion order).
    pub narrative_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blend: BlendWeights::default(),
            alpha: 1.0,
            next_test_limit: 3,
            max_results: 10,
            narrative_seed: 0,
        }
    }
}

/// The identification engine: borrows the process-wide reference table and
/// the learned artifacts loaded at construction.
#[derive(Debug)]
pub struct Identifier<'a> {
    reference: &'a ReferenceStore,
    artifacts: &'a LearnedArtifacts,
    config: EngineConfig,
}

impl<'a> Identifier<'a> {
    pub fn new(reference: &'a ReferenceStore, artifacts: &'a LearnedArtifacts) -> Self {
        Self::with_config(reference, artifacts, EngineConfig::default())
    }

    pub fn with_config(
        reference: &'a ReferenceStore,
        artifacts: &'a LearnedArtifacts,
        config: EngineConfig,
    ) -> Self {
        Self {
            reference,
            artifacts,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score the observation set against every genus and return at most
    /// `max_results` ranked candidates.
    pub fn identify(&self, observations: &ObservationSet) -> Vec<Candidate> {
        let scored_fields: Vec<&str> = CoreSchema::field_names()
            .filter(|f| !CoreSchema::is_identifier(f))
            .collect();
        let fields_possible = scored_fields.len();

        let mut results: Vec<Candidate> = Vec::new();
        'genera: for (genus, profile) in self.reference.profiles() {
            let mut candidate = Candidate::new(genus, fields_possible);

            for &field in &scored_fields {
                let db_val = profile.get(field);
                let user_val = observations.get(field);
                if observations.is_known(field) {
                    candidate.fields_evaluated += 1;
                }

                match compare_field(db_val, user_val, field) {
                    FieldComparison::Skip => {}
                    FieldComparison::Match => {
                        candidate.total_score += 1;
                        candidate.matched_fields.push(field.to_string());
                        candidate
                            .reasoning_factors
                            .insert(field.to_string(), user_val.to_string());
                    }
                    FieldComparison::Mismatch => {
                        candidate.total_score -= 1;
                        candidate.mismatched_fields.push(field.to_string());
                    }
                    FieldComparison::HardExclusion => {
                        // One morphological contradiction eliminates the
                        // genus regardless of other agreement.
                        tracing::debug!(genus, field, "hard exclusion");
                        continue 'genera;
                    }
                }
            }

            candidate.extra_notes = profile.get("Extra Notes").to_string();
            results.push(candidate);
        }

        if results.is_empty() {
            return results;
        }

        // Rank by raw score first; suggestions are derived from the current
        // top three.
        results.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        let mut rng = StdRng::seed_from_u64(self.config.narrative_seed);
        let suggestions = self.suggest_next_tests(&results, &mut rng);
        for candidate in results.iter_mut().take(3) {
            candidate.next_tests = suggestions.clone();
        }

        // Extended evidence, when the request carries any registered
        // extended tests and the catalog has signals.
        let extended_input = self.extract_extended(observations);
        if !extended_input.is_empty() {
            let scores =
                score_extended(&self.artifacts.signals, &extended_input, self.config.alpha);
            if !scores.ranked.is_empty() {
                for candidate in &mut results {
                    // A genus absent from the reasoner output has no
                    // extended evidence, which is not the same as zero.
                    candidate.extended_likelihood = scores.probability(&candidate.genus);
                    candidate.extended_explanation = scores.explanation.clone();
                }
            }
        }

        if results.iter().any(|c| c.extended_likelihood.is_some()) {
            let weights = self.config.blend;
            results.sort_by(|a, b| {
                b.blended_raw(weights)
                    .partial_cmp(&a.blended_raw(weights))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        results.truncate(self.config.max_results);

        // Narratives come last so they can reference the final ranking.
        let ranking = results.clone();
        for candidate in &mut results {
            candidate.narrative = reasoning_paragraph(candidate, &ranking, &mut rng);
        }
        results
    }

    /// The observation subset belonging to registered extended fields, kept
    /// only where the value is a usable Positive/Negative/Variable.
    fn extract_extended(&self, observations: &ObservationSet) -> BTreeMap<String, CategoricalValue> {
        self.artifacts
            .registry
            .field_names()
            .filter_map(|field| {
                CategoricalValue::from_str(observations.get(field))
                    .ok()
                    .map(|value| (field.to_string(), value))
            })
            .collect()
    }

    /// Tests most likely to discriminate between the leading candidates:
    /// fields whose matched/mismatched status differs across the top three,
    /// shuffled and truncated.
    fn suggest_next_tests<R: Rng>(&self, ranked: &[Candidate], rng: &mut R) -> Vec<String> {
        if ranked.len() < 2 {
            return Vec::new();
        }
        let top: Vec<&Candidate> = ranked.iter().take(3).collect();

        let mut varying: Vec<String> = CoreSchema::field_names()
            .filter(|f| !CoreSchema::is_identifier(f) && !UNSUGGESTABLE_FIELDS.contains(f))
            .filter(|field| {
                let statuses: BTreeSet<i8> = top
                    .iter()
                    .map(|c| {
                        if c.matched_fields.iter().any(|m| m == field) {
                            1
                        } else if c.mismatched_fields.iter().any(|m| m == field) {
                            -1
                        } else {
                            0
                        }
                    })
                    .collect();
                statuses.len() > 1
            })
            .map(str::to_string)
            .collect();

        varying.shuffle(rng);
        varying.truncate(self.config.next_test_limit);
        varying
    }
}
