//! Training pass: fold accumulated proposals and gold expectations into the
//! learned knowledge base.
//!
//! Schema and alias merges are idempotent; re-running over the same inputs
//! adds nothing. Evidence counting is not: each run increments the
//! signals catalog again, so callers that re-train over an unchanged corpus
//! should clear the proposal log (and accept growing counts) or deduplicate
//! upstream. Whether counts should be deduplicated by case id is an open
//! product question.

use std::str::FromStr;

use serde::Serialize;

use bactid_schema::{CategoricalValue, CoreSchema};
use bactid_store::{ArtifactRepository, ProposalKind, ProposalSink};

use crate::corpus::LabeledCase;
use crate::TrainingError;

/// What one training run changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingSummary {
    /// Extended fields registered for the first time.
    pub new_fields: Vec<String>,
    pub aliases_added: usize,
    pub proposals_scanned: usize,
    pub evidence_recorded: usize,
}

/// Runs the training pass against one artifact repository, holding its
/// exclusive training lock for the duration.
#[derive(Debug)]
pub struct Trainer<'a> {
    repository: &'a ArtifactRepository,
}

impl<'a> Trainer<'a> {
    pub fn new(repository: &'a ArtifactRepository) -> Self {
        Self { repository }
    }

    /// Consume the proposal log and the corpus's expected values, then
    /// replace the learned artifacts atomically.
    pub fn train(
        &self,
        corpus: &[LabeledCase],
        sink: &ProposalSink,
    ) -> Result<TrainingSummary, TrainingError> {
        let _lock = self.repository.lock_training()?;
        let mut artifacts = self.repository.load();
        let mut summary = TrainingSummary::default();

        // 1) Discover new extended fields from the proposal log.
        for proposal in sink.read_all()? {
            summary.proposals_scanned += 1;
            match proposal.kind {
                ProposalKind::UnknownField | ProposalKind::ExpectedFieldNotInSchema => {
                    let canonical = artifacts.aliases.canonical_field(&proposal.field);
                    if canonical.is_empty() || CoreSchema::contains(&canonical) {
                        continue;
                    }
                    if artifacts.registry.register(&canonical) {
                        summary.new_fields.push(canonical.clone());
                    }
                    if proposal.field != canonical {
                        artifacts.registry.add_alias(&canonical, &proposal.field);
                        if artifacts
                            .aliases
                            .merge_field_alias(&proposal.field, &canonical)
                        {
                            summary.aliases_added += 1;
                        }
                    }
                }
                // Unknown enum values on core fields are owned by the core
                // schema, not the learned registry.
                ProposalKind::UnknownValue => {}
            }
        }

        // 2) Aggregate evidence for extended fields from expected values.
        for case in corpus {
            let Some(genus) = case.genus_key() else {
                tracing::warn!(case = %case.name, "skipping case without a genus key");
                continue;
            };
            for (field, value) in &case.expected {
                let canonical = artifacts.aliases.canonical_field(field);
                if CoreSchema::contains(&canonical) {
                    continue;
                }
                // Expected extended fields count as schema evidence even
                // when no proposal was logged for them.
                if artifacts.registry.register(&canonical) {
                    summary.new_fields.push(canonical.clone());
                }
                if field != &canonical {
                    artifacts.registry.add_alias(&canonical, field);
                }

                let value = artifacts.aliases.canonical_value(value);
                if let Ok(categorical) = CategoricalValue::from_str(&value) {
                    artifacts.signals.record(&genus, &canonical, categorical);
                    summary.evidence_recorded += 1;
                }
            }
        }

        summary.new_fields.sort();
        summary.new_fields.dedup();
        self.repository.replace(&artifacts)?;
        tracing::info!(
            new_fields = summary.new_fields.len(),
            aliases = summary.aliases_added,
            evidence = summary.evidence_recorded,
            "training pass complete"
        );
        Ok(summary)
    }
}
