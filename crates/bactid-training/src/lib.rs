//! BactID self-training loop
//!
//! Evaluates a labeled-case corpus against the canonical schema and evolves
//! the learned knowledge base the extended reasoner consumes:
//!
//! - [`corpus`] — labeled cases plus up-front validation with per-case
//!   diagnostics (one bad fixture never aborts a batch);
//! - [`parser`] — the text-extraction capability interface and the
//!   deterministic precedence-fusion combiner (extended > rules > model >
//!   Unknown); concrete parsers are external collaborators;
//! - [`evaluate`] — the evaluation pass: normalization, proposal emission,
//!   per-field accuracy/coverage and micro-average accuracy, JSON reports;
//! - [`train`] — the training pass: idempotent schema/alias merging plus
//!   evidence counting, run under the store's exclusive training lock.

pub mod corpus;
pub mod evaluate;
pub mod parser;
pub mod train;

pub use corpus::{load_corpus, validate_corpus, CaseIssue, LabeledCase};
pub use evaluate::{evaluate, write_report, EvaluationReport, FieldMetric};
pub use parser::{MappingParser, ParseOutcome, ParserSource, PrecedenceFusion, TextParser};
pub use train::{Trainer, TrainingSummary};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Store(#[from] bactid_store::StoreError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed corpus at {path}: {source}")]
    Corpus {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
