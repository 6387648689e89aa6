//! BactID storage layer
//!
//! Two very different kinds of state live on disk:
//!
//! - the **reference table** (`reference.json`): one profile per genus,
//!   immutable at runtime, reloaded only when the backing file's modification
//!   time changes;
//! - the **learned artifacts** (`extended_schema.json`, `alias_maps.json`,
//!   `signals_catalog.json`): mutable, written only by the training pass.
//!
//! Learned-artifact writes go through [`ArtifactRepository::replace`], which
//! writes to a temp file and renames into place so identification requests
//! never observe a half-written document. [`TrainingLock`] serializes
//! concurrent training invocations with an advisory file lock.
//!
//! A missing reference table is fatal; missing or malformed learned artifacts
//! fall back to empty defaults so the engine can run in core-only mode.

pub mod artifacts;
pub mod proposals;
pub mod reference;

pub use artifacts::{
    AliasMap, ArtifactRepository, ExtendedField, ExtendedSchemaRegistry, FieldStatus,
    LearnedArtifacts, SignalCounts, SignalsCatalog, TrainingLock,
};
pub use proposals::{Proposal, ProposalKind, ProposalSink};
pub use reference::{ReferenceProfile, ReferenceStore};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reference table not found at {0}")]
    ReferenceMissing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("training lock at {0} is held by another process")]
    LockHeld(PathBuf),
}
