//! BactID identification engine
//!
//! Ranks bacterial genera against a partial set of laboratory observations:
//!
//! 1. **Comparator** ([`compare`]) — deterministic field-by-field scoring
//!    against the reference table, with hard morphological exclusions.
//! 2. **Extended reasoner** ([`reasoner`]) — Laplace-smoothed categorical
//!    likelihood fusion over the learned signals catalog, softmax-normalized.
//! 3. **Blender + narrative** ([`candidate`], [`narrative`]) — core/true/
//!    blended confidence percentages and a human-readable explanation.
//! 4. **Orchestrator** ([`identify`]) — runs the comparator across all
//!    genera, folds in extended likelihoods, suggests discriminating next
//!    tests, and returns the ranked candidates.
//!
//! The engine is synchronous and pure compute: all I/O (reference table,
//! learned artifacts) happens in `bactid-store` before construction.

pub mod candidate;
pub mod compare;
pub mod identify;
pub mod narrative;
pub mod reasoner;

pub use candidate::{BlendWeights, Candidate};
pub use compare::{compare_field, FieldComparison, HARD_EXCLUSION_FIELDS};
pub use identify::{EngineConfig, Identifier};
pub use reasoner::{score_extended, ExtendedScores};
