//! BactID canonical schema
//!
//! The canonical laboratory-test schema shared by the identification engine,
//! the learned-artifact store, and the training loop:
//!
//! - field kinds (`enum` / `multienum` / `range` / `text`) and the built-in
//!   core field table,
//! - value normalization (spelling variants onto canonical labels),
//! - record validation against allowed enumerations,
//! - observation sets (field → value maps with an `Unknown` sentinel),
//! - inclusive temperature ranges (`low..high`).
//!
//! Everything here is process-immutable: the core schema is fixed for the
//! lifetime of the process, and extended (learned) fields live in
//! `bactid-store`, not here.

pub mod core;
pub mod observation;
pub mod range;

pub use crate::core::{
    empty_record, normalize_value, validate_record, CoreSchema, FieldKind, FieldMeta,
    ValidationIssue, IDENTIFIER_FIELDS, POS_NEG_VAR,
};
pub use observation::{CategoricalValue, ObservationSet};
pub use range::TempRange;

use thiserror::Error;

/// Sentinel for "no result entered" — allowed for every non-identifier field.
pub const UNKNOWN: &str = "Unknown";

/// Separator used by multi-value fields in stored data and UI strings.
pub const MULTI_SEPARATOR: char = ';';

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {field}: value '{value}' not in allowed set {allowed:?}")]
    DisallowedValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}
