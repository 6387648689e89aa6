//! Proposal log: append-only JSONL of observations the current schema or
//! catalog cannot explain. Written during evaluation, consumed by the
//! training pass.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// The parser produced a field the core schema does not know.
    UnknownField,
    /// A known enum field carried a value outside its allowed set.
    UnknownValue,
    /// A labeled case expects a field absent from the core schema.
    ExpectedFieldNotInSchema,
}

/// One unexplained observation awaiting a knowledge-base update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    #[serde(rename = "type")]
    pub kind: ProposalKind,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    pub case_name: String,
    pub timestamp: DateTime<Utc>,
}

impl Proposal {
    pub fn new(kind: ProposalKind, field: &str, case_name: &str) -> Self {
        Self {
            kind,
            field: field.to_string(),
            value: None,
            allowed: None,
            case_name: case_name.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = Some(allowed.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// Append-only writer (and reader) for the proposal log.
#[derive(Debug, Clone)]
pub struct ProposalSink {
    path: PathBuf,
}

impl ProposalSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let map_io = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let mut file = fs::File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(map_io)?;
        let line = serde_json::to_string(proposal).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        writeln!(file, "{line}").map_err(map_io)?;
        Ok(())
    }

    /// Read back every parseable proposal; blank and corrupt lines are
    /// skipped rather than failing the batch.
    pub fn read_all(&self) -> Result<Vec<Proposal>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut proposals = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(proposal) => proposals.push(proposal),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping corrupt proposal line");
                }
            }
        }
        Ok(proposals)
    }

    /// Clear the log, typically after a training pass has consumed it.
    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ProposalSink::new(&dir.path().join("extended_proposals.jsonl"));

        sink.append(
            &Proposal::new(ProposalKind::UnknownField, "Bile Esculin", "Enterococcus case 1")
                .with_value("Positive"),
        )
        .unwrap();
        sink.append(&Proposal::new(
            ProposalKind::ExpectedFieldNotInSchema,
            "CAMP Test",
            "Streptococcus case 4",
        ))
        .unwrap();

        let read = sink.read_all().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].kind, ProposalKind::UnknownField);
        assert_eq!(read[0].value.as_deref(), Some("Positive"));
        assert_eq!(read[1].field, "CAMP Test");
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.jsonl");
        let sink = ProposalSink::new(&path);
        sink.append(&Proposal::new(ProposalKind::UnknownValue, "Catalase", "c1"))
            .unwrap();
        let mut f = fs::File::options().append(true).open(&path).unwrap();
        writeln!(f, "{{ broken").unwrap();
        writeln!(f).unwrap();

        assert_eq!(sink.read_all().unwrap().len(), 1);
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ProposalSink::new(&dir.path().join("none.jsonl"));
        assert!(sink.read_all().unwrap().is_empty());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let p = Proposal::new(ProposalKind::ExpectedFieldNotInSchema, "X", "c");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "expected_field_not_in_schema");
    }
}
