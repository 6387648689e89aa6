//! Evaluation pass: run the parsing collaborator over every labeled case,
//! normalize its predictions against the canonical schema, log unexplained
//! observations as proposals, and measure per-field accuracy and coverage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bactid_schema::{normalize_value, CoreSchema, FieldKind, TempRange, UNKNOWN};
use bactid_store::{Proposal, ProposalKind, ProposalSink};

use crate::corpus::{validate_corpus, CaseIssue, LabeledCase};
use crate::parser::TextParser;
use crate::TrainingError;

/// Accuracy/coverage for one expected field across the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMetric {
    pub field: String,
    /// Fraction of cases where the prediction agreed with the expectation.
    pub accuracy: f64,
    /// Fraction of cases where the parser produced a non-Unknown value.
    pub coverage: f64,
    pub n: usize,
}

/// Summary of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub num_cases: usize,
    pub cases_skipped: usize,
    /// Total correct fields over total expected fields, across all cases.
    pub micro_accuracy: f64,
    pub cases_with_misses: usize,
    pub per_field: Vec<FieldMetric>,
    pub unknown_fields: BTreeMap<String, usize>,
    pub unknown_values: BTreeMap<String, usize>,
    pub expected_unknown_fields: BTreeMap<String, usize>,
    /// Up-front corpus defects; these cases were skipped, not fatal.
    pub case_issues: Vec<CaseIssue>,
}

#[derive(Default)]
struct FieldTally {
    total: usize,
    correct: usize,
    covered: usize,
}

/// Run the evaluation pass. Corpus defects are reported per case and the
/// batch continues; only store-level failures (proposal log I/O) abort.
pub fn evaluate(
    corpus: &[LabeledCase],
    parser: &dyn TextParser,
    sink: &ProposalSink,
    mode: &str,
) -> Result<EvaluationReport, TrainingError> {
    let case_issues = validate_corpus(corpus);
    let skip: Vec<&str> = case_issues.iter().map(|i| i.case.as_str()).collect();

    let mut tallies: BTreeMap<String, FieldTally> = BTreeMap::new();
    let mut unknown_fields: BTreeMap<String, usize> = BTreeMap::new();
    let mut unknown_values: BTreeMap<String, usize> = BTreeMap::new();
    let mut expected_unknowns: BTreeMap<String, usize> = BTreeMap::new();
    let mut cases_with_misses = 0;
    let mut cases_skipped = 0;

    for case in corpus {
        if skip.contains(&case.name.as_str()) {
            cases_skipped += 1;
            continue;
        }

        let predicted_raw = match &case.observations {
            Some(observations) => observations.clone(),
            None => {
                let text = case.input.as_deref().unwrap_or_default();
                parser.parse(text).fields
            }
        };

        // Normalize predictions; unexplained fields and values become
        // proposals rather than errors.
        let mut predicted: BTreeMap<String, String> = BTreeMap::new();
        for (field, value) in &predicted_raw {
            if !CoreSchema::contains(field) {
                *unknown_fields.entry(field.clone()).or_default() += 1;
                sink.append(
                    &Proposal::new(ProposalKind::UnknownField, field, &case.name)
                        .with_value(value),
                )?;
                continue;
            }
            let normalized = normalize_value(field, value);
            if let Some(meta) = CoreSchema::field(field) {
                if let FieldKind::Enum { allowed } = meta.kind {
                    if normalized != UNKNOWN && !allowed.contains(&normalized.as_str()) {
                        *unknown_values
                            .entry(format!("{field}::{normalized}"))
                            .or_default() += 1;
                        sink.append(
                            &Proposal::new(ProposalKind::UnknownValue, field, &case.name)
                                .with_value(&normalized)
                                .with_allowed(allowed),
                        )?;
                    }
                }
            }
            predicted.insert(field.clone(), normalized);
        }

        // Audit expected fields the schema does not know.
        for field in case.expected.keys() {
            if !CoreSchema::contains(field) {
                *expected_unknowns.entry(field.clone()).or_default() += 1;
                sink.append(&Proposal::new(
                    ProposalKind::ExpectedFieldNotInSchema,
                    field,
                    &case.name,
                ))?;
            }
        }

        let mut case_missed = false;
        for (field, expected_value) in &case.expected {
            let tally = tallies.entry(field.clone()).or_default();
            tally.total += 1;

            let prediction = predicted.get(field).map(String::as_str).unwrap_or(UNKNOWN);
            if prediction != UNKNOWN {
                tally.covered += 1;
            }
            if values_agree(field, prediction, expected_value) {
                tally.correct += 1;
            } else {
                case_missed = true;
            }
        }
        if case_missed {
            cases_with_misses += 1;
        }
    }

    let total: usize = tallies.values().map(|t| t.total).sum();
    let correct: usize = tallies.values().map(|t| t.correct).sum();
    let micro_accuracy = if total > 0 {
        correct as f64 / total as f64
    } else {
        0.0
    };

    let per_field = tallies
        .into_iter()
        .map(|(field, t)| FieldMetric {
            field,
            accuracy: t.correct as f64 / t.total as f64,
            coverage: t.covered as f64 / t.total as f64,
            n: t.total,
        })
        .collect();

    Ok(EvaluationReport {
        mode: mode.to_string(),
        timestamp: Utc::now(),
        num_cases: corpus.len(),
        cases_skipped,
        micro_accuracy,
        cases_with_misses,
        per_field,
        unknown_fields,
        unknown_values,
        expected_unknown_fields: expected_unknowns,
        case_issues,
    })
}

/// Growth temperature compares by range overlap; everything else by string
/// equality after normalization.
fn values_agree(field: &str, predicted: &str, expected: &str) -> bool {
    if field == "Growth Temperature" && predicted != UNKNOWN && expected != UNKNOWN {
        if let (Some(p), Some(e)) = (TempRange::parse(predicted), TempRange::parse(expected)) {
            return p.overlaps(&e);
        }
    }
    predicted == expected
}

/// Write the report as pretty JSON under `reports_dir`, named by mode and
/// timestamp.
pub fn write_report(report: &EvaluationReport, reports_dir: &Path) -> Result<PathBuf, TrainingError> {
    fs::create_dir_all(reports_dir).map_err(|source| TrainingError::Io {
        path: reports_dir.to_path_buf(),
        source,
    })?;
    let name = format!(
        "gold_report_{}_{}.json",
        report.mode,
        report.timestamp.format("%Y%m%d_%H%M%S")
    );
    let path = reports_dir.join(name);
    let text = serde_json::to_string_pretty(report).map_err(|source| TrainingError::Corpus {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, text).map_err(|source| TrainingError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
