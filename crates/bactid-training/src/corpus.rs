//! Labeled-case corpus: fixtures with known-correct expected values, used by
//! both the evaluation and training passes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TrainingError;

/// One gold fixture: free text to parse (or pre-parsed observations) plus
/// the expected field → value map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledCase {
    pub name: String,
    /// Explicit genus label. Preferred over deriving the genus from the
    /// display name, which is a legacy heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    /// Free-text input for a parsing collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Pre-parsed observations, when the corpus carries them directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<BTreeMap<String, String>>,
    pub expected: BTreeMap<String, String>,
}

impl LabeledCase {
    /// The genus this case's evidence belongs to: the explicit label when
    /// present, otherwise the first token of the display name (legacy
    /// corpora; logged because the heuristic is fragile).
    pub fn genus_key(&self) -> Option<String> {
        if let Some(genus) = &self.genus {
            let genus = genus.trim();
            if !genus.is_empty() {
                return Some(genus.to_string());
            }
        }
        let derived = self.name.split_whitespace().next()?.to_string();
        tracing::warn!(
            case = %self.name,
            genus = %derived,
            "deriving genus from case name; prefer an explicit genus label"
        );
        Some(derived)
    }
}

/// A per-case validation finding. Invalid cases are reported and skipped,
/// never allowed to abort the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseIssue {
    pub case: String,
    pub message: String,
}

/// Load an ordered corpus from a JSON array.
pub fn load_corpus(path: &Path) -> Result<Vec<LabeledCase>, TrainingError> {
    let text = fs::read_to_string(path).map_err(|source| TrainingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| TrainingError::Corpus {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate the corpus up front. Returns one issue per defect; cases named
/// here are skipped by the evaluation and training passes.
pub fn validate_corpus(corpus: &[LabeledCase]) -> Vec<CaseIssue> {
    let mut issues = Vec::new();
    for (index, case) in corpus.iter().enumerate() {
        let label = if case.name.trim().is_empty() {
            issues.push(CaseIssue {
                case: format!("#{index}"),
                message: "case has no name".to_string(),
            });
            format!("#{index}")
        } else {
            case.name.clone()
        };

        if case.input.is_none() && case.observations.is_none() {
            issues.push(CaseIssue {
                case: label.clone(),
                message: "case has neither input text nor observations".to_string(),
            });
        }
        if case.expected.is_empty() {
            issues.push(CaseIssue {
                case: label.clone(),
                message: "case has an empty expected map".to_string(),
            });
        }
        if case.genus_key().is_none() {
            issues.push(CaseIssue {
                case: label,
                message: "cannot determine a genus key".to_string(),
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(name: &str) -> LabeledCase {
        LabeledCase {
            name: name.to_string(),
            genus: None,
            input: Some("catalase positive".to_string()),
            observations: None,
            expected: BTreeMap::from([("Catalase".to_string(), "Positive".to_string())]),
        }
    }

    #[test]
    fn explicit_genus_wins_over_name_heuristic() {
        let mut c = case("Staphylococcus aureus wound isolate");
        assert_eq!(c.genus_key().as_deref(), Some("Staphylococcus"));
        c.genus = Some("Micrococcus".to_string());
        assert_eq!(c.genus_key().as_deref(), Some("Micrococcus"));
    }

    #[test]
    fn valid_corpus_has_no_issues() {
        assert!(validate_corpus(&[case("Bacillus case 1")]).is_empty());
    }

    #[test]
    fn defective_cases_are_reported_individually() {
        let mut no_source = case("Vibrio case");
        no_source.input = None;

        let mut no_expected = case("Listeria case");
        no_expected.expected.clear();

        let issues = validate_corpus(&[case("Fine case"), no_source, no_expected]);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].case, "Vibrio case");
        assert_eq!(issues[1].case, "Listeria case");
    }

    #[test]
    fn corpus_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.json");
        let corpus = vec![case("Salmonella case 1")];
        fs::write(&path, serde_json::to_string(&corpus).unwrap()).unwrap();
        assert_eq!(load_corpus(&path).unwrap(), corpus);
    }

    #[test]
    fn malformed_corpus_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gold.json");
        fs::write(&path, "[{ broken").unwrap();
        assert!(matches!(
            load_corpus(&path),
            Err(TrainingError::Corpus { .. })
        ));
    }
}
