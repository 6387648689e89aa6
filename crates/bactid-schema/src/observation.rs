//! Observation sets: the caller-supplied field → value map for one
//! identification request. Supplied fresh per request, never persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::UNKNOWN;

/// One identification request's worth of entered test results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ObservationSet {
    fields: BTreeMap<String, String>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `field`, with absent fields reading as `Unknown`.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or(UNKNOWN)
    }

    pub fn set(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.to_string());
    }

    /// True when the user actually entered a result for `field`.
    pub fn is_known(&self, field: &str) -> bool {
        let v = self.get(field).trim();
        !v.is_empty() && !v.eq_ignore_ascii_case(UNKNOWN)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, String)> for ObservationSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for ObservationSet {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

/// A Positive/Negative/Variable test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoricalValue {
    Positive,
    Negative,
    Variable,
}

impl CategoricalValue {
    pub const ALL: [CategoricalValue; 3] = [
        CategoricalValue::Positive,
        CategoricalValue::Negative,
        CategoricalValue::Variable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalValue::Positive => "Positive",
            CategoricalValue::Negative => "Negative",
            CategoricalValue::Variable => "Variable",
        }
    }
}

impl FromStr for CategoricalValue {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "+" => Ok(CategoricalValue::Positive),
            "negative" | "neg" | "-" => Ok(CategoricalValue::Negative),
            "variable" | "var" | "v" => Ok(CategoricalValue::Variable),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CategoricalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
