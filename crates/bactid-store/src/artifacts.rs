//! Learned artifacts: the mutable knowledge the training loop evolves and
//! the extended reasoner reads back.
//!
//! Three JSON documents live under the data directory:
//!
//! - `extended_schema.json` — registry of learned (non-core) test fields;
//! - `alias_maps.json` — field-name and value spelling synonyms;
//! - `signals_catalog.json` — per-genus per-test categorical evidence counts.
//!
//! [`ArtifactRepository`] owns their load/replace lifecycle: loads fall back
//! to empty defaults when a file is missing or malformed (core-only mode),
//! and replacement is write-temp-then-rename so a reader never observes a
//! partially written document.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use bactid_schema::CategoricalValue;

use crate::StoreError;

// ============================================================================
// Extended schema registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Experimental,
    Stable,
}

/// Metadata for one learned test field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtendedField {
    pub value_type: String,
    pub status: FieldStatus,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ExtendedField {
    /// Default registration for a freshly discovered field: categorical,
    /// experimental until promoted.
    pub fn experimental() -> Self {
        Self {
            value_type: "enum_PNV".to_string(),
            status: FieldStatus::Experimental,
            aliases: Vec::new(),
        }
    }
}

/// Registry of extended (non-core) test fields known to the system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExtendedSchemaRegistry {
    fields: BTreeMap<String, ExtendedField>,
}

impl ExtendedSchemaRegistry {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&ExtendedField> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Register `canonical` if unseen; returns true when the field is new.
    /// Re-registering an existing field is a no-op, which keeps repeated
    /// training runs from duplicating entries.
    pub fn register(&mut self, canonical: &str) -> bool {
        if self.fields.contains_key(canonical) {
            return false;
        }
        self.fields
            .insert(canonical.to_string(), ExtendedField::experimental());
        true
    }

    /// Record an observed alias spelling for `canonical`, ignoring exact and
    /// duplicate spellings.
    pub fn add_alias(&mut self, canonical: &str, spelling: &str) {
        if spelling == canonical {
            return;
        }
        if let Some(field) = self.fields.get_mut(canonical) {
            if !field.aliases.iter().any(|a| a == spelling) {
                field.aliases.push(spelling.to_string());
            }
        }
    }
}

// ============================================================================
// Alias map
// ============================================================================

/// Field-name and value-spelling synonyms. Invariant: each alias resolves to
/// exactly one canonical name (the map key is the alias).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasMap {
    #[serde(default)]
    pub field_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub value_aliases: BTreeMap<String, String>,
}

impl AliasMap {
    /// Resolve a field name through the alias map (case-insensitive);
    /// unmapped names pass through trimmed.
    pub fn canonical_field(&self, name: &str) -> String {
        let n = name.trim();
        for (alias, canonical) in &self.field_aliases {
            if n.eq_ignore_ascii_case(alias) {
                return canonical.clone();
            }
        }
        n.to_string()
    }

    /// Resolve a Positive/Negative/Variable spelling; unmapped full
    /// spellings are title-cased, everything else passes through.
    pub fn canonical_value(&self, value: &str) -> String {
        let v = value.trim();
        let low = v.to_ascii_lowercase();
        if let Some(mapped) = self.value_aliases.get(&low) {
            return mapped.clone();
        }
        match CategoricalValue::from_str(v) {
            Ok(c) => c.as_str().to_string(),
            Err(()) => v.to_string(),
        }
    }

    /// Merge one alias → canonical pair; returns true when newly added.
    /// Identity pairs and already-present aliases are skipped, so the merge
    /// is idempotent.
    pub fn merge_field_alias(&mut self, alias: &str, canonical: &str) -> bool {
        let alias = alias.trim();
        let canonical = canonical.trim();
        if alias.eq_ignore_ascii_case(canonical) || alias.is_empty() {
            return false;
        }
        if self
            .field_aliases
            .keys()
            .any(|a| a.eq_ignore_ascii_case(alias))
        {
            return false;
        }
        self.field_aliases
            .insert(alias.to_string(), canonical.to_string());
        true
    }
}

// ============================================================================
// Signals catalog
// ============================================================================

/// Evidence counts for one (genus, test) pair. `n` is always the sum of the
/// three category counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalCounts {
    #[serde(rename = "Positive")]
    pub positive: u64,
    #[serde(rename = "Negative")]
    pub negative: u64,
    #[serde(rename = "Variable")]
    pub variable: u64,
    #[serde(rename = "_n")]
    pub n: u64,
}

impl SignalCounts {
    pub fn count(&self, value: CategoricalValue) -> u64 {
        match value {
            CategoricalValue::Positive => self.positive,
            CategoricalValue::Negative => self.negative,
            CategoricalValue::Variable => self.variable,
        }
    }

    pub fn record(&mut self, value: CategoricalValue) {
        match value {
            CategoricalValue::Positive => self.positive += 1,
            CategoricalValue::Negative => self.negative += 1,
            CategoricalValue::Variable => self.variable += 1,
        }
        self.n += 1;
    }
}

/// Learned genus → test → evidence-count table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SignalsCatalog {
    genera: BTreeMap<String, BTreeMap<String, SignalCounts>>,
}

impl SignalsCatalog {
    pub fn genera(&self) -> impl Iterator<Item = &str> {
        self.genera.keys().map(String::as_str)
    }

    pub fn counts(&self, genus: &str, field: &str) -> Option<&SignalCounts> {
        self.genera.get(genus).and_then(|tests| tests.get(field))
    }

    pub fn record(&mut self, genus: &str, field: &str, value: CategoricalValue) {
        self.genera
            .entry(genus.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .record(value);
    }

    pub fn is_empty(&self) -> bool {
        self.genera.is_empty()
    }

    pub fn len(&self) -> usize {
        self.genera.len()
    }
}

// ============================================================================
// Repository
// ============================================================================

/// The three learned documents as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearnedArtifacts {
    pub registry: ExtendedSchemaRegistry,
    pub aliases: AliasMap,
    pub signals: SignalsCatalog,
}

/// Load/replace access to the learned artifacts under one data directory.
#[derive(Debug, Clone)]
pub struct ArtifactRepository {
    data_dir: PathBuf,
}

impl ArtifactRepository {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("extended_schema.json")
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.data_dir.join("alias_maps.json")
    }

    pub fn signals_path(&self) -> PathBuf {
        self.data_dir.join("signals_catalog.json")
    }

    /// Load all three documents, substituting empty defaults for anything
    /// missing or malformed. The engine then runs in core-only mode for the
    /// affected concern.
    pub fn load(&self) -> LearnedArtifacts {
        LearnedArtifacts {
            registry: self.load_or_default(&self.registry_path()),
            aliases: self.load_or_default(&self.aliases_path()),
            signals: self.load_or_default(&self.signals_path()),
        }
    }

    /// Replace all three documents atomically (per file): each is serialized
    /// to a temp file in the same directory and renamed into place.
    pub fn replace(&self, artifacts: &LearnedArtifacts) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;
        self.write_atomic(&self.registry_path(), &artifacts.registry)?;
        self.write_atomic(&self.aliases_path(), &artifacts.aliases)?;
        self.write_atomic(&self.signals_path(), &artifacts.signals)?;
        Ok(())
    }

    /// Take the exclusive training lock for this data directory. Fails
    /// immediately (rather than blocking) when another trainer holds it.
    pub fn lock_training(&self) -> Result<TrainingLock, StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;
        let path = self.data_dir.join("training.lock");
        let file = fs::File::create(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::LockHeld(path.clone()))?;
        Ok(TrainingLock { _file: file })
    }

    fn load_or_default<T: Default + for<'de> Deserialize<'de>>(&self, path: &Path) -> T {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return T::default(),
        };
        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "malformed learned artifact, falling back to empty default"
                );
                T::default()
            }
        }
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let map_io = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.data_dir).map_err(map_io)?;
        let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tmp.write_all(text.as_bytes()).map_err(map_io)?;
        tmp.persist(path).map_err(|e| map_io(e.error))?;
        Ok(())
    }
}

/// Advisory exclusive lock held for the duration of a training pass;
/// released on drop.
#[derive(Debug)]
pub struct TrainingLock {
    _file: fs::File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifacts_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArtifactRepository::new(dir.path());
        let artifacts = repo.load();
        assert!(artifacts.registry.is_empty());
        assert!(artifacts.signals.is_empty());
        assert!(artifacts.aliases.field_aliases.is_empty());
    }

    #[test]
    fn malformed_artifact_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArtifactRepository::new(dir.path());
        fs::write(repo.signals_path(), "{ not json").unwrap();
        assert!(repo.load().signals.is_empty());
    }

    #[test]
    fn replace_round_trips_all_three_documents() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArtifactRepository::new(dir.path());

        let mut artifacts = LearnedArtifacts::default();
        artifacts.registry.register("Bile Esculin");
        artifacts.registry.add_alias("Bile Esculin", "bile esculin test");
        artifacts.aliases.merge_field_alias("Dnase", "DNase");
        artifacts
            .signals
            .record("Enterococcus", "Bile Esculin", CategoricalValue::Positive);

        repo.replace(&artifacts).unwrap();
        assert_eq!(repo.load(), artifacts);
    }

    #[test]
    fn signal_counts_keep_n_in_sync() {
        let mut counts = SignalCounts::default();
        counts.record(CategoricalValue::Positive);
        counts.record(CategoricalValue::Positive);
        counts.record(CategoricalValue::Negative);
        assert_eq!(counts.positive, 2);
        assert_eq!(counts.negative, 1);
        assert_eq!(counts.n, counts.positive + counts.negative + counts.variable);
    }

    #[test]
    fn signals_json_uses_catalog_field_names() {
        let mut catalog = SignalsCatalog::default();
        catalog.record("A", "TestX", CategoricalValue::Positive);
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["A"]["TestX"]["Positive"], 1);
        assert_eq!(json["A"]["TestX"]["_n"], 1);
    }

    #[test]
    fn alias_merge_is_idempotent() {
        let mut aliases = AliasMap::default();
        assert!(aliases.merge_field_alias("Dnase", "DNase"));
        assert!(!aliases.merge_field_alias("Dnase", "DNase"));
        assert!(!aliases.merge_field_alias("dnase", "DNase"));
        assert!(!aliases.merge_field_alias("DNase", "DNase"));
        assert_eq!(aliases.field_aliases.len(), 1);
        assert_eq!(aliases.canonical_field("dnase"), "DNase");
    }

    #[test]
    fn value_alias_resolution_title_cases_pnv() {
        let aliases = AliasMap::default();
        assert_eq!(aliases.canonical_value("positive"), "Positive");
        assert_eq!(aliases.canonical_value("NEG"), "Negative");
        assert_eq!(aliases.canonical_value("weakly positive"), "weakly positive");
    }

    #[test]
    fn registry_registration_is_idempotent() {
        let mut registry = ExtendedSchemaRegistry::default();
        assert!(registry.register("Bile Esculin"));
        assert!(!registry.register("Bile Esculin"));
        registry.add_alias("Bile Esculin", "bile-esculin");
        registry.add_alias("Bile Esculin", "bile-esculin");
        assert_eq!(registry.get("Bile Esculin").unwrap().aliases.len(), 1);
    }

    #[test]
    fn second_training_lock_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ArtifactRepository::new(dir.path());
        let _lock = repo.lock_training().unwrap();
        assert!(matches!(repo.lock_training(), Err(StoreError::LockHeld(_))));
    }
}
