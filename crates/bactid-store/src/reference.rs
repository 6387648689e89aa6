//! Reference table loader.
//!
//! `reference.json` maps genus → field → string value. The table is loaded
//! once at engine construction; [`ReferenceStore::reload_if_changed`]
//! re-reads it only when the file's modification time differs from the one
//! cached at load, which is the entire cache-invalidation contract.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// One genus's canonical test-field values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReferenceProfile {
    fields: BTreeMap<String, String>,
}

impl ReferenceProfile {
    /// Value for `field`, with absent columns reading as empty.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ReferenceProfile {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The process-wide genus profile table.
#[derive(Debug)]
pub struct ReferenceStore {
    path: PathBuf,
    loaded_mtime: Option<SystemTime>,
    profiles: BTreeMap<String, ReferenceProfile>,
}

impl ReferenceStore {
    /// Load the table, failing hard when the file is absent or unreadable —
    /// the engine cannot start without it.
    pub fn load(path: &Path) -> Result<ReferenceStore, StoreError> {
        if !path.exists() {
            return Err(StoreError::ReferenceMissing(path.to_path_buf()));
        }
        let mut store = ReferenceStore {
            path: path.to_path_buf(),
            loaded_mtime: None,
            profiles: BTreeMap::new(),
        };
        store.read_table()?;
        Ok(store)
    }

    /// Re-read the table iff its modification time changed since the last
    /// load. Returns whether a reload happened.
    pub fn reload_if_changed(&mut self) -> Result<bool, StoreError> {
        let current = self.mtime()?;
        if Some(current) == self.loaded_mtime {
            return Ok(false);
        }
        self.read_table()?;
        Ok(true)
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&str, &ReferenceProfile)> {
        self.profiles.iter().map(|(g, p)| (g.as_str(), p))
    }

    pub fn get(&self, genus: &str) -> Option<&ReferenceProfile> {
        self.profiles.get(genus)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn mtime(&self) -> Result<SystemTime, StoreError> {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn read_table(&mut self) -> Result<(), StoreError> {
        let mtime = self.mtime()?;
        let text = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.profiles = serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        self.loaded_mtime = Some(mtime);
        tracing::debug!(
            path = %self.path.display(),
            genera = self.profiles.len(),
            "reference table loaded"
        );
        Ok(())
    }
}
