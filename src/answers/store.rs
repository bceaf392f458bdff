//! Per-user answer records and their on-disk store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or saving a store file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse store file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A user's saved field values for the target form.
///
/// Keys are form entry keys, values the answer text to submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AnswerRecord {
    answers: BTreeMap<String, String>,
}

impl AnswerRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the saved value for a field key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.answers.get(key).map(String::as_str)
    }

    /// Saves a value for a field key, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.answers.insert(key.into(), value.into());
    }

    /// Removes a saved value. Returns whether one was present.
    pub fn unset(&mut self, key: &str) -> bool {
        self.answers.remove(key).is_some()
    }

    /// Iterates over the saved pairs in stable (key) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.answers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of saved answers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Checks if no answers are saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// On-disk store of answer records, one per user.
///
/// Keying by user id guarantees at most one record per user. The whole
/// store is rewritten on save; records are small and mutations rare.
#[derive(Debug)]
pub struct AnswerStore {
    records: HashMap<i64, AnswerRecord>,
    path: PathBuf,
}

impl AnswerStore {
    /// Loads the store from a JSON file.
    ///
    /// A missing file yields an empty store; an unreadable or malformed
    /// file is an error, so existing data is never silently clobbered.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { records, path })
    }

    /// Saves the store to its JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Returns a user's record, if any answers are saved.
    #[must_use]
    pub fn get(&self, user: i64) -> Option<&AnswerRecord> {
        self.records.get(&user)
    }

    /// Saves one field value for a user, creating the record if needed.
    pub fn set(&mut self, user: i64, key: impl Into<String>, value: impl Into<String>) {
        self.records.entry(user).or_default().set(key, value);
    }

    /// Clears one saved field value. Returns whether one was present.
    ///
    /// A record left empty is removed so `get` reports it absent.
    pub fn unset(&mut self, user: i64, key: &str) -> bool {
        let Some(record) = self.records.get_mut(&user) else {
            return false;
        };

        let removed = record.unset(key);
        if record.is_empty() {
            self.records.remove(&user);
        }
        removed
    }

    /// Destroys a user's record entirely. Returns whether one existed.
    pub fn reset(&mut self, user: i64) -> bool {
        self.records.remove(&user).is_some()
    }

    /// Iterates over all records, keyed by user id.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &AnswerRecord)> {
        self.records.iter().map(|(&user, record)| (user, record))
    }

    /// Returns the number of users with saved answers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks if no users have saved answers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
