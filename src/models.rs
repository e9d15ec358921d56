//! Data models for the password book.

use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::crypto::MasterDigest;

/// Current local time truncated to whole seconds.
pub fn now() -> DateTime<Local> {
    Local::now().trunc_subsecs(0)
}

/// A single stored credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub auth_key: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    pub last_updated: DateTime<Local>,
}

impl Entry {
    /// Case-insensitive keyword match over the non-secret text fields.
    /// `keyword` must already be lowercase.
    pub fn matches(&self, keyword: &str) -> bool {
        [&self.name, &self.username, &self.url, &self.notes]
            .iter()
            .any(|field| field.to_lowercase().contains(keyword))
    }
}

/// Field values for a new entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub name: String,
    pub username: String,
    pub password: String,
    pub auth_key: String,
    pub url: String,
    pub notes: String,
}

impl NewEntry {
    pub(crate) fn into_entry(self, id: u64, stamp: DateTime<Local>) -> Entry {
        Entry {
            id,
            name: self.name,
            username: self.username,
            password: self.password,
            auth_key: self.auth_key,
            url: self.url,
            notes: self.notes,
            last_updated: stamp,
        }
    }
}

/// A partial edit; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_key: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl EntryUpdate {
    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.auth_key.is_none()
            && self.url.is_none()
            && self.notes.is_none()
    }

    /// Overwrite the supplied fields of `entry`.
    pub(crate) fn apply(self, entry: &mut Entry) {
        let slots = [
            (self.name, &mut entry.name),
            (self.username, &mut entry.username),
            (self.password, &mut entry.password),
            (self.auth_key, &mut entry.auth_key),
            (self.url, &mut entry.url),
            (self.notes, &mut entry.notes),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// The persisted master password record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterRecord {
    pub salt: String,
    pub hash: String,
    pub created_at: DateTime<Local>,
}

impl MasterRecord {
    pub fn digest(&self) -> MasterDigest {
        MasterDigest {
            salt: self.salt.clone(),
            hash: self.hash.clone(),
        }
    }
}

impl From<MasterDigest> for MasterRecord {
    fn from(digest: MasterDigest) -> Self {
        Self {
            salt: digest.salt,
            hash: digest.hash,
            created_at: now(),
        }
    }
}

/// Everything stored in the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDocument {
    #[serde(default)]
    pub master: Option<MasterRecord>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl StoreDocument {
    /// Next id to assign: max existing id + 1, or 1 when empty.
    pub fn next_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }

    /// First id that appears more than once, if any.
    pub fn duplicate_id(&self) -> Option<u64> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.iter().map(|e| e.id).find(|id| !seen.insert(*id))
    }

    pub fn find(&self, id: u64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}
