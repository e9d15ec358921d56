//! JSON-file backed entry store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{PassbookError, Result};
use crate::models::{now, Entry, EntryUpdate, MasterRecord, NewEntry, StoreDocument};
use crate::utils;

/// Default data file name inside the data directory.
pub const DATA_FILE_NAME: &str = "passbook.json";

/// An open handle on the data file.
///
/// Every mutation is staged on a copy of the document, written to disk and
/// only then committed, so the in-memory view never runs ahead of the file.
#[derive(Debug)]
pub struct EntryStore {
    path: PathBuf,
    doc: StoreDocument,
}

impl EntryStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = Self::read_document(&path)?;

        for warn_msg in utils::check_file_permissions(&path) {
            warn!("{}", warn_msg);
        }

        debug!(path = %path.display(), entries = doc.entries.len(), "opened store");
        Ok(Self { path, doc })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read entries from disk.
    pub fn load(&mut self) -> Result<&[Entry]> {
        self.doc = Self::read_document(&self.path)?;
        Ok(&self.doc.entries)
    }

    /// Replace the stored entries and write the whole document.
    ///
    /// Fails with [`PassbookError::DuplicateId`] if two entries share an id.
    pub fn save(&mut self, entries: Vec<Entry>) -> Result<()> {
        let next = StoreDocument {
            master: self.doc.master.clone(),
            entries,
        };
        if let Some(id) = next.duplicate_id() {
            return Err(PassbookError::DuplicateId(id));
        }
        self.commit(next)
    }

    /// All entries in insertion order.
    pub fn list(&self) -> &[Entry] {
        &self.doc.entries
    }

    pub fn get(&self, id: u64) -> Option<&Entry> {
        self.doc.find(id)
    }

    /// Create a new entry with the next free id.
    pub fn add(&mut self, fields: NewEntry) -> Result<Entry> {
        let mut next = self.doc.clone();
        let entry = fields.into_entry(next.next_id(), now());
        next.entries.push(entry.clone());
        self.commit(next)?;

        debug!(id = entry.id, "added entry");
        Ok(entry)
    }

    /// Overwrite the supplied fields of entry `id`.
    ///
    /// An empty update leaves the entry and the file untouched.
    pub fn update(&mut self, id: u64, fields: EntryUpdate) -> Result<Entry> {
        if self.doc.find(id).is_none() {
            return Err(PassbookError::NotFound(id));
        }
        if fields.is_empty() {
            return self.doc.find(id).cloned().ok_or(PassbookError::NotFound(id));
        }

        let mut next = self.doc.clone();
        let entry = next.find_mut(id).ok_or(PassbookError::NotFound(id))?;
        fields.apply(entry);
        entry.last_updated = now();
        let updated = entry.clone();
        self.commit(next)?;

        debug!(id, "updated entry");
        Ok(updated)
    }

    /// Delete entry `id`.
    pub fn remove(&mut self, id: u64) -> Result<Entry> {
        let idx = self
            .doc
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(PassbookError::NotFound(id))?;

        let mut next = self.doc.clone();
        let removed = next.entries.remove(idx);
        self.commit(next)?;

        debug!(id, "removed entry");
        Ok(removed)
    }

    /// Entries whose name, username, url or notes contain `keyword`, ignoring case.
    pub fn search(&self, keyword: &str) -> Result<Vec<&Entry>> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(PassbookError::InvalidInput(
                "Keyword cannot be empty.".to_string(),
            ));
        }
        Ok(self
            .doc
            .entries
            .iter()
            .filter(|e| e.matches(&keyword))
            .collect())
    }

    /// The stored master password record, if setup has happened.
    pub fn master(&self) -> Option<&MasterRecord> {
        self.doc.master.as_ref()
    }

    /// Persist the master password record.
    pub fn set_master(&mut self, record: MasterRecord) -> Result<()> {
        let mut next = self.doc.clone();
        next.master = Some(record);
        self.commit(next)
    }

    /// Flush the document one last time and release the handle.
    pub fn close(self) -> Result<()> {
        if self.doc != StoreDocument::default() || self.path.exists() {
            Self::write_document(&self.path, &self.doc)?;
        }
        debug!(path = %self.path.display(), "closed store");
        Ok(())
    }

    fn commit(&mut self, next: StoreDocument) -> Result<()> {
        Self::write_document(&self.path, &next)?;
        self.doc = next;
        Ok(())
    }

    fn read_document(path: &Path) -> Result<StoreDocument> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no data file yet");
                return Ok(StoreDocument::default());
            }
            Err(source) => {
                return Err(PassbookError::Storage {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let doc: StoreDocument =
            serde_json::from_str(&content).map_err(|source| PassbookError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(id) = doc.duplicate_id() {
            return Err(PassbookError::DuplicateId(id));
        }
        Ok(doc)
    }

    /// Write to a sibling temp file, then rename it over the target.
    fn write_document(path: &Path, doc: &StoreDocument) -> Result<()> {
        let storage_err = |source: std::io::Error| PassbookError::Storage {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(storage_err)?;

        let mut content = serde_json::to_string_pretty(doc)
            .map_err(|e| storage_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        content.push('\n');

        let mut temp = NamedTempFile::new_in(&dir).map_err(storage_err)?;
        temp.write_all(content.as_bytes()).map_err(storage_err)?;
        temp.as_file().sync_all().map_err(storage_err)?;

        // Set secure permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))
                .map_err(storage_err)?;
        }

        temp.persist(path).map_err(|e| storage_err(e.error))?;
        debug!(path = %path.display(), entries = doc.entries.len(), "saved store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields(name: &str) -> NewEntry {
        NewEntry {
            name: name.to_string(),
            username: format!("{}@x.com", name.to_lowercase()),
            password: "p@ss".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let store = EntryStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(store.list().is_empty());
        assert!(store.master().is_none());
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        fs::write(&path, "").unwrap();

        let store = EntryStore::open(&path).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_malformed_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let err = EntryStore::open(&path).unwrap_err();
        assert!(err.is_storage());
        assert!(matches!(err, PassbookError::Malformed { .. }));
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let dir = tempdir().unwrap();
        let mut store = EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap();

        let ids: Vec<u64> = ["A", "B", "C"]
            .iter()
            .map(|n| store.add(fields(n)).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_add_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        store.add(fields("Email")).unwrap();

        let reopened = EntryStore::open(&path).unwrap();
        assert_eq!(reopened.list(), store.list());
    }

    #[test]
    fn test_update_missing_id() {
        let dir = tempdir().unwrap();
        let mut store = EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap();
        let err = store.update(9, EntryUpdate::default()).unwrap_err();
        assert!(matches!(err, PassbookError::NotFound(9)));
    }

    #[test]
    fn test_empty_update_keeps_timestamp() {
        let dir = tempdir().unwrap();
        let mut store = EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap();
        let added = store.add(fields("Email")).unwrap();

        let same = store.update(added.id, EntryUpdate::default()).unwrap();
        assert_eq!(same, added);
    }

    #[test]
    fn test_remove_missing_leaves_state() {
        let dir = tempdir().unwrap();
        let mut store = EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap();
        store.add(fields("Email")).unwrap();
        let before = store.list().to_vec();

        assert!(matches!(store.remove(42), Err(PassbookError::NotFound(42))));
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_search() {
        let dir = tempdir().unwrap();
        let mut store = EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap();
        store.add(fields("Gmail")).unwrap();
        store.add(fields("Facebook")).unwrap();

        let hits = store.search("GMAIL").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Gmail");

        assert!(store.search("x.com").unwrap().len() == 2);
        assert!(store.search("p@ss").unwrap().is_empty());
        assert!(matches!(
            store.search("   "),
            Err(PassbookError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        store.add(fields("One")).unwrap();
        store.add(fields("Two")).unwrap();

        let mut entries = store.list().to_vec();
        entries[0].notes = "ünïcode notes".to_string();
        store.save(entries.clone()).unwrap();

        let loaded = store.load().unwrap().to_vec();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_save_rejects_duplicate_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        let a = store.add(fields("A")).unwrap();
        let mut b = store.add(fields("B")).unwrap();
        b.id = a.id;
        let before = store.list().to_vec();

        let err = store.save(vec![a.clone(), b]).unwrap_err();
        assert!(matches!(err, PassbookError::DuplicateId(1)));
        assert_eq!(store.list(), before.as_slice());

        let reopened = EntryStore::open(&path).unwrap();
        let ids: Vec<u64> = reopened.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        store.add(fields("A")).unwrap();
        store.add(fields("B")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        fs::write(&path, raw.replace("\"id\": 2", "\"id\": 1")).unwrap();

        let err = EntryStore::open(&path).unwrap_err();
        assert!(matches!(err, PassbookError::DuplicateId(1)));
    }

    #[test]
    fn test_failed_save_keeps_memory_in_sync() {
        let dir = tempdir().unwrap();
        // A directory in place of the data file makes the rename fail.
        let path = dir.path().join("blocked");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut store = EntryStore {
            path: path.clone(),
            doc: StoreDocument::default(),
        };
        let err = store.add(fields("Email")).unwrap_err();
        assert!(err.is_storage());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        store.add(fields("Email")).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut store = EntryStore::open(&path).unwrap();
        store.add(fields("Email")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_close_without_changes_creates_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        EntryStore::open(&path).unwrap().close().unwrap();
        assert!(!path.exists());
    }
}
