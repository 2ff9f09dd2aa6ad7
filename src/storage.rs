//! Durable client-side key/value storage.
//!
//! The session token and the cached example questions outlive a single run of
//! the client.  [`FileStorage`] keeps them in a small JSON document;
//! [`MemoryStorage`] is the in-process equivalent.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};

/// Key holding the persisted session token.
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// Key holding the cached example questions as a JSON array.
pub const EXAMPLE_QUESTIONS_KEY: &str = "example_questions";

const STORAGE_VERSION: u8 = 1;

/// String-keyed durable storage.
pub trait Storage: Send {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.  Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` and `remove` calls made so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.writes += 1;
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StorageFile {
    version: u8,
    entries: BTreeMap<String, String>,
}

/// Storage backed by a JSON file.
///
/// The whole document is loaded on open and rewritten on every change.  Writes
/// go to a sibling temporary file that is then renamed over the original, so a
/// crash never leaves a half-written document behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the storage file at `path`.  A missing file is empty storage.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match File::open(&path) {
            Ok(file) => {
                let reader = BufReader::new(file);
                let document: StorageFile = from_reader(reader).map_err(|err| {
                    Error::serialization("failed to parse storage file", Some(Box::new(err)))
                })?;
                if document.version != STORAGE_VERSION {
                    return Err(Error::validation(
                        format!("unsupported storage file version {}", document.version),
                        Some("version".to_string()),
                    ));
                }
                document.entries
            }
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(Error::io("failed to open storage file", err)),
        };
        Ok(Self { path, entries })
    }

    /// The file this storage persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let document = StorageFile {
            version: STORAGE_VERSION,
            entries: self.entries.clone(),
        };
        let tmp = self.path.with_extension("tmp");
        let file =
            File::create(&tmp).map_err(|err| Error::io("failed to create storage file", err))?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, &document).map_err(|err| {
            Error::serialization("failed to serialize storage", Some(Box::new(err)))
        })?;
        writer
            .flush()
            .map_err(|err| Error::io("failed to write storage file", err))?;
        fs::rename(&tmp, &self.path)
            .map_err(|err| Error::io("failed to replace storage file", err))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
