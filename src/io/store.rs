use std::cell::{Cell, RefCell};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::model::Item;

/// Error type for the persistence gateway
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access forest storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode stored forest: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The persistence gateway contract. Implementations must preserve
/// parent/child relationships and per-level sibling order across reloads.
pub trait ForestStore {
    fn load(&self) -> Result<Vec<Item>, StoreError>;
    fn save(&self, items: &[Item]) -> Result<(), StoreError>;
}

// Shared handles delegate, so a caller can keep a view of the store the
// engine owns.
impl<S: ForestStore + ?Sized> ForestStore for std::rc::Rc<S> {
    fn load(&self) -> Result<Vec<Item>, StoreError> {
        (**self).load()
    }

    fn save(&self, items: &[Item]) -> Result<(), StoreError> {
        (**self).save(items)
    }
}

/// Forest persisted as pretty JSON at a single path. Writes go through a
/// temp file in the same directory and are renamed into place.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileStore {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ForestStore for JsonFileStore {
    /// A missing file is the empty forest, not an error
    fn load(&self) -> Result<Vec<Item>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, items: &[Item]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(items)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    items: RefCell<Vec<Item>>,
    save_count: Cell<usize>,
    fail_saves: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_items(items: Vec<Item>) -> MemoryStore {
        MemoryStore {
            items: RefCell::new(items),
            ..MemoryStore::default()
        }
    }

    /// How many saves have been attempted
    pub fn save_count(&self) -> usize {
        self.save_count.get()
    }

    /// Make subsequent saves fail (persistence-failure paths)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.borrow().clone()
    }
}

impl ForestStore for MemoryStore {
    fn load(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.borrow().clone())
    }

    fn save(&self, items: &[Item]) -> Result<(), StoreError> {
        self.save_count.set(self.save_count.get() + 1);
        if self.fail_saves.get() {
            return Err(StoreError::Io(std::io::Error::other("simulated failure")));
        }
        *self.items.borrow_mut() = items.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
