//! Named animation library shared by every request handler.
//!
//! [`AnimationStore`] keeps one active name and a map of documents behind a
//! single lock, so each operation is atomic. Multi-step sequences from
//! different clients are last-write-wins.
//!
//! The library persists to one JSON file `{ active, items }`. Mutations only
//! mark the store dirty; [`AnimationStore::flush`] writes it out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::wire::{GridLimits, WireDocument};
use crate::{AnimationDocument, DocumentError};

/// Name of the document created when the library would otherwise be empty.
pub const DEFAULT_ANIMATION: &str = "default";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested animation does not exist.
    #[error("Animation not found: {0}")]
    NotFound(String),
    /// The request did not name an animation.
    #[error("Missing animation name")]
    MissingName,
    /// The submitted document is invalid.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// On-disk library layout.
#[derive(Debug, Serialize, Deserialize)]
struct Library {
    active: String,
    items: BTreeMap<String, WireDocument>,
}

#[derive(Debug)]
struct StoreInner {
    active: String,
    items: BTreeMap<String, AnimationDocument>,
    /// Bumped on every mutation.
    revision: u64,
    /// Revision last written to disk.
    flushed: u64,
}

impl StoreInner {
    fn fresh(limits: &GridLimits) -> Self {
        let mut items = BTreeMap::new();
        items.insert(DEFAULT_ANIMATION.to_string(), blank(DEFAULT_ANIMATION, limits));
        Self {
            active: DEFAULT_ANIMATION.to_string(),
            items,
            revision: 0,
            flushed: 0,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn blank(name: &str, limits: &GridLimits) -> AnimationDocument {
    AnimationDocument::new(name, limits.max_width, limits.max_height)
}

/// Thread-safe animation library.
///
/// # Example
///
/// ```
/// use flipdot_core::store::AnimationStore;
/// use flipdot_core::wire::GridLimits;
///
/// let store = AnimationStore::new(GridLimits::default());
/// assert_eq!(store.active(), "default");
///
/// store.select("walk");
/// assert_eq!(store.names(), vec!["default".to_string(), "walk".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct AnimationStore {
    inner: Arc<RwLock<StoreInner>>,
    limits: GridLimits,
    /// Backing file, if persistent.
    path: Option<PathBuf>,
    /// Serializes writers of the backing file.
    flush_lock: Arc<Mutex<()>>,
}

impl Default for AnimationStore {
    fn default() -> Self {
        Self::new(GridLimits::default())
    }
}

impl AnimationStore {
    /// In-memory store holding one blank `"default"` animation.
    #[must_use]
    pub fn new(limits: GridLimits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::fresh(&limits))),
            limits,
            path: None,
            flush_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Persistent store backed by `path`.
    ///
    /// A missing or unreadable file yields a fresh library; the next flush
    /// overwrites it.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, limits: GridLimits) -> Self {
        let path = path.into();
        match Self::load_from(&path, limits) {
            Ok(store) => store,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No library file, starting fresh");
                Self::fresh_at(path, limits)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to load library: {e}");
                Self::fresh_at(path, limits)
            }
        }
    }

    fn fresh_at(path: PathBuf, limits: GridLimits) -> Self {
        let mut store = Self::new(limits);
        store.path = Some(path);
        store
    }

    /// Load a library file.
    ///
    /// Entries that fail validation are skipped with a warning. If the stored
    /// active name is missing, the first remaining name becomes active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Serialization`] if it is not a library.
    pub fn load_from(path: impl AsRef<Path>, limits: GridLimits) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let library: Library = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut items = BTreeMap::new();
        for (name, wire) in library.items {
            match wire.into_document(name.as_str(), &limits) {
                Ok(doc) => {
                    items.insert(name, doc);
                }
                Err(e) => tracing::warn!(name = %name, "Skipping stored animation: {e}"),
            }
        }

        let mut inner = StoreInner {
            active: library.active,
            items,
            revision: 0,
            flushed: 0,
        };
        ensure_active(&mut inner, &limits);
        tracing::info!(
            path = %path.display(),
            count = inner.items.len(),
            active = %inner.active,
            "Loaded animation library"
        );

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            limits,
            path: Some(path.to_path_buf()),
            flush_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Size limits applied to saved documents.
    #[must_use]
    pub fn limits(&self) -> GridLimits {
        self.limits
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The active animation name.
    #[must_use]
    pub fn active(&self) -> String {
        self.read().active.clone()
    }

    /// All stored names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().items.keys().cloned().collect()
    }

    /// Names and active name in one consistent read.
    #[must_use]
    pub fn list(&self) -> crate::wire::ListResponse {
        let inner = self.read();
        crate::wire::ListResponse {
            items: inner.items.keys().cloned().collect(),
            active: inner.active.clone(),
        }
    }

    /// Number of stored animations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    /// Always false; the library keeps at least one animation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Whether `name` is stored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().items.contains_key(name)
    }

    /// A stored document by name.
    #[must_use]
    pub fn document(&self, name: &str) -> Option<AnimationDocument> {
        self.read().items.get(name).cloned()
    }

    /// The active document.
    #[must_use]
    pub fn active_document(&self) -> AnimationDocument {
        let inner = self.read();
        inner
            .items
            .get(&inner.active)
            .cloned()
            .unwrap_or_else(|| blank(&inner.active, &self.limits))
    }

    /// Wire form of `name`, or of the active document when `None`.
    ///
    /// Unknown names produce a blank document of that name without storing it.
    #[must_use]
    pub fn get(&self, name: Option<&str>) -> WireDocument {
        let inner = self.read();
        let name = name.unwrap_or(inner.active.as_str());
        match inner.items.get(name) {
            Some(doc) => WireDocument::from(doc),
            None => WireDocument::from(&blank(name, &self.limits)),
        }
    }

    /// Validate and store a wire document under `name`, replacing any
    /// existing document wholesale. The active selection is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingName`] for an empty name or
    /// [`StoreError::Document`] if the document is invalid; nothing is stored.
    pub fn save(&self, name: &str, wire: WireDocument) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }
        let doc = wire.into_document(name, &self.limits)?;
        self.save_document(doc)
    }

    /// Store an already-built document under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingName`] for an unnamed document or
    /// [`StoreError::Document`] if it exceeds the size limits.
    pub fn save_document(&self, doc: AnimationDocument) -> Result<(), StoreError> {
        if doc.name().is_empty() {
            return Err(StoreError::MissingName);
        }
        self.limits.check(doc.width(), doc.height())?;
        let mut inner = self.write();
        tracing::debug!(name = doc.name(), frames = doc.frame_count(), "Saved animation");
        inner.items.insert(doc.name().to_string(), doc);
        inner.touch();
        Ok(())
    }

    /// Make `name` active, creating a blank document if it is unknown.
    ///
    /// Returns whether a document was created.
    pub fn select(&self, name: &str) -> bool {
        let mut inner = self.write();
        let created = if inner.items.contains_key(name) {
            false
        } else {
            inner.items.insert(name.to_string(), blank(name, &self.limits));
            true
        };
        inner.active = name.to_string();
        inner.touch();
        tracing::debug!(name, created, "Selected animation");
        created
    }

    /// Remove `name` and return the active name afterwards.
    ///
    /// Deleting the active animation activates the first remaining name, or a
    /// fresh `"default"` when none remain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `name` is not stored.
    pub fn delete(&self, name: &str) -> Result<String, StoreError> {
        let mut inner = self.write();
        if inner.items.remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        ensure_active(&mut inner, &self.limits);
        inner.touch();
        tracing::debug!(name, active = %inner.active, "Deleted animation");
        Ok(inner.active.clone())
    }

    /// Whether there are mutations not yet flushed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let inner = self.read();
        inner.revision != inner.flushed
    }

    /// Write the library to its backing file if it changed.
    ///
    /// The file is replaced atomically via a temporary sibling. Returns
    /// whether anything was written. In-memory stores never write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Serialization`]; the store
    /// stays dirty so the next flush retries.
    pub fn flush(&self) -> Result<bool, StoreError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        // One writer at a time, held from snapshot to rename so an older
        // revision never lands after a newer one.
        let _guard = self
            .flush_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (json, revision) = {
            let inner = self.read();
            if inner.revision == inner.flushed {
                return Ok(false);
            }
            let library = Library {
                active: inner.active.clone(),
                items: inner
                    .items
                    .iter()
                    .map(|(name, doc)| (name.clone(), WireDocument::from(doc)))
                    .collect(),
            };
            let json = serde_json::to_string_pretty(&library)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            (json, inner.revision)
        };

        write_atomic(path, json.as_bytes())?;

        let mut inner = self.write();
        inner.flushed = inner.flushed.max(revision);
        tracing::debug!(path = %path.display(), revision, "Flushed animation library");
        Ok(true)
    }
}

fn ensure_active(inner: &mut StoreInner, limits: &GridLimits) {
    if inner.items.contains_key(&inner.active) {
        return;
    }
    if let Some(first) = inner.items.keys().next() {
        inner.active = first.clone();
    } else {
        inner
            .items
            .insert(DEFAULT_ANIMATION.to_string(), blank(DEFAULT_ANIMATION, limits));
        inner.active = DEFAULT_ANIMATION.to_string();
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
