//! Storage of the three collections as JSON blobs in named slots.
//!
//! Loading never fails: an absent or unreadable slot yields the empty
//! collection. Saving is fire-and-forget; failures are logged and the
//! in-memory store stays authoritative.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

use crate::error::PersistenceError;
use crate::store::{EntityStore, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Schedule,
    Exams,
    Notes,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Schedule, Slot::Exams, Slot::Notes];

    pub fn name(self) -> &'static str {
        match self {
            Slot::Schedule => "schedule",
            Slot::Exams => "exams",
            Slot::Notes => "notes",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Raw access to the named slots.
pub trait SlotStorage: Send + Sync {
    /// `Ok(None)` when the slot has never been written.
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistenceError>;

    fn write(&self, slot: Slot, blob: &str) -> Result<(), PersistenceError>;
}

// ==================== File Storage ====================

/// One `<slot>.json` file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.json", slot.name()))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(slot)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                slot: slot.name(),
                source,
            }),
        }
    }

    fn write(&self, slot: Slot, blob: &str) -> Result<(), PersistenceError> {
        let io = |source| PersistenceError::Io {
            slot: slot.name(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io)?;

        // Write beside the target and rename so readers never see half a blob.
        let path = self.path_for(slot);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)?;
        Ok(())
    }
}

// ==================== Memory Storage ====================

/// In-memory slots for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<Slot, String>>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail, as if the disk were unavailable.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn get(&self, slot: Slot) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned()
    }

    pub fn put(&self, slot: Slot, blob: impl Into<String>) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, blob.into());
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(slot))
    }

    fn write(&self, slot: Slot, blob: &str) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::Io {
                slot: slot.name(),
                source: std::io::Error::new(ErrorKind::PermissionDenied, "storage unavailable"),
            });
        }
        self.put(slot, blob);
        Ok(())
    }
}

// ==================== Loading ====================

/// Read all three slots, substituting empty collections for anything
/// missing or unparsable. Legacy notes are migrated while parsing.
pub fn load_snapshot(storage: &dyn SlotStorage) -> Snapshot {
    let snapshot = Snapshot {
        schedule: load_slot(storage, Slot::Schedule),
        exams: load_slot(storage, Slot::Exams),
        notes: load_slot(storage, Slot::Notes),
    };
    tracing::info!(
        classes = snapshot.schedule.len(),
        exams = snapshot.exams.len(),
        notes = snapshot.notes.len(),
        "loaded planner data"
    );
    snapshot
}

fn load_slot<T: DeserializeOwned + Default>(storage: &dyn SlotStorage, slot: Slot) -> T {
    let blob = match storage.read(slot) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            tracing::debug!(slot = slot.name(), "slot empty, using defaults");
            return T::default();
        }
        Err(e) => {
            tracing::warn!("{}", e);
            return T::default();
        }
    };
    match serde_json::from_str(&blob) {
        Ok(value) => value,
        Err(source) => {
            let e = PersistenceError::Deserialize {
                slot: slot.name(),
                source,
            };
            tracing::warn!("{}, using defaults", e);
            T::default()
        }
    }
}

/// Serialize the collection that lives in `slot`.
pub fn encode(store: &EntityStore, slot: Slot) -> Result<String, PersistenceError> {
    let result = match slot {
        Slot::Schedule => serde_json::to_string(store.schedule()),
        Slot::Exams => serde_json::to_string(store.exams()),
        Slot::Notes => serde_json::to_string(store.notes()),
    };
    result.map_err(|source| PersistenceError::Serialize {
        slot: slot.name(),
        source,
    })
}

// ==================== Background Persister ====================

#[derive(Debug, Default)]
struct SlotState {
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

/// Mirrors the store to storage in the background.
///
/// Each slot has a generation counter: a queued write that has been
/// superseded by a newer one for the same slot is skipped, so the last
/// write wins.
pub struct Persister {
    storage: Arc<dyn SlotStorage>,
    handle: Handle,
    slots: Arc<[SlotState; 3]>,
    pending: Mutex<JoinSet<()>>,
}

impl Persister {
    pub fn new(storage: Arc<dyn SlotStorage>, handle: Handle) -> Self {
        Self {
            storage,
            handle,
            slots: Arc::new(std::array::from_fn(|_| SlotState::default())),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Queue a write of the current contents of `slot`.
    pub fn persist(&self, store: &EntityStore, slot: Slot) {
        match encode(store, slot) {
            Ok(blob) => self.persist_blob(slot, blob),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    fn persist_blob(&self, slot: Slot, blob: String) {
        let generation = self.slots[slot.index()]
            .generation
            .fetch_add(1, Ordering::SeqCst)
            + 1;
        let storage = Arc::clone(&self.storage);
        let slots = Arc::clone(&self.slots);

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        while pending.try_join_next().is_some() {}
        pending.spawn_blocking_on(
            move || {
                let state = &slots[slot.index()];
                let _guard = state.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
                if state.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!(slot = slot.name(), generation, "write superseded");
                    return;
                }
                match storage.write(slot, &blob) {
                    Ok(()) => tracing::debug!(slot = slot.name(), bytes = blob.len(), "slot saved"),
                    Err(e) => tracing::warn!("{}", e),
                }
            },
            &self.handle,
        );
    }

    /// Wait for every queued write to finish or be skipped.
    pub async fn flush(&self) {
        let mut pending = {
            let mut guard = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!("persist task failed: {}", e);
            }
        }
    }
}
