//! Process-wide cache of engine handles keyed by identifier.
//!
//! One [`RwLock`] guards the whole map: the registry normally holds a single
//! entry, so per-entry locking buys nothing. Handles are stored fully bound
//! and shared as `Arc`, so a reader can never observe a half-built engine.
//!
//! Engine construction runs user code, so it never happens under the map
//! lock. A separate construction mutex keeps concurrent builders in line.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::engine::EngineHandle;
use crate::error::{RegistryError, validate_id};

/// Holds every cached engine. Safe to share across threads without
/// external locking.
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<EngineHandle>>>,
    construction: Mutex<()>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
            construction: Mutex::new(()),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated:
    // every critical section is a single HashMap call.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<EngineHandle>>> {
        self.engines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<EngineHandle>>> {
        self.engines.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `handle` under `id`. An occupied slot is never overwritten.
    pub fn put(&self, id: &str, handle: Arc<EngineHandle>) -> Result<(), RegistryError> {
        validate_id(id)?;
        match self.write().entry(id.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateRegistration { id: id.to_string() }),
            Entry::Vacant(slot) => {
                debug!(id, instance = handle.instance(), "engine stored");
                slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Look up an engine. A miss is `Ok(None)`, not an error.
    pub fn get(&self, id: &str) -> Result<Option<Arc<EngineHandle>>, RegistryError> {
        validate_id(id)?;
        let found = self.read().get(id).cloned();
        trace!(id, hit = found.is_some(), "engine lookup");
        Ok(found)
    }

    /// Drop the entry for `id`, handing back what was stored. No-op on a miss.
    pub fn remove(&self, id: &str) -> Result<Option<Arc<EngineHandle>>, RegistryError> {
        validate_id(id)?;
        let removed = self.write().remove(id);
        if let Some(handle) = &removed {
            debug!(id, instance = handle.instance(), "engine removed");
        }
        Ok(removed)
    }

    pub fn contains(&self, id: &str) -> Result<bool, RegistryError> {
        validate_id(id)?;
        Ok(self.read().contains_key(id))
    }

    /// Return the engine under `id`, building and storing it with `init` if
    /// the slot is empty. The flag is `true` when this call stored the handle.
    /// If `init` fails nothing is stored.
    ///
    /// `init` runs with no map lock held: readers stay unblocked and `init`
    /// may itself read the registry. Builders are serialised, so callers
    /// racing on one id construct at most one engine. A `put` that lands
    /// while `init` runs wins; the freshly built handle is dropped.
    pub fn get_or_try_insert_with<E, F>(
        &self,
        id: &str,
        init: F,
    ) -> Result<(Arc<EngineHandle>, bool), E>
    where
        E: From<RegistryError>,
        F: FnOnce() -> Result<EngineHandle, E>,
    {
        validate_id(id)?;

        if let Some(existing) = self.read().get(id) {
            return Ok((Arc::clone(existing), false));
        }

        let _building = self
            .construction
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another builder may have finished while we waited.
        if let Some(existing) = self.read().get(id) {
            return Ok((Arc::clone(existing), false));
        }

        let handle = Arc::new(init()?);

        match self.write().entry(id.to_string()) {
            Entry::Occupied(slot) => {
                debug!(id, instance = handle.instance(), "engine built but slot taken");
                Ok((Arc::clone(slot.get()), false))
            }
            Entry::Vacant(slot) => {
                debug!(id, instance = handle.instance(), "engine stored");
                slot.insert(Arc::clone(&handle));
                Ok((handle, true))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
