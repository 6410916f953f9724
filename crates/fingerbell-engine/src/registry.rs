//! Template id→name registry.
//!
//! Names live in the `fingerprints` namespace of the preference store, one
//! key per slot (the decimal slot id). The in-memory copy is a fixed table
//! indexed by slot id minus one.
//!
//! Mutations are only made after the matching sensor-side operation
//! succeeded. The cached table always follows the sensor; a failed
//! persistence write is reported to the caller but does not roll the cache
//! back.

use fingerbell_core::SlotId;
use fingerbell_core::constants::{REGISTRY_NAMESPACE, SLOT_COUNT, UNKNOWN_NAME};
use fingerbell_storage::{PreferenceStore, StorageResult};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    names: Vec<Option<String>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            names: vec![None; SLOT_COUNT],
        }
    }

    /// Populate the table from the store, one lookup per slot.
    ///
    /// Empty stored names are skipped. Returns the number of names loaded.
    pub async fn load<P: PreferenceStore>(&mut self, store: &P) -> StorageResult<usize> {
        let mut loaded = 0;
        for slot in SlotId::all() {
            let name = store
                .get(REGISTRY_NAMESPACE, &slot.to_string())
                .await?
                .filter(|name| !name.is_empty());
            if name.is_some() {
                loaded += 1;
            }
            self.names[slot.index()] = name;
        }

        info!("Loaded {} fingerprint names from storage", loaded);
        Ok(loaded)
    }

    /// Record `name` for `slot`.
    pub async fn upsert<P: PreferenceStore>(
        &mut self,
        store: &P,
        slot: SlotId,
        name: &str,
    ) -> StorageResult<()> {
        self.names[slot.index()] = (!name.is_empty()).then(|| name.to_string());

        store
            .put(REGISTRY_NAMESPACE, &slot.to_string(), name)
            .await
            .inspect_err(|e| warn!(%slot, error = %e, "Failed to persist template name"))?;

        debug!(%slot, name, "Template name stored");
        Ok(())
    }

    /// Forget the name for `slot`.
    pub async fn remove<P: PreferenceStore>(&mut self, store: &P, slot: SlotId) -> StorageResult<()> {
        self.names[slot.index()] = None;
        store.remove(REGISTRY_NAMESPACE, &slot.to_string()).await?;
        Ok(())
    }

    /// Forget every name.
    pub async fn clear<P: PreferenceStore>(&mut self, store: &P) -> StorageResult<()> {
        self.names.iter_mut().for_each(|name| *name = None);
        store.clear(REGISTRY_NAMESPACE).await?;
        Ok(())
    }

    /// Name registered for `slot`, or `"Unknown"`.
    pub fn lookup(&self, slot: SlotId) -> &str {
        self.get(slot).unwrap_or(UNKNOWN_NAME)
    }

    pub fn get(&self, slot: SlotId) -> Option<&str> {
        self.names[slot.index()].as_deref()
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.names[slot.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.names.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered slots and names in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> {
        SlotId::all().filter_map(|slot| self.get(slot).map(|name| (slot, name)))
    }
}
