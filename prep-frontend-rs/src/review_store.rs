use std::cell::RefCell;
use std::collections::BTreeMap;

use exam_utils::ReviewStatus;

/// Flashcard review status lives under this key, as a JSON object from card
/// id to status.
pub const REVIEW_PROGRESS_KEY: &str = "flashcard_progress";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage call failed: {0}")]
    Js(String),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A string key-value store living outside the database, on the device.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub struct LocalStorage(web_sys::Storage);

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn open() -> Result<Self, StoreError> {
        web_sys::window()
            .ok_or(StoreError::Unavailable)?
            .local_storage()
            .map_err(|e| StoreError::Js(format!("{e:?}")))?
            .map(LocalStorage)
            .ok_or(StoreError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0
            .get_item(key)
            .map_err(|e| StoreError::Js(format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0
            .set_item(key, value)
            .map_err(|e| StoreError::Js(format!("{e:?}")))
    }
}

pub struct ReviewProgressStore<S> {
    storage: S,
}

impl<S: KeyValueStore> ReviewProgressStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Missing or unreadable progress loads as empty.
    pub fn load(&self) -> BTreeMap<u32, ReviewStatus> {
        let stored = match self.storage.get(REVIEW_PROGRESS_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                log::error!("Failed to read flashcard progress: {e}");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&stored).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable flashcard progress: {e}");
            BTreeMap::new()
        })
    }

    pub fn save(&self, progress: &BTreeMap<u32, ReviewStatus>) -> Result<(), StoreError> {
        let json = serde_json::to_string(progress)?;
        self.storage.set(REVIEW_PROGRESS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_survives_a_reload() {
        let store = ReviewProgressStore::new(MemoryStorage::default());
        assert!(store.load().is_empty());

        let progress = BTreeMap::from([(3, ReviewStatus::Known), (8, ReviewStatus::Review)]);
        store.save(&progress).unwrap();
        assert_eq!(store.load(), progress);

        let raw = store.storage.get(REVIEW_PROGRESS_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"3":"known","8":"review"}"#);
    }

    #[test]
    fn garbage_loads_as_empty() {
        let storage = MemoryStorage::default();
        storage.set(REVIEW_PROGRESS_KEY, "not json").unwrap();
        assert!(ReviewProgressStore::new(storage).load().is_empty());
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn local_storage_round_trips_progress() {
        let store = ReviewProgressStore::new(LocalStorage::open().unwrap());
        let progress = BTreeMap::from([(1, ReviewStatus::Known)]);
        store.save(&progress).unwrap();
        assert_eq!(store.load(), progress);
    }
}
