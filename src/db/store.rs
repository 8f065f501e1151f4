use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

/// Synchronous key-value substrate backing the hero cache slot
///
/// Implementations only need "missing key" semantics on `get` and overwrite
/// semantics on `set`.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Process-local store, used when no Redis URL is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|e| AppError::Internal(format!("Memory store poisoned: {}", e)))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| AppError::Internal(format!("Memory store poisoned: {}", e)))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
