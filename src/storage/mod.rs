// Alert state persistence
pub mod json_file;

pub use json_file::{AlertStateRecord, JsonFileStore};

use anyhow::Result;
use std::sync::Mutex;

use crate::alerts::state::AlertState;

/// Durable home of the alert dedup state.
///
/// `load` never fails: a missing or unreadable record yields the default
/// state. `save` writes the whole state, last writer wins.
pub trait StateStore: Send + Sync {
    fn load(&self) -> AlertState;
    fn save(&self, state: &AlertState) -> Result<()>;
}

/// In-process store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<AlertState>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AlertState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    /// Last saved state, if any
    pub fn snapshot(&self) -> Option<AlertState> {
        self.state.lock().ok().and_then(|state| state.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|saves| *saves).unwrap_or(0)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> AlertState {
        self.snapshot().unwrap_or_default()
    }

    fn save(&self, state: &AlertState) -> Result<()> {
        let mut slot = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("State lock poisoned"))?;
        *slot = Some(state.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), AlertState::default());
        assert!(store.snapshot().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_memory_store_keeps_last_write() {
        let store = MemoryStore::new();
        let mut state = AlertState::default();
        state.five_hour.alerted_thresholds.insert(75);
        store.save(&state).unwrap();

        state.auth_error_alerted = true;
        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
        assert_eq!(store.save_count(), 2);
    }
}
