use crate::domain::call::RecordedCall;
use crate::domain::ports::CallStorage;
use anyhow::Result;
use std::sync::{Mutex, PoisonError};

/// In-memory call storage
#[derive(Default)]
pub struct InMemoryCallStorage {
    calls: Mutex<Option<Vec<RecordedCall>>>,
}

impl InMemoryCallStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calls(calls: Vec<RecordedCall>) -> Self {
        Self {
            calls: Mutex::new(Some(calls)),
        }
    }

    /// What was last saved (or seeded).
    pub fn calls(&self) -> Option<Vec<RecordedCall>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CallStorage for InMemoryCallStorage {
    fn load(&self) -> Result<Option<Vec<RecordedCall>>> {
        Ok(self.calls())
    }

    fn save(&self, calls: &[RecordedCall]) -> Result<()> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) = Some(calls.to_vec());
        Ok(())
    }
}
