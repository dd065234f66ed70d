use crate::domain::call::RecordedCall;
use crate::domain::ports::CallStorage;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Call storage backed by a JSON file
pub struct JsonFileCallStorage {
    pub path: PathBuf,
}

impl JsonFileCallStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CallStorage for JsonFileCallStorage {
    fn load(&self) -> Result<Option<Vec<RecordedCall>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read call recording: {}", self.path.display()))?;
        let calls = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse call recording: {}", self.path.display()))?;
        Ok(Some(calls))
    }

    fn save(&self, calls: &[RecordedCall]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(calls).context("Failed to serialize calls")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write call recording: {}", self.path.display()))
    }
}
