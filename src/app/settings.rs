use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Process-wide defaults for a [`Faker`](crate::app::faker::Faker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakerSettings {
    /// Calls listed in an assertion failure before the rest are summarized.
    pub max_displayed_calls: usize,
    /// Show runs of identical consecutive calls as one line.
    pub collapse_repeated_calls: bool,
    /// Create strict fakes unless the options say otherwise.
    pub strict_by_default: bool,
}

impl Default for FakerSettings {
    fn default() -> Self {
        Self {
            max_displayed_calls: 19,
            collapse_repeated_calls: true,
            strict_by_default: false,
        }
    }
}

impl FakerSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_settings_use_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "strict_by_default": true }"#).unwrap();
        let settings = FakerSettings::load(file.path()).unwrap();
        assert!(settings.strict_by_default);
        assert_eq!(settings.max_displayed_calls, 19);
        assert!(settings.collapse_repeated_calls);
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let err = FakerSettings::load(Path::new("/nonexistent/fakecall.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
