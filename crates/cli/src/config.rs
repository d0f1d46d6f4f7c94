use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Optional TOML run configuration. Command-line flags take precedence
/// over every field.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    /// SQLite database to reconcile.
    #[serde(default)]
    pub db: Option<PathBuf>,
    /// Link prefix for --enumerate output.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| format!("cannot parse {}: {e}", path.display()))
    }
}
