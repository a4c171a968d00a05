use anyhow::{bail, Context, Result};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

pub fn read_seed_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data =
        read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let seeds: Vec<String> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if seeds.iter().any(|seed| seed.trim().is_empty()) {
        bail!("{} contains an empty query id", path.display());
    }
    Ok(seeds)
}

/// Flat bearer cache, rewritten wholesale after every acquisition batch.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing or unreadable cache is treated as empty.
    pub fn load(&self) -> Vec<Option<String>> {
        let data = match read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&data) {
            Ok(tokens) => tokens,
            Err(err) => {
                log::warn!("Ignoring malformed {}: {}", self.path.display(), err);
                Vec::new()
            }
        }
    }

    pub fn save(&self, tokens: &[Option<String>]) -> Result<()> {
        let data = serde_json::to_string_pretty(tokens)?;
        write(&self.path, data.as_bytes())
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
