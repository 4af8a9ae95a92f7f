//! Board configuration stored under `.board/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::collision::ActivationConstraint;
use crate::core::types::BoardKind;

/// Board configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// the brands CRM layout backed by `.board/board.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoardConfig {
    /// Column layout of the board.
    pub kind: BoardKind,

    /// Board document, relative to `.board/`.
    pub store_file: String,

    /// Pointer travel in pixels before a press on a card becomes a drag.
    pub activation_distance_px: u32,

    /// Poll interval of the store watcher used by `board-ui`.
    pub watch_interval_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            kind: BoardKind::BrandsCrm,
            store_file: "board.json".to_string(),
            activation_distance_px: 8,
            watch_interval_ms: 250,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store_file.trim().is_empty() {
            return Err(anyhow!("store_file must be non-empty"));
        }
        if self.activation_distance_px == 0 {
            return Err(anyhow!("activation_distance_px must be > 0"));
        }
        if self.watch_interval_ms == 0 {
            return Err(anyhow!("watch_interval_ms must be > 0"));
        }
        Ok(())
    }

    pub fn activation(&self) -> ActivationConstraint {
        ActivationConstraint::distance(f64::from(self.activation_distance_px))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BoardConfig::default()`.
pub fn load_config(path: &Path) -> Result<BoardConfig> {
    if !path.exists() {
        let cfg = BoardConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BoardConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BoardConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
