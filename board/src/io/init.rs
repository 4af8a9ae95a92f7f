//! Initialization helpers for `.board/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{BoardConfig, write_config};
use super::store::render_board;
use crate::core::types::{Board, BoardKind};

/// Canonical paths within `.board/` for a project root.
#[derive(Debug, Clone)]
pub struct BoardPaths {
    pub board_dir: PathBuf,
    pub config_path: PathBuf,
}

impl BoardPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let board_dir = root.as_ref().join(".board");
        Self {
            config_path: board_dir.join("config.toml"),
            board_dir,
        }
    }

    /// Location of the board document named by `cfg`.
    pub fn store_path(&self, cfg: &BoardConfig) -> PathBuf {
        self.board_dir.join(&cfg.store_file)
    }
}

/// Options for `init_board`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing board-owned files.
    pub force: bool,
    pub kind: BoardKind,
}

/// Create `.board/` scaffolding in `root`: config plus an empty board.
///
/// Fails if `.board/` already exists unless `options.force` is set.
pub fn init_board(root: &Path, options: &InitOptions) -> Result<BoardPaths> {
    let paths = BoardPaths::new(root);
    if paths.board_dir.exists() && !options.force {
        return Err(anyhow!(
            "board init: .board already exists (use --force to overwrite)"
        ));
    }
    if paths.board_dir.exists() && !paths.board_dir.is_dir() {
        return Err(anyhow!("board init: .board exists but is not a directory"));
    }

    fs::create_dir_all(&paths.board_dir)
        .with_context(|| format!("create directory {}", paths.board_dir.display()))?;

    let cfg = BoardConfig {
        kind: options.kind,
        ..BoardConfig::default()
    };
    write_config(&paths.config_path, &cfg)?;

    let store_path = paths.store_path(&cfg);
    let contents = render_board(&Board::empty(options.kind))?;
    fs::write(&store_path, contents)
        .with_context(|| format!("write {}", store_path.display()))?;

    Ok(paths)
}
