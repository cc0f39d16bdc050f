// File-backed store for builder boards, one JSON document per `dashboard-<name>` key
use crate::domain::board::Board;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KEY_PREFIX: &str = "dashboard-";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("board name {0:?} cannot be used as a storage key")]
    InvalidName(String),
    #[error("no saved board under {0}")]
    NotFound(String),
    #[error("saved board {key} is malformed")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("board store i/o failed for {key}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct BoardStore {
    dir: PathBuf,
}

impl BoardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(name: &str) -> String {
        format!("{KEY_PREFIX}{name}")
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let invalid = name.trim().is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == "..";
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", Self::key(name))))
    }

    /// Write the board under its own name, replacing any previous save.
    pub fn save(&self, board: &Board) -> Result<(), StoreError> {
        let key = Self::key(&board.name);
        let path = self.path_for(&board.name)?;
        let io = |source| StoreError::Io {
            key: key.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io)?;
        let json = serde_json::to_vec_pretty(board).map_err(|source| StoreError::Malformed {
            key: key.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io)?;
        tracing::debug!(key = %key, cards = board.cards.len(), "saved board");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Board, StoreError> {
        let key = Self::key(name);
        let path = self.path_for(name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(key)),
            Err(source) => return Err(StoreError::Io { key, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed { key, source })
    }

    /// Names of every saved board, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    key: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let file_name = entry.file_name().into_string().ok()?;
                let name = file_name.strip_prefix(KEY_PREFIX)?.strip_suffix(".json")?;
                Some(name.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_for(name)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                key: Self::key(name),
                source,
            }),
        }
    }
}
