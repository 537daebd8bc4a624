//! Save slots as pretty-printed JSON files in a directory.
use derby_game::{SaveSnapshot, SaveStore};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("invalid save slot name '{0}'")]
    InvalidSlot(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed save {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, save_name: &str) -> Result<PathBuf, FileStoreError> {
        let valid = !save_name.is_empty()
            && save_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(FileStoreError::InvalidSlot(save_name.to_string()));
        }
        Ok(self.dir.join(format!("{save_name}.json")))
    }
}

impl SaveStore for JsonFileStore {
    type Error = FileStoreError;

    fn save_game(&self, save_name: &str, snapshot: &SaveSnapshot) -> Result<(), Self::Error> {
        let path = self.slot_path(save_name)?;
        fs::create_dir_all(&self.dir).map_err(|source| FileStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let payload = serde_json::to_vec_pretty(snapshot).map_err(|source| FileStoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, payload).map_err(|source| FileStoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("wrote save {}", path.display());
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<SaveSnapshot>, Self::Error> {
        let path = self.slot_path(save_name)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FileStoreError::Io { path, source }),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| FileStoreError::Json { path, source })
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(save_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileStoreError::Io { path, source }),
        }
    }
}
