use std::io::Write as _;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AutosaveError, AutosaveResult};
use crate::storage::Storage;

const FILE_SUFFIX: &str = ".json";
const TEMP_MARKER: &str = ".tmp.";

/// One JSON file per key under a root directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn build_path(&self, key: &str) -> AutosaveResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}{FILE_SUFFIX}")))
    }

    fn ensure_root(&self) -> AutosaveResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|error| {
            tracing::debug!("failed to create storage directory {}: {error}", self.root.display());
            AutosaveError::Unavailable(self.root.clone())
        })
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> AutosaveResult<Option<String>> {
        let path = self.build_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> AutosaveResult<()> {
        let path = self.build_path(key)?;
        self.ensure_root()?;

        let temp_path = self
            .root
            .join(format!("{key}{FILE_SUFFIX}{TEMP_MARKER}{}", Uuid::new_v4()));
        let written = write_synced(&temp_path, value).and_then(|()| {
            std::fs::rename(&temp_path, &path)?;
            Ok(())
        });
        if written.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        written
    }

    fn remove(&self, key: &str) -> AutosaveResult<()> {
        let path = self.build_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn keys(&self) -> AutosaveResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.contains(TEMP_MARKER) {
                continue;
            }
            if let Some(key) = name.strip_suffix(FILE_SUFFIX) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }
}

fn write_synced(path: &Path, value: &str) -> AutosaveResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn validate_key(key: &str) -> AutosaveResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(AutosaveError::InvalidKey(key.to_string()));
    }
    if key.contains('/') || key.contains('\\') || key.contains('\0') {
        return Err(AutosaveError::InvalidKey(key.to_string()));
    }
    Ok(())
}
