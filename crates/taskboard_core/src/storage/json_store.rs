use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 1;
pub const STORE_ENV_VAR: &str = "TASKBOARD_STORE_PATH";
const STORE_FILE_NAME: &str = "store.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Directory holding the store and config files.
pub fn data_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskboard"))
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(data_dir()?.join(STORE_FILE_NAME))
}

/// Key-value store kept in a single JSON document. The file is read on
/// every access and each write replaces only its own key, so several
/// processes can share one store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let entries = load_entries(path)?;
        debug!(path = %path.display(), entries = entries.len(), "opened store");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn open_default() -> Result<Self, AppError> {
        let path = store_path()?;
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(load_entries(&self.path)?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = load_entries(&self.path)?;
        entries.insert(key.to_string(), value.to_string());
        save_entries(&self.path, &entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        let mut entries = load_entries(&self.path)?;
        if entries.remove(key).is_some() {
            save_entries(&self.path, &entries)?;
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let stored: StoredEntries = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.entries)
}

/// Writes to a sibling temp file and renames it over `path`, so readers never
/// see a half-written document.
fn save_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredEntries {
        schema_version: SCHEMA_VERSION,
        entries: entries.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)?;
    let staging = path.with_extension(format!("tmp-{}", std::process::id()));
    std::fs::write(&staging, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&staging, permissions)
            .map_err(|err| AppError::io(err.to_string()))?;
    }

    std::fs::rename(&staging, path).map_err(|err| AppError::io(err.to_string()))
}
