use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Preference key for the selected model id.
pub const MODEL_KEY: &str = "selected_model";

/// Preference key for the API base URL.
pub const API_URL_KEY: &str = "api_url";

/// Opaque string-keyed preference storage.
///
/// The rest of the crate only ever reads and writes whole string values, so
/// the backend stays swappable (a temp file in tests, the real config file in
/// the binary).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON-file backed store under the platform config directory.
///
/// Each operation re-reads the file, so sequential access from a single
/// process stays consistent without holding anything open.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default location, e.g. `~/.config/lmchat/settings.json`.
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self::new(config_dir.join("lmchat").join("settings.json")))
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.remove(key);
        self.write_map(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_reads_as_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get(API_URL_KEY).unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips_verbatim() {
        let (_dir, store) = temp_store();
        store.set(API_URL_KEY, "http://192.168.1.50:1234").unwrap();
        assert_eq!(
            store.get(API_URL_KEY).unwrap().as_deref(),
            Some("http://192.168.1.50:1234")
        );
    }

    #[test]
    fn keys_are_independent() {
        let (_dir, store) = temp_store();
        store.set(MODEL_KEY, "llama-3.2-3b").unwrap();
        store.set(API_URL_KEY, "http://10.0.0.2:1234").unwrap();
        store.remove(API_URL_KEY).unwrap();
        assert_eq!(store.get(MODEL_KEY).unwrap().as_deref(), Some("llama-3.2-3b"));
        assert_eq!(store.get(API_URL_KEY).unwrap(), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let (_dir, store) = temp_store();
        store.set(MODEL_KEY, "first").unwrap();
        store.set(MODEL_KEY, "second").unwrap();
        assert_eq!(store.get(MODEL_KEY).unwrap().as_deref(), Some("second"));
    }
}
