//! Remembered installation folder
//!
//! On Windows the value lives in the per-user environment
//! (`HKCU\Environment`), so it shows up as a regular user environment
//! variable. Other targets keep a small TOML file next to the configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::patch::error::PatchError;

/// Key/value store that survives across runs
pub trait SettingStore {
    /// `Ok(None)` when the key has never been set
    fn get(&self, key: &str) -> Result<Option<String>, PatchError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PatchError>;
}

impl<T: SettingStore + ?Sized> SettingStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, PatchError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PatchError> {
        (**self).set(key, value)
    }
}

impl<T: SettingStore + ?Sized> SettingStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, PatchError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PatchError> {
        (**self).set(key, value)
    }
}

/// Store used by the binary on the current platform
pub fn platform_store() -> Result<Box<dyn SettingStore>, PatchError> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            Ok(Box::new(UserEnvironment))
        } else {
            let path = dirs::config_dir()
                .ok_or_else(|| PatchError::Persistence {
                    key: "settings".to_string(),
                    reason: "could not determine config directory".to_string(),
                })?
                .join("hsa-patcher")
                .join("settings.toml");
            Ok(Box::new(FileStore::new(path)))
        }
    }
}

/// Per-user environment variables in the registry
#[cfg(target_os = "windows")]
pub struct UserEnvironment;

#[cfg(target_os = "windows")]
impl SettingStore for UserEnvironment {
    fn get(&self, key: &str) -> Result<Option<String>, PatchError> {
        use std::io::ErrorKind;
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let env = match hkcu.open_subkey_with_flags("Environment", KEY_READ) {
            Ok(env) => env,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence_error(key, e)),
        };

        match env.get_value::<String, _>(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PatchError> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let (env, _) = hkcu
            .create_subkey("Environment")
            .map_err(|e| persistence_error(key, e))?;
        env.set_value(key, &value)
            .map_err(|e| persistence_error(key, e))
    }
}

/// TOML file holding string values
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>, PatchError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => toml::from_str(&raw).map_err(|e| persistence_error(key, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(persistence_error(key, e)),
        }
    }
}

impl SettingStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PatchError> {
        Ok(self.read_all(key)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PatchError> {
        let mut values = self.read_all(key)?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| persistence_error(key, e))?;
        }
        let raw = toml::to_string(&values).map_err(|e| persistence_error(key, e))?;
        fs::write(&self.path, raw).map_err(|e| persistence_error(key, e))
    }
}

fn persistence_error(key: &str, e: impl std::fmt::Display) -> PatchError {
    PatchError::Persistence {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state").join("settings.toml"));

        assert_eq!(store.get("HEARTHSTONE_HOME").unwrap(), None);

        store.set("OTHER", "x").unwrap();
        store.set("HEARTHSTONE_HOME", r"D:\Games\Hearthstone").unwrap();

        assert_eq!(
            store.get("HEARTHSTONE_HOME").unwrap().as_deref(),
            Some(r"D:\Games\Hearthstone")
        );
        assert_eq!(store.get("OTHER").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let err = FileStore::new(path).get("HEARTHSTONE_HOME").unwrap_err();
        assert!(matches!(err, PatchError::Persistence { .. }));
    }
}
