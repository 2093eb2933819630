// Configuration resolver
// ----------------------
// Produces the base URL, API key and default expiry for one invocation.
//
// Resolution order (highest first):
// 1. Explicit command-line flag (`--api-key`, `--api-url`)
// 2. Environment variable (`OX45_API_KEY`, `OX45_API_URL`)
// 3. YAML config file (`~/.0x45.yaml`, or `<config dir>/0x45/config.yaml`)
// 4. Built-in defaults
//
// Layers 1 and 2 are both resolved by clap (`#[arg(env = ...)]`) and arrive
// here as `Overrides`. The file layer is the only one `set`/`unset` touch.

use crate::error::{ClientError, Result};
use crate::expiry;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://0x45.st";
pub const API_KEY_ENV: &str = "OX45_API_KEY";
pub const API_URL_ENV: &str = "OX45_API_URL";

const DOTFILE_NAME: &str = ".0x45.yaml";

/// Keys recognised in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigKey {
    ApiUrl,
    ApiKey,
    DefaultExpiry,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [ConfigKey::ApiKey, ConfigKey::ApiUrl, ConfigKey::DefaultExpiry];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "api_url",
            ConfigKey::ApiKey => "api_key",
            ConfigKey::DefaultExpiry => "default_expiry",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                ClientError::Validation(format!(
                    "unknown config key '{}' (expected one of: api_key, api_url, default_expiry)",
                    s
                ))
            })
    }
}

/// On-disk shape of the config file. Unset keys are left out when written.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, deserialize_with = "scalar", skip_serializing_if = "Option::is_none")]
    pub default_expiry: Option<String>,
}

/// Hand-edited files may hold unquoted numbers or booleans; read any
/// scalar as its string form.
fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    use serde_yaml::Value;
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(D::Error::custom("expected a single value")),
    }
}

impl ConfigFile {
    fn slot(&self, key: ConfigKey) -> &Option<String> {
        match key {
            ConfigKey::ApiUrl => &self.api_url,
            ConfigKey::ApiKey => &self.api_key,
            ConfigKey::DefaultExpiry => &self.default_expiry,
        }
    }

    fn slot_mut(&mut self, key: ConfigKey) -> &mut Option<String> {
        match key {
            ConfigKey::ApiUrl => &mut self.api_url,
            ConfigKey::ApiKey => &mut self.api_key,
            ConfigKey::DefaultExpiry => &mut self.default_expiry,
        }
    }
}

/// Values supplied by flag or environment. They shadow the file but are
/// never written back to it.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

/// The resolved configuration for one invocation. Built once in `main` and
/// passed by reference to every command handler.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    file: ConfigFile,
    overrides: Overrides,
}

impl Settings {
    /// Load settings from `explicit` if given, otherwise from the first
    /// existing conventional location.
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };
        Self::load_from(path, overrides)
    }

    /// Load settings from a specific file. A missing file is not an error:
    /// the file layer is simply empty until the first `set`.
    pub fn load_from(path: PathBuf, overrides: Overrides) -> Result<Self> {
        let file = if path.is_file() {
            let data = std::fs::read_to_string(&path).map_err(|source| ClientError::Io {
                path: path.clone(),
                source,
            })?;
            if data.trim().is_empty() {
                ConfigFile::default()
            } else {
                serde_yaml::from_str(&data).map_err(|e| {
                    warn!(path = %path.display(), "config file is not valid YAML");
                    ClientError::Configuration(format!(
                        "reading config file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            }
        } else {
            ConfigFile::default()
        };
        debug!(path = %path.display(), exists = path.is_file(), "using config file");
        Ok(Settings { path, file, overrides })
    }

    /// Path the file layer is read from and written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a key by name. Unknown or unset keys report `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        key.parse::<ConfigKey>().ok().and_then(|k| self.resolve(k))
    }

    pub fn resolve(&self, key: ConfigKey) -> Option<String> {
        let overridden = match key {
            ConfigKey::ApiKey => self.overrides.api_key.as_deref(),
            ConfigKey::ApiUrl => self.overrides.api_url.as_deref(),
            ConfigKey::DefaultExpiry => None,
        };
        let present = |v: &&str| !v.trim().is_empty();
        overridden
            .filter(present)
            .or_else(|| self.file.slot(key).as_deref().filter(present))
            .map(str::to_string)
            .or_else(|| match key {
                ConfigKey::ApiUrl => Some(DEFAULT_API_URL.to_string()),
                _ => None,
            })
    }

    pub fn api_url(&self) -> String {
        self.resolve(ConfigKey::ApiUrl)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn api_key(&self) -> Option<String> {
        self.resolve(ConfigKey::ApiKey)
    }

    pub fn default_expiry(&self) -> Option<String> {
        self.resolve(ConfigKey::DefaultExpiry)
    }

    /// Validate and store `value` under `key`, then persist the whole file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key: ConfigKey = key.parse()?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ClientError::Validation(format!("value for '{}' must not be empty", key)));
        }
        match key {
            ConfigKey::ApiUrl => {
                reqwest::Url::parse(value).map_err(|e| {
                    ClientError::Validation(format!("invalid api_url '{}': {}", value, e))
                })?;
            }
            ConfigKey::DefaultExpiry => {
                expiry::parse(value)?;
            }
            ConfigKey::ApiKey => {}
        }
        *self.file.slot_mut(key) = Some(value.to_string());
        self.save()
    }

    /// Remove `key` from the file. Returns `false` when it was never set,
    /// leaving the file untouched.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        let Ok(key) = key.parse::<ConfigKey>() else {
            return Ok(false);
        };
        if self.file.slot_mut(key).take().is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// All resolved key/value pairs, in display order.
    pub fn list(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::ALL
            .into_iter()
            .filter_map(|k| self.resolve(k).map(|v| (k, v)))
            .collect()
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ClientError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let data = serde_yaml::to_string(&self.file)
            .map_err(|e| ClientError::Configuration(format!("encoding config: {}", e)))?;
        std::fs::write(&self.path, data).map_err(|source| ClientError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "config written");
        Ok(())
    }
}

/// `~/.0x45.yaml` if present, else `<config dir>/0x45/config.yaml` if
/// present, else `~/.0x45.yaml` (to be created on first write).
fn default_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let dotfile = home.join(DOTFILE_NAME);
    let nested = dirs::config_dir().map(|d| d.join("0x45").join("config.yaml"));
    [Some(dotfile.clone()), nested]
        .into_iter()
        .flatten()
        .find(|p| p.is_file())
        .unwrap_or(dotfile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        Settings::load_from(dir.path().join("config.yaml"), Overrides::default()).unwrap()
    }

    #[test]
    fn defaults_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);
        assert_eq!(settings.api_url(), DEFAULT_API_URL);
        assert_eq!(settings.api_key(), None);
        assert_eq!(settings.get("default_expiry"), None);
        assert!(!settings.path().exists());
    }

    #[test]
    fn set_get_unset_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);

        settings.set("default_expiry", "7d").unwrap();
        assert_eq!(settings.get("default_expiry").as_deref(), Some("7d"));

        assert!(settings.unset("default_expiry").unwrap());
        assert_eq!(settings.get("default_expiry"), None);
    }

    #[test]
    fn set_persists_to_disk_and_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.yaml");
        let mut settings = Settings::load_from(path.clone(), Overrides::default()).unwrap();
        settings.set("api_key", "secret").unwrap();

        let reloaded = Settings::load_from(path, Overrides::default()).unwrap();
        assert_eq!(reloaded.api_key().as_deref(), Some("secret"));
    }

    #[test]
    fn written_file_omits_unset_keys() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        settings.set("api_key", "secret").unwrap();

        let text = std::fs::read_to_string(settings.path()).unwrap();
        assert!(text.contains("api_key: secret"));
        assert!(!text.contains("default_expiry"));
    }

    #[test]
    fn unset_of_missing_key_reports_false() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        assert!(!settings.unset("default_expiry").unwrap());
        assert!(!settings.unset("no_such_key").unwrap());
        assert!(!settings.path().exists());
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        assert!(matches!(settings.set("colour", "blue"), Err(ClientError::Validation(_))));
        assert!(matches!(settings.set("api_url", "not a url"), Err(ClientError::Validation(_))));
        assert!(matches!(settings.set("default_expiry", "later"), Err(ClientError::Validation(_))));
        assert!(matches!(settings.set("api_key", "  "), Err(ClientError::Validation(_))));
    }

    #[test]
    fn overrides_shadow_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_key: from-file\napi_url: https://file.example\n").unwrap();

        let settings = Settings::load_from(
            path,
            Overrides {
                api_key: Some("from-flag".into()),
                api_url: None,
            },
        )
        .unwrap();
        assert_eq!(settings.api_key().as_deref(), Some("from-flag"));
        assert_eq!(settings.api_url(), "https://file.example");
    }

    #[test]
    fn list_includes_default_url_and_only_set_keys() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        settings.set("default_expiry", "24h").unwrap();

        let pairs = settings.list();
        assert_eq!(
            pairs,
            vec![
                (ConfigKey::ApiUrl, DEFAULT_API_URL.to_string()),
                (ConfigKey::DefaultExpiry, "24h".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_values_are_read_as_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_key: 123456\n").unwrap();
        let settings = Settings::load_from(path, Overrides::default()).unwrap();
        assert_eq!(settings.api_key().as_deref(), Some("123456"));
    }

    #[test]
    fn malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_key: [unterminated\n").unwrap();
        let err = Settings::load_from(path, Overrides::default()).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }
}
