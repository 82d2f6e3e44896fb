//! Build configuration file loading
//!
//! The file is JSON (`build.json`) or TOML (`*.toml`) shaped as
//! `{ "ios": { "debug": {...}, "release": {...} } }`.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::ConfigError;

/// Keys a file section may supply
pub const FILE_KEYS: &[&str] = &["buildFlag", "automaticProvisioning", "exportOptionsPlist"];

/// Signing keys some build configs carry. Signing is configured through the
/// export options plist, so these are dropped with a warning.
pub const SIGNING_KEYS: &[&str] = &[
    "codeSignIdentity",
    "provisioningProfile",
    "developmentTeam",
    "packageType",
];

/// A parsed build configuration file
#[derive(Debug, Clone)]
pub struct BuildConfigFile {
    pub path: PathBuf,
    /// SHA-256 of the raw bytes, hex encoded
    pub digest: String,
    root: Value,
}

impl BuildConfigFile {
    /// Read and parse the file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let root = if is_toml {
            let value: toml::Value = toml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;
            serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))?
        };

        if !root.is_object() {
            return Err(ConfigError::Invalid(format!(
                "{} must contain an object at the top level",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            digest,
            root,
        })
    }

    /// The `ios.<configuration>` section, limited to [`FILE_KEYS`].
    ///
    /// Returns `Ok(None)` when the file has no such section.
    pub fn section(&self, configuration: &str) -> Result<Option<Value>, ConfigError> {
        let name = configuration.to_lowercase();
        let Some(section) = self.root.get("ios").and_then(|ios| ios.get(&name)) else {
            return Ok(None);
        };

        let Value::Object(entries) = section else {
            return Err(ConfigError::Invalid(format!(
                "ios.{} in {} must be an object",
                name,
                self.path.display()
            )));
        };

        let filtered: Map<String, Value> = entries
            .iter()
            .filter(|(key, _)| {
                let known = FILE_KEYS.contains(&key.as_str());
                if SIGNING_KEYS.contains(&key.as_str()) {
                    log::warn!(
                        "Ignoring ios.{}.{} from build config; set signing in the export options plist",
                        name,
                        key
                    );
                } else if !known {
                    log::debug!("Ignoring ios.{}.{} from build config", name, key);
                }
                known
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Some(Value::Object(filtered)))
    }
}
