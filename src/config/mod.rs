//! Build option layering
//!
//! Two layers, lowest precedence first:
//! 1. Build configuration file section (`ios.debug` / `ios.release`)
//! 2. Options given on the command line
//!
//! Command line values win; values the command line leaves unset fall
//! through to the file.

mod file;
mod merge;

pub use file::{BuildConfigFile, FILE_KEYS};
pub use merge::{deep_merge, merge_layers};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};
use crate::options::BuildOptions;

/// Origin of an option layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    File,
    Cli,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Options after layering, with the layers that contributed
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub options: BuildOptions,
    pub sources: Vec<ConfigSource>,
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid build config: {0}")]
    Invalid(String),
}

/// Validate `cli` and layer it over its build configuration file, if any.
///
/// Conflicting options are rejected before the file is touched. A config
/// path that was given but does not exist is fatal.
pub fn resolve_options(cli: BuildOptions) -> BuildResult<ResolvedOptions> {
    cli.validate()?;

    let mut sources = Vec::new();
    let mut options = cli.clone();

    if let Some(path) = &cli.build_config {
        if !path.exists() {
            return Err(BuildError::MissingConfigFile(path.clone()));
        }

        let file = BuildConfigFile::load(path)?;
        sources.push(ConfigSource {
            origin: ConfigOrigin::File,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(file.digest.clone()),
        });

        match file.section(cli.configuration())? {
            Some(section) => {
                let overlay = serde_json::to_value(&cli)
                    .map_err(|e| ConfigError::Parse(e.to_string()))?;
                let merged = merge_layers(vec![section, overlay]);
                options = serde_json::from_value(merged)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
            None => {
                log::debug!(
                    "{} has no ios.{} section",
                    path.display(),
                    cli.configuration().to_lowercase()
                );
            }
        }
    }

    sources.push(ConfigSource {
        origin: ConfigOrigin::Cli,
        path: None,
        digest: None,
    });

    Ok(ResolvedOptions { options, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;
    use xcode_args::BuildFlags;

    fn write_config(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut temp = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(temp, "{}", contents).unwrap();
        temp
    }

    #[test]
    fn test_cli_only() {
        let resolved = resolve_options(BuildOptions {
            device: true,
            ..Default::default()
        })
        .unwrap();

        assert!(resolved.options.device);
        assert_eq!(resolved.sources.len(), 1);
        assert_eq!(resolved.sources[0].origin, ConfigOrigin::Cli);
    }

    #[test]
    fn test_conflict_checked_before_config() {
        let err = resolve_options(BuildOptions {
            debug: true,
            release: true,
            build_config: Some(PathBuf::from("/definitely/not/here.json")),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, BuildError::ConflictingOptions { .. }));
    }

    #[test]
    fn test_missing_config_file() {
        let err = resolve_options(BuildOptions {
            build_config: Some(PathBuf::from("./some/config/path")),
            ..Default::default()
        })
        .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Build config file does not exist:"));
    }

    #[test]
    fn test_file_fills_unset_options() {
        let temp = write_config(
            r#"{
                "ios": {
                    "debug": {
                        "exportOptionsPlist": "debug.plist",
                        "automaticProvisioning": true,
                        "buildFlag": ["A=1"]
                    },
                    "release": {
                        "exportOptionsPlist": "release.plist"
                    }
                }
            }"#,
            ".json",
        );

        let resolved = resolve_options(BuildOptions {
            export_options_plist: Some(PathBuf::from("cli.plist")),
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        let options = resolved.options;
        assert_eq!(options.export_options_plist, Some(PathBuf::from("cli.plist")));
        assert!(options.automatic_provisioning());
        assert_eq!(options.build_flag, Some(BuildFlags::Multiple(vec!["A=1".into()])));

        assert_eq!(resolved.sources.len(), 2);
        assert_eq!(resolved.sources[0].origin, ConfigOrigin::File);
        assert_eq!(resolved.sources[0].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_cli_can_turn_off_automatic_provisioning() {
        let temp = write_config(
            r#"{"ios": {"debug": {"automaticProvisioning": true}}}"#,
            ".json",
        );

        let resolved = resolve_options(BuildOptions {
            automatic_provisioning: Some(false),
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(resolved.options.automatic_provisioning, Some(false));
        assert!(!resolved.options.automatic_provisioning());
    }

    #[test]
    fn test_cli_build_flags_replace_file_flags() {
        let temp = write_config(
            r#"{"ios": {"release": {"buildFlag": ["A=1", "B=2"]}}}"#,
            ".json",
        );

        let resolved = resolve_options(BuildOptions {
            release: true,
            build_flag: Some(BuildFlags::from("-quiet")),
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(resolved.options.build_flag, Some(BuildFlags::from("-quiet")));
        assert!(resolved.options.release);
    }

    #[test]
    fn test_file_cannot_flip_cli_flags() {
        // Keys outside the allowed set are ignored
        let temp = write_config(
            r#"{"ios": {"debug": {"device": true, "release": true}}}"#,
            ".json",
        );

        let resolved = resolve_options(BuildOptions {
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert!(!resolved.options.device);
        assert!(!resolved.options.release);
    }

    #[test]
    fn test_toml_config() {
        let temp = write_config(
            "[ios.debug]\nexportOptionsPlist = \"adhoc.plist\"\nbuildFlag = \"-quiet\"\n",
            ".toml",
        );

        let resolved = resolve_options(BuildOptions {
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            resolved.options.export_options_plist,
            Some(PathBuf::from("adhoc.plist"))
        );
        assert_eq!(resolved.options.build_flag, Some(BuildFlags::from("-quiet")));
    }

    #[test]
    fn test_malformed_config() {
        let temp = write_config("{ not json", ".json");

        let err = resolve_options(BuildOptions {
            build_config: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, BuildError::Config(ConfigError::Parse(_))));
    }
}
