//! Build options
//!
//! A flat options record as received from the command line or an embedding
//! tool. Field names serialize in camelCase so they line up with the keys of
//! a build configuration file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use xcode_args::BuildFlags;

use crate::error::{BuildError, BuildResult};

/// Configuration name used unless `release` is set
pub const DEBUG_CONFIGURATION: &str = "Debug";
/// Configuration name used for release builds
pub const RELEASE_CONFIGURATION: &str = "Release";

/// Options for one build invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub release: bool,

    /// Build for a physical device (archive + export)
    #[serde(default, skip_serializing_if = "is_false")]
    pub device: bool,

    /// Build for the simulator
    #[serde(default, skip_serializing_if = "is_false")]
    pub emulator: bool,

    /// Simulator name to build for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// `None` means "not specified" so a config file value can apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_provisioning: Option<bool>,

    /// Extra xcodebuild flags, one string or a list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_flag: Option<BuildFlags>,

    /// Path to a build configuration file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_config: Option<PathBuf>,

    /// Export options plist for the archive export step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_options_plist: Option<PathBuf>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl BuildOptions {
    /// Reject mutually exclusive option pairs.
    pub fn validate(&self) -> BuildResult<()> {
        if self.debug && self.release {
            return Err(BuildError::ConflictingOptions {
                first: "debug",
                second: "release",
            });
        }

        if self.device && self.emulator {
            return Err(BuildError::ConflictingOptions {
                first: "device",
                second: "emulator",
            });
        }

        Ok(())
    }

    /// Xcode configuration name
    pub fn configuration(&self) -> &'static str {
        if self.release {
            RELEASE_CONFIGURATION
        } else {
            DEBUG_CONFIGURATION
        }
    }

    /// Device builds archive; everything else builds for the simulator
    pub fn is_device(&self) -> bool {
        self.device
    }

    pub fn automatic_provisioning(&self) -> bool {
        self.automatic_provisioning.unwrap_or(false)
    }
}
