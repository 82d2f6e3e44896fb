//! Argument list composition for xcodebuild
//!
//! Output order is fixed; xcodebuild is sensitive to it for some flag
//! combinations.
//!
//! Device:
//! `-xcconfig -workspace -scheme -configuration -destination -archivePath
//!  [-allowProvisioningUpdates] archive CONFIGURATION_BUILD_DIR=
//!  SHARED_PRECOMPS_DIR= <other flags>`
//!
//! Simulator:
//! `-xcconfig -workspace -scheme -configuration -sdk -destination build
//!  CONFIGURATION_BUILD_DIR= SHARED_PRECOMPS_DIR= <other flags>`

use std::path::Path;

use thiserror::Error;

use crate::flags::{BuildFlags, FlagOverrides};

/// Action token for device builds
pub const ACTION_ARCHIVE: &str = "archive";
/// Action token for simulator builds
pub const ACTION_BUILD: &str = "build";
/// Destination used for every device build unless overridden
pub const DEVICE_DESTINATION: &str = "generic/platform=iOS";
/// SDK used for simulator builds unless overridden
pub const SIMULATOR_SDK: &str = "iphonesimulator";
/// Lets xcodebuild manage signing assets on its own
pub const ALLOW_PROVISIONING_UPDATES: &str = "-allowProvisioningUpdates";

/// Errors composing an argument list
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    /// Simulator build with neither a target name nor a destination override
    #[error("simulator build requires a target name or a -destination build flag")]
    MissingSimulatorTarget,
}

/// Inputs for the archive (device) or build (simulator) invocation
#[derive(Debug, Clone)]
pub struct BuildArgsRequest<'a> {
    /// Project base name, without extension
    pub project_name: &'a str,
    /// Platform project root
    pub project_path: &'a Path,
    /// Configuration name, e.g. "Debug"
    pub configuration: &'a str,
    pub is_device: bool,
    pub build_flags: Option<&'a BuildFlags>,
    /// Simulator display name, e.g. "iPhone 15"
    pub simulator_target: Option<&'a str>,
    pub automatic_provisioning: bool,
    /// Directory holding the generated `build-<configuration>.xcconfig` files
    pub xcconfig_dir: &'a Path,
}

/// Inputs for the `-exportArchive` invocation
#[derive(Debug, Clone)]
pub struct ExportArgsRequest<'a> {
    pub project_name: &'a str,
    pub export_path: &'a Path,
    pub export_options_plist: &'a Path,
    pub automatic_provisioning: bool,
}

/// Compose the arguments for the archive/build step.
///
/// User build flags are parsed in order; a known flag replaces its computed
/// default at the same position, and everything else is appended at the end.
pub fn compose_build_args(request: &BuildArgsRequest<'_>) -> Result<Vec<String>, ComposeError> {
    let overrides = FlagOverrides::from_build_flags(request.build_flags);
    let project_name = request.project_name;

    let xcconfig = overrides.xcconfig.clone().unwrap_or_else(|| {
        path_string(&request.xcconfig_dir.join(format!(
            "build-{}.xcconfig",
            request.configuration.to_lowercase()
        )))
    });
    let workspace = overrides
        .workspace
        .clone()
        .unwrap_or_else(|| format!("{}.xcworkspace", project_name));
    let scheme = overrides
        .scheme
        .clone()
        .unwrap_or_else(|| project_name.to_string());
    let configuration = overrides
        .configuration
        .clone()
        .unwrap_or_else(|| request.configuration.to_string());

    let build_subdir = if request.is_device { "device" } else { "emulator" };
    let configuration_build_dir = overrides.configuration_build_dir.clone().unwrap_or_else(|| {
        format!(
            "CONFIGURATION_BUILD_DIR={}",
            path_string(&request.project_path.join("build").join(build_subdir))
        )
    });
    let shared_precomps_dir = overrides.shared_precomps_dir.clone().unwrap_or_else(|| {
        format!(
            "SHARED_PRECOMPS_DIR={}",
            path_string(&request.project_path.join("build").join("sharedpch"))
        )
    });

    let mut args = vec![
        "-xcconfig".to_string(),
        xcconfig,
        "-workspace".to_string(),
        workspace,
        "-scheme".to_string(),
        scheme,
        "-configuration".to_string(),
        configuration,
    ];

    if request.is_device {
        let destination = overrides
            .destination
            .clone()
            .unwrap_or_else(|| DEVICE_DESTINATION.to_string());
        let archive_path = overrides
            .archive_path
            .clone()
            .unwrap_or_else(|| archive_name(project_name));

        args.extend([
            "-destination".to_string(),
            destination,
            "-archivePath".to_string(),
            archive_path,
        ]);
        if request.automatic_provisioning {
            args.push(ALLOW_PROVISIONING_UPDATES.to_string());
        }
        args.push(ACTION_ARCHIVE.to_string());
    } else {
        let sdk = overrides
            .sdk
            .clone()
            .unwrap_or_else(|| SIMULATOR_SDK.to_string());
        let destination = match (&overrides.destination, request.simulator_target) {
            (Some(destination), _) => destination.clone(),
            (None, Some(target)) => format!("platform=iOS Simulator,name={}", target),
            (None, None) => return Err(ComposeError::MissingSimulatorTarget),
        };

        args.extend([
            "-sdk".to_string(),
            sdk,
            "-destination".to_string(),
            destination,
        ]);
        args.push(ACTION_BUILD.to_string());
    }

    args.push(configuration_build_dir);
    args.push(shared_precomps_dir);

    // A known flag that has no slot on this branch (-sdk on device,
    // -archivePath on simulator) is passed through after everything else.
    if request.is_device {
        if let Some(sdk) = overrides.sdk {
            args.extend(["-sdk".to_string(), sdk]);
        }
    } else if let Some(archive_path) = overrides.archive_path {
        args.extend(["-archivePath".to_string(), archive_path]);
    }

    args.extend(overrides.other_flags);

    Ok(args)
}

/// Compose the arguments for the `-exportArchive` step.
pub fn compose_export_args(request: &ExportArgsRequest<'_>) -> Vec<String> {
    let mut args = vec![
        "-exportArchive".to_string(),
        "-archivePath".to_string(),
        archive_name(request.project_name),
        "-exportOptionsPlist".to_string(),
        path_string(request.export_options_plist),
        "-exportPath".to_string(),
        path_string(request.export_path),
    ];

    if request.automatic_provisioning {
        args.push(ALLOW_PROVISIONING_UPDATES.to_string());
    }

    args
}

fn archive_name(project_name: &str) -> String {
    format!("{}.xcarchive", project_name)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
