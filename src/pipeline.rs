//! Build pipeline
//!
//! Planning resolves everything the build needs (options, project, simulator
//! target, argument lists) without running xcodebuild. Running executes the
//! planned invocations in order and stops at the first failure.
//!
//! Device builds archive and then export the archive. Simulator builds run
//! a single `build`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use xcode_args::{
    compose_build_args, compose_export_args, BuildArgsRequest, ExportArgsRequest, FlagOverrides,
};

use crate::config::{resolve_options, ConfigSource};
use crate::error::BuildResult;
use crate::options::BuildOptions;
use crate::project::find_xcode_project_in;
use crate::runner::ToolRunner;
use crate::simulator::{default_simulator_target, list_device_types, SimulatorError};

/// The build tool
pub const XCODEBUILD: &str = "xcodebuild";

/// Directory under the project root holding `build-<configuration>.xcconfig`
pub const DEFAULT_XCCONFIG_SUBDIR: &str = "cordova";

/// Export options plist looked up in the project root when none is configured
pub const DEFAULT_EXPORT_OPTIONS_PLIST: &str = "exportOptions.plist";

/// What to build and where
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub options: BuildOptions,
    /// Platform project root containing the `.xcodeproj`
    pub project_path: PathBuf,
    /// Overrides `<project_path>/cordova`
    pub xcconfig_dir: Option<PathBuf>,
    /// Export the archive after a device build
    pub export: bool,
}

impl BuildRequest {
    pub fn new(project_path: impl Into<PathBuf>, options: BuildOptions) -> Self {
        Self {
            options,
            project_path: project_path.into(),
            xcconfig_dir: None,
            export: true,
        }
    }
}

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Everything resolved for a build, ready to run
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub project_name: String,
    pub project_path: PathBuf,
    pub configuration: String,
    pub is_device: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulator_target: Option<String>,
    /// Options after layering in the build config file
    pub options: BuildOptions,
    pub sources: Vec<ConfigSource>,
    pub invocations: Vec<Invocation>,
}

/// Outcome of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    #[serde(flatten)]
    pub plan: BuildPlan,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Resolve options, project and simulator target, and compose the
/// xcodebuild invocations. Only the simulator enumeration touches `runner`.
pub fn plan_build(request: &BuildRequest, runner: &dyn ToolRunner) -> BuildResult<BuildPlan> {
    let resolved = resolve_options(request.options.clone())?;
    let options = resolved.options;
    let project_path = request.project_path.as_path();

    let project = find_xcode_project_in(project_path)?;
    let configuration = options.configuration();
    let is_device = options.is_device();

    log::info!("Building project: {}", project.path.display());
    log::info!("\tConfiguration: {}", configuration);
    log::info!("\tPlatform: {}", if is_device { "device" } else { "emulator" });

    let simulator_target = if is_device {
        None
    } else {
        select_simulator_target(&options, runner)?
    };

    let xcconfig_dir = request
        .xcconfig_dir
        .clone()
        .unwrap_or_else(|| project_path.join(DEFAULT_XCCONFIG_SUBDIR));

    let build_args = compose_build_args(&BuildArgsRequest {
        project_name: &project.name,
        project_path,
        configuration,
        is_device,
        build_flags: options.build_flag.as_ref(),
        simulator_target: simulator_target.as_deref(),
        automatic_provisioning: options.automatic_provisioning(),
        xcconfig_dir: &xcconfig_dir,
    })?;

    let mut invocations = vec![Invocation {
        program: XCODEBUILD.to_string(),
        args: build_args,
        cwd: project_path.to_path_buf(),
    }];

    if is_device && request.export {
        let export_path = project_path.join("build").join("device");
        let export_options_plist = export_options_plist(&options, project_path);

        invocations.push(Invocation {
            program: XCODEBUILD.to_string(),
            args: compose_export_args(&ExportArgsRequest {
                project_name: &project.name,
                export_path: &export_path,
                export_options_plist: &export_options_plist,
                automatic_provisioning: options.automatic_provisioning(),
            }),
            cwd: project_path.to_path_buf(),
        });
    }

    Ok(BuildPlan {
        project_name: project.name,
        project_path: project_path.to_path_buf(),
        configuration: configuration.to_string(),
        is_device,
        simulator_target,
        options,
        sources: resolved.sources,
        invocations,
    })
}

/// Plan the build and run every invocation in order.
pub fn run_build(request: &BuildRequest, runner: &dyn ToolRunner) -> BuildResult<BuildReport> {
    let started_at = Utc::now();
    let start = Instant::now();

    let plan = plan_build(request, runner)?;
    for invocation in &plan.invocations {
        runner.run(&invocation.program, &invocation.args, &invocation.cwd)?;
    }

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    log::info!("Build succeeded in {} ms", duration_ms);

    Ok(BuildReport {
        plan,
        started_at,
        duration_ms,
    })
}

/// Simulator name for an emulator build.
///
/// An explicit target wins. A `-destination` build flag makes a name
/// unnecessary. Otherwise the default simulator is looked up.
fn select_simulator_target(
    options: &BuildOptions,
    runner: &dyn ToolRunner,
) -> BuildResult<Option<String>> {
    if let Some(target) = &options.target {
        return Ok(Some(target.clone()));
    }

    let overrides = FlagOverrides::from_build_flags(options.build_flag.as_ref());
    if overrides.destination.is_some() {
        log::debug!("Using -destination from build flags, skipping simulator lookup");
        return Ok(None);
    }

    let targets = list_device_types(runner)?;
    let target = default_simulator_target(&targets).ok_or(SimulatorError::NoneAvailable)?;
    log::info!("No simulator specified, using {}", target.name);

    Ok(Some(target.name.clone()))
}

fn export_options_plist(options: &BuildOptions, project_path: &Path) -> PathBuf {
    match &options.export_options_plist {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => project_path.join(path),
        None => project_path.join(DEFAULT_EXPORT_OPTIONS_PLIST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_options_plist_resolution() {
        let root = Path::new("/proj");
        let mut options = BuildOptions::default();
        assert_eq!(
            export_options_plist(&options, root),
            root.join("exportOptions.plist")
        );

        options.export_options_plist = Some(PathBuf::from("signing/export.plist"));
        assert_eq!(
            export_options_plist(&options, root),
            root.join("signing/export.plist")
        );

        options.export_options_plist = Some(PathBuf::from("/abs/export.plist"));
        assert_eq!(
            export_options_plist(&options, root),
            PathBuf::from("/abs/export.plist")
        );
    }

    #[test]
    fn test_build_request_defaults() {
        let request = BuildRequest::new("/proj", BuildOptions::default());
        assert!(request.export);
        assert!(request.xcconfig_dir.is_none());
    }
}
