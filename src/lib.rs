//! iOS build lane
//!
//! Orchestrates `xcodebuild` for a platform project: validates build
//! options, layers in an optional build configuration file, locates the
//! `.xcodeproj`, picks a default simulator when needed, composes the
//! argument lists and runs the tool with streamed output.

pub mod config;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod project;
pub mod runner;
pub mod simulator;

pub use config::{resolve_options, ConfigError, ConfigOrigin, ConfigSource, ResolvedOptions};
pub use error::{BuildError, BuildResult};
pub use options::BuildOptions;
pub use pipeline::{plan_build, run_build, BuildPlan, BuildReport, BuildRequest, Invocation};
pub use project::{find_xcode_project_in, XcodeProject};
pub use runner::{ProcessRunner, RunError, ToolRunner};
pub use simulator::{default_simulator_target, SimulatorTarget, DEFAULT_SIMULATOR_NAME};
