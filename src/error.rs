//! Top-level build errors

use std::path::PathBuf;

use thiserror::Error;
use xcode_args::ComposeError;

use crate::config::ConfigError;
use crate::project::ProjectError;
use crate::runner::RunError;
use crate::simulator::SimulatorError;

/// Errors that reject a build before or while it runs
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two mutually exclusive options were both set
    #[error("Cannot specify \"{first}\" and \"{second}\" options together.")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    /// An explicitly given build config path does not exist
    #[error("Build config file does not exist: {}", .0.display())]
    MissingConfigFile(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Simulator(#[from] SimulatorError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Tool(#[from] RunError),
}

/// Result type for build operations
pub type BuildResult<T> = Result<T, BuildError>;
