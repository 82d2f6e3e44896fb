//! xcodebuild argument composition
//!
//! Turns high-level build options (device or simulator, configuration name,
//! provisioning mode, user build flags) into the exact ordered argument
//! lists passed to `xcodebuild` for the archive/build step and for the
//! archive export step.
//!
//! Everything here is pure: no filesystem access, no subprocesses.

mod compose;
mod flags;

pub use compose::{
    compose_build_args, compose_export_args, BuildArgsRequest, ComposeError, ExportArgsRequest,
    ACTION_ARCHIVE, ACTION_BUILD, ALLOW_PROVISIONING_UPDATES, DEVICE_DESTINATION, SIMULATOR_SDK,
};
pub use flags::{parse_flag_token, BuildFlags, FlagOverrides, KnownFlag};
