//! iOS build lane CLI
//!
//! Entry point for the `ios-build` command-line tool.

use clap::{Args, Parser, Subcommand};
use ios_build_lane::simulator::list_device_types;
use ios_build_lane::{
    default_simulator_target, plan_build, run_build, BuildOptions, BuildRequest, ProcessRunner,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use xcode_args::BuildFlags;

#[derive(Parser)]
#[command(name = "ios-build")]
#[command(about = "Build an iOS platform project with xcodebuild", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project (archive and export for devices)
    Build {
        #[command(flatten)]
        build: BuildArgs,

        /// Also append xcodebuild output to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the xcodebuild invocations a build would run, without running them
    Plan {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// List available simulator device types
    Simulators {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Platform project directory containing the .xcodeproj
    #[arg(long, default_value = ".")]
    project_path: PathBuf,

    /// Build the Debug configuration (default)
    #[arg(long)]
    debug: bool,

    /// Build the Release configuration
    #[arg(long)]
    release: bool,

    /// Build for a physical device
    #[arg(long)]
    device: bool,

    /// Build for the simulator (default)
    #[arg(long)]
    emulator: bool,

    /// Simulator name, e.g. "iPhone 15"
    #[arg(long)]
    target: Option<String>,

    /// Let xcodebuild update provisioning profiles
    #[arg(long, overrides_with = "no_automatic_provisioning")]
    automatic_provisioning: bool,

    /// Turn automatic provisioning off even if the build config enables it
    #[arg(long, overrides_with = "automatic_provisioning")]
    no_automatic_provisioning: bool,

    /// Extra xcodebuild flag; repeatable (e.g. --build-flag="-quiet")
    #[arg(long, allow_hyphen_values = true)]
    build_flag: Vec<String>,

    /// Build configuration file (build.json or .toml)
    #[arg(long)]
    build_config: Option<PathBuf>,

    /// Export options plist for the archive export step
    #[arg(long)]
    export_options_plist: Option<PathBuf>,

    /// Directory holding build-<configuration>.xcconfig
    #[arg(long)]
    xcconfig_dir: Option<PathBuf>,

    /// Skip exporting the archive after a device build
    #[arg(long)]
    no_export: bool,
}

impl BuildArgs {
    /// `None` leaves the choice to the build config file
    fn automatic_provisioning(&self) -> Option<bool> {
        if self.automatic_provisioning {
            Some(true)
        } else if self.no_automatic_provisioning {
            Some(false)
        } else {
            None
        }
    }

    fn into_request(self) -> BuildRequest {
        let automatic_provisioning = self.automatic_provisioning();
        let build_flag = (!self.build_flag.is_empty()).then(|| BuildFlags::from(self.build_flag));

        let options = BuildOptions {
            debug: self.debug,
            release: self.release,
            device: self.device,
            emulator: self.emulator,
            target: self.target,
            automatic_provisioning,
            build_flag,
            build_config: self.build_config,
            export_options_plist: self.export_options_plist,
        };

        let mut request = BuildRequest::new(self.project_path, options);
        request.xcconfig_dir = self.xcconfig_dir;
        request.export = !self.no_export;
        request
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            build,
            log_file,
            json,
        } => run_build_command(build, log_file, json),
        Commands::Plan { build } => run_plan_command(build),
        Commands::Simulators { json } => run_simulators_command(json),
    }
}

fn run_build_command(build: BuildArgs, log_file: Option<PathBuf>, json: bool) {
    let mut runner = ProcessRunner::new();
    if let Some(path) = log_file {
        runner = runner.with_log_file(path);
    }

    let flag = runner.cancellation_flag();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let request = build.into_request();
    match run_build(&request, &runner) {
        Ok(report) => {
            if json {
                print_json(&report);
            }
        }
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    }
}

fn run_plan_command(build: BuildArgs) {
    let runner = ProcessRunner::new();
    let request = build.into_request();

    match plan_build(&request, &runner) {
        Ok(plan) => print_json(&plan),
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    }
}

fn run_simulators_command(json: bool) {
    let runner = ProcessRunner::new();
    let targets = match list_device_types(&runner) {
        Ok(targets) => targets,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };

    if json {
        print_json(&targets);
        return;
    }

    let default = default_simulator_target(&targets).map(|t| t.identifier.clone());
    for target in &targets {
        let marker = if Some(&target.identifier) == default.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("{}{}  [{}]", target.name, marker, target.sim_identifier);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Failed to serialize output: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_args(argv: &[&str]) -> BuildArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Plan { build } => build,
            _ => panic!("expected plan subcommand"),
        }
    }

    #[test]
    fn test_automatic_provisioning_unset_by_default() {
        let request = build_args(&["ios-build", "plan"]).into_request();
        assert_eq!(request.options.automatic_provisioning, None);
    }

    #[test]
    fn test_no_automatic_provisioning_sets_false() {
        let request =
            build_args(&["ios-build", "plan", "--no-automatic-provisioning"]).into_request();
        assert_eq!(request.options.automatic_provisioning, Some(false));
    }

    #[test]
    fn test_last_automatic_provisioning_flag_wins() {
        let args = build_args(&[
            "ios-build",
            "plan",
            "--no-automatic-provisioning",
            "--automatic-provisioning",
        ]);
        assert_eq!(args.into_request().options.automatic_provisioning, Some(true));
    }

    #[test]
    fn test_build_flags_collected_in_order() {
        let request = build_args(&[
            "ios-build",
            "plan",
            "--build-flag=-quiet",
            "--build-flag",
            "-sdk iphoneos",
        ])
        .into_request();

        assert_eq!(
            request.options.build_flag,
            Some(BuildFlags::Multiple(vec![
                "-quiet".to_string(),
                "-sdk iphoneos".to_string()
            ]))
        );
    }
}
