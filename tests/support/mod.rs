//! Shared test helpers: a recording tool runner and project fixtures

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use ios_build_lane::runner::{RunError, RunResult, ToolRunner};
use tempfile::TempDir;

/// simctl device type listing with an iPhone X entry
pub const DEVICE_TYPES_JSON: &str = r#"{
    "devicetypes": [
        {"name": "iPhone 8", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-8", "productFamily": "iPhone"},
        {"name": "iPhone X", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-X", "productFamily": "iPhone"},
        {"name": "Apple TV", "identifier": "com.apple.CoreSimulator.SimDeviceType.Apple-TV-1080p", "productFamily": "Apple TV"}
    ]
}"#;

/// A recorded `run` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Runner that records calls instead of spawning processes
#[derive(Default)]
pub struct RecordingRunner {
    pub runs: RefCell<Vec<RecordedRun>>,
    pub captures: RefCell<Vec<Vec<String>>>,
    /// stdout returned from `capture`
    pub capture_output: String,
    /// 1-based index of the `run` call that should fail
    pub fail_on_run: Option<usize>,
}

impl RecordingRunner {
    pub fn with_device_types() -> Self {
        Self {
            capture_output: DEVICE_TYPES_JSON.to_string(),
            ..Default::default()
        }
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> RunResult<()> {
        let mut runs = self.runs.borrow_mut();
        runs.push(RecordedRun {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        });

        if self.fail_on_run == Some(runs.len()) {
            return Err(RunError::Failed {
                program: program.to_string(),
                code: Some(65),
            });
        }
        Ok(())
    }

    fn capture(&self, program: &str, args: &[String]) -> RunResult<String> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.captures.borrow_mut().push(call);
        Ok(self.capture_output.clone())
    }
}

/// A platform project directory containing `<name>.xcodeproj`
pub fn project_dir(name: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(format!("{}.xcodeproj", name))).unwrap();
    fs::create_dir(temp.path().join("www")).unwrap();
    temp
}
