//! External tool invocation
//!
//! Runs `xcodebuild` (and `xcrun simctl`) as subprocesses. Build output is
//! streamed line by line into the log while the tool runs, and optionally
//! appended to a log file. A shared cancellation flag terminates the child
//! and everything it spawned.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a running child is polled for exit or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a cancelled tool gets to exit after SIGTERM before SIGKILL
const TERMINATION_GRACE: Duration = Duration::from_secs(10);

/// Errors from running an external tool
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{program} failed to start: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}", describe_code(.code))]
    Failed { program: String, code: Option<i32> },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Result type for tool invocations
pub type RunResult<T> = Result<T, RunError>;

/// Seam between build orchestration and the processes it launches
pub trait ToolRunner {
    /// Run `program` in `cwd` to completion, streaming its output.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> RunResult<()>;

    /// Run `program` to completion and return its stdout.
    fn capture(&self, program: &str, args: &[String]) -> RunResult<String>;
}

/// Runs tools as real subprocesses
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    cancelled: Arc<AtomicBool>,
    log_file: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append tool output to `path`
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Flag that, once set, terminates the running tool
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn open_log(&self) -> RunResult<Option<Arc<Mutex<File>>>> {
        let Some(path) = &self.log_file else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Some(Arc::new(Mutex::new(file))))
    }

    fn wait_or_cancel(&self, program: &str, child: &mut Child) -> RunResult<ExitStatus> {
        loop {
            if self.is_cancelled() {
                log::warn!("Cancelling {}", program);
                terminate_child(child)?;
                return Err(RunError::Cancelled {
                    program: program.to_string(),
                });
            }

            match child.try_wait()? {
                Some(status) => return Ok(status),
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

/// Terminate the child's process group gracefully then forcefully.
///
/// xcodebuild spawns compilers and other helpers that inherit the output
/// pipes, so the whole group has to go before the readers see EOF.
fn terminate_child(child: &mut Child) -> RunResult<()> {
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGTERM);
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }

    let start = Instant::now();
    let mut exited = false;
    while start.elapsed() < TERMINATION_GRACE {
        if child.try_wait()?.is_some() {
            exited = true;
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    // Helpers that ignored SIGTERM still hold the pipes
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGKILL);
    if !exited {
        let _ = child.kill();
        child.wait()?;
    }

    Ok(())
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, signal) {
        // ESRCH once every member has exited
        log::debug!("killpg({}, {:?}) failed: {}", pgid, signal, e);
    }
}

/// Forward each line of `source` to the log and, if present, the log file.
///
/// Lines are read as raw bytes so output that is not UTF-8 is still drained
/// to EOF; a reader that stops early would leave the tool writing to a
/// closed pipe.
fn stream_lines<R: Read + Send + 'static>(
    source: Option<R>,
    is_stderr: bool,
    log_file: Option<Arc<Mutex<File>>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let Some(source) = source else {
            return;
        };
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("Failed to read tool output: {}", e);
                    break;
                }
            }

            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if is_stderr {
                log::warn!("{}", line);
            } else {
                log::info!("{}", line);
            }
            if let Some(file) = &log_file {
                if let Ok(mut f) = file.lock() {
                    let _ = if is_stderr {
                        writeln!(f, "[stderr] {}", line)
                    } else {
                        writeln!(f, "{}", line)
                    };
                }
            }
        }
    })
}

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> RunResult<()> {
        log::info!("Running {} {}", program, args.join(" "));

        let log_file = self.open_log()?;
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own group, so cancellation reaches the tool's helpers too
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout_handle = stream_lines(child.stdout.take(), false, log_file.clone());
        let stderr_handle = stream_lines(child.stderr.take(), true, log_file);

        let status = self.wait_or_cancel(program, &mut child);

        let _ = stdout_handle.join();
        let _ = stderr_handle.join();

        let status = status?;
        if !status.success() {
            return Err(RunError::Failed {
                program: program.to_string(),
                code: status.code(),
            });
        }

        log::debug!("{} finished", program);
        Ok(())
    }

    fn capture(&self, program: &str, args: &[String]) -> RunResult<String> {
        log::debug!("Capturing {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("{}: {}", program, stderr.trim());
            return Err(RunError::Failed {
                program: program.to_string(),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
