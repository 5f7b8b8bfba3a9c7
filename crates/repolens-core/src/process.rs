use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::LensError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs one external tool with a fixed working directory and timeout.
///
/// Arguments are handed to the OS as a vector and never pass through a
/// shell, so identifiers cannot inject extra commands.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use repolens_core::ToolRunner;
///
/// let git = ToolRunner::new("git")
///     .with_working_dir("/srv/repos/project.git")
///     .with_timeout(Some(Duration::from_secs(30)));
/// let head = git.run_text(&["rev-parse", "HEAD"]).unwrap();
/// println!("{head}");
/// ```
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ToolRunner {
    /// A runner for `program` in the current directory with no timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Run every invocation inside `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The executable this runner invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The working directory, if one was set.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Run the tool and return its raw output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Io`] if the process cannot be spawned, or
    /// [`LensError::Timeout`] if it had to be killed.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Output, LensError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(program = %self.program, args = ?display_args(args), "running tool");
        let started = Instant::now();
        let mut child = command.spawn()?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                if started.elapsed() >= limit {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(LensError::Timeout {
                        program: self.program.clone(),
                        seconds: limit.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            },
        };

        let output = Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        };
        debug!(
            program = %self.program,
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );
        Ok(output)
    }

    /// Run the tool and return stdout, failing on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Everything [`run`](Self::run) returns, plus [`LensError::Command`]
    /// when the tool exits unsuccessfully.
    pub fn run_checked<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Vec<u8>, LensError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(LensError::Command {
                program: self.program.clone(),
                args: display_args(args),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Like [`run_checked`](Self::run_checked), decoded as UTF-8 (lossily)
    /// with surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// Same as [`run_checked`](Self::run_checked).
    pub fn run_text<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String, LensError> {
        let stdout = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }
}

fn display_args<S: AsRef<OsStr>>(args: &[S]) -> Vec<String> {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>, LensError> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => {
            let bytes = handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))?;
            Ok(bytes)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn run_text_trims_output() {
        let runner = ToolRunner::new("sh");
        let out = runner.run_text(&["-c", "printf '  hello \\n\\n'"]).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn run_checked_reports_exit_status_and_stderr() {
        let runner = ToolRunner::new("sh");
        let err = runner
            .run_checked(&["-c", "echo nope >&2; exit 3"])
            .unwrap_err();
        match err {
            LensError::Command {
                program,
                args,
                status,
                stderr,
            } => {
                assert_eq!(program, "sh");
                assert_eq!(args[0], "-c");
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn arguments_are_not_shell_interpreted() {
        let runner = ToolRunner::new("printf");
        let out = runner.run_checked(&["%s", "$(echo injected); ls"]).unwrap();
        assert_eq!(out, b"$(echo injected); ls");
    }

    #[test]
    fn slow_process_times_out() {
        let runner = ToolRunner::new("sleep").with_timeout(Some(Duration::from_millis(100)));
        let err = runner.run(&["5"]).unwrap_err();
        assert!(matches!(err, LensError::Timeout { ref program, .. } if program == "sleep"));
    }

    #[test]
    fn missing_binary_is_io_error() {
        let runner = ToolRunner::new("definitely-not-a-real-binary-xyz");
        assert!(matches!(runner.run(&["x"]), Err(LensError::Io(_))));
    }

    #[test]
    fn working_dir_is_applied() {
        let dir = std::env::temp_dir();
        let runner = ToolRunner::new("pwd").with_working_dir(&dir);
        let out = runner.run_text::<&str>(&[]).unwrap();
        let expected = dir.canonicalize().unwrap();
        assert_eq!(Path::new(&out).canonicalize().unwrap(), expected);
    }
}
