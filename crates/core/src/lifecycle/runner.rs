//! Invoking the lando binary

use std::cell::RefCell;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// stderr followed by stdout, lossily decoded
    pub fn diagnostics(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&self.stdout);
        if !stdout.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stdout);
        }
        text
    }
}

/// How the child's stdio is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout and stderr for diagnostics
    Capture,
    /// Hand the terminal to the child (interactive shells, tooling)
    Inherit,
}

/// Runs the lando CLI. Implemented by the real process runner and by test
/// doubles.
pub trait CliRunner {
    fn run(&self, args: &[String], cwd: Option<&Path>, mode: OutputMode) -> io::Result<CommandOutput>;
}

impl<R: CliRunner + ?Sized> CliRunner for &R {
    fn run(&self, args: &[String], cwd: Option<&Path>, mode: OutputMode) -> io::Result<CommandOutput> {
        (**self).run(args, cwd, mode)
    }
}

/// Spawns the configured binary as a subprocess
#[derive(Debug, Clone)]
pub struct SystemRunner {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill the child and report `TimedOut` when it runs longer than this
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn wait(&self, mut child: Child, capture: bool) -> io::Result<CommandOutput> {
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            match self.timeout {
                Some(limit) if started.elapsed() >= limit => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} did not finish within {:?}", self.binary.display(), limit),
                    ));
                }
                _ => thread::sleep(POLL_INTERVAL),
            }
        };

        let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
            handle.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        let status_code = status
            .code()
            .unwrap_or(if status.success() { 0 } else { 1 });
        Ok(CommandOutput {
            status_code,
            stdout: if capture { collect(stdout) } else { Vec::new() },
            stderr: if capture { collect(stderr) } else { Vec::new() },
        })
    }
}

fn spawn_reader<T: Read + Send + 'static>(mut pipe: T) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

impl CliRunner for SystemRunner {
    fn run(&self, args: &[String], cwd: Option<&Path>, mode: OutputMode) -> io::Result<CommandOutput> {
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let capture = mode == OutputMode::Capture;
        if capture {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let child = cmd.spawn()?;
        self.wait(child, capture)
    }
}

/// One call recorded by [`ScriptedRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub mode: OutputMode,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<RecordedCall>,
    outputs: Vec<io::Result<CommandOutput>>,
}

/// In-memory runner that records every call and replays queued results.
///
/// Clones share the same script, so a test can keep a handle after moving
/// the runner into a controller. With nothing queued every call succeeds.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    script: Rc<RefCell<Script>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&self, output: CommandOutput) {
        self.script.borrow_mut().outputs.push(Ok(output));
    }

    /// Queue a failing exit with the given stderr text
    pub fn push_failure(&self, status_code: i32, stderr: &str) {
        self.push_output(CommandOutput {
            status_code,
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        });
    }

    pub fn push_error(&self, error: io::Error) {
        self.script.borrow_mut().outputs.push(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.borrow().calls.clone()
    }

    /// Argument lines of every call, joined with spaces
    pub fn command_lines(&self) -> Vec<String> {
        self.script
            .borrow()
            .calls
            .iter()
            .map(|call| call.args.join(" "))
            .collect()
    }
}

impl CliRunner for ScriptedRunner {
    fn run(&self, args: &[String], cwd: Option<&Path>, mode: OutputMode) -> io::Result<CommandOutput> {
        let mut script = self.script.borrow_mut();
        script.calls.push(RecordedCall {
            args: args.to_vec(),
            cwd: cwd.map(Path::to_path_buf),
            mode,
        });
        if script.outputs.is_empty() {
            return Ok(CommandOutput::default());
        }
        script.outputs.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let output = CommandOutput {
            status_code: 1,
            stdout: b"Stopping site\n".to_vec(),
            stderr: b"ERROR: docker not running".to_vec(),
        };
        assert_eq!(
            output.diagnostics(),
            "ERROR: docker not running\nStopping site\n"
        );
    }

    #[test]
    fn test_scripted_runner_replays_in_order() {
        let runner = ScriptedRunner::new();
        runner.push_failure(2, "boom");

        let first = runner
            .run(&["start".to_string()], Some(Path::new("/w/site")), OutputMode::Capture)
            .unwrap();
        let second = runner.run(&["stop".to_string()], None, OutputMode::Capture).unwrap();

        assert_eq!(first.status_code, 2);
        assert!(second.success());
        assert_eq!(runner.command_lines(), vec!["start", "stop"]);
        assert_eq!(runner.calls()[0].cwd.as_deref(), Some(Path::new("/w/site")));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output_and_exit_code() {
        let runner = SystemRunner::new("sh");
        let output = runner
            .run(
                &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
                None,
                OutputMode::Capture,
            )
            .unwrap();
        assert_eq!(output.status_code, 3);
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_times_out() {
        let runner = SystemRunner::new("sh").with_timeout(Some(Duration::from_millis(100)));
        let err = runner
            .run(&["-c".to_string(), "sleep 5".to_string()], None, OutputMode::Capture)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_missing_binary_is_an_io_error() {
        let runner = SystemRunner::new("/nonexistent/lando-binary");
        assert!(runner.run(&[], None, OutputMode::Capture).is_err());
    }
}
