// src/shell.rs

//! Shell command execution
//!
//! Every build, verify and repository step shells out through [`Shell`].
//! Commands run under `sh -c` with stdin closed, in a process group of
//! their own. Output goes to temporary files, never pipes. The timeout is
//! an idle timeout: it restarts whenever the command writes output, and on
//! expiry the whole group is killed. A nonzero exit, spawn failure or
//! timeout is an [`Error::CommandError`].

use crate::error::{Error, Result};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default idle timeout for a single command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How often a running command's output is checked for progress
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured result of a successful command
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    /// Stdout lines followed by stderr lines
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().chain(self.stderr.lines()).collect()
    }

    /// Case-sensitive search over both streams
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle) || self.stderr.contains(needle)
    }
}

/// Command runner bound to a working directory, environment and timeout
#[derive(Debug, Clone)]
pub struct Shell {
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Self {
            cwd: None,
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Run commands inside `dir`
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Extra environment variables for every command
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Run `cmd` and fail on nonzero exit
    pub fn run(&self, cmd: &str) -> Result<Output> {
        debug!("Running: {} (cwd: {:?})", cmd, self.cwd);

        let mut stdout_file = tempfile::tempfile()?;
        let mut stderr_file = tempfile::tempfile()?;

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(cmd)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone()?))
            .stderr(Stdio::from(stderr_file.try_clone()?));
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .process_group(0)
            .spawn()
            .map_err(|e| Error::CommandError(format!("{}: failed to spawn: {}", cmd, e)))?;

        let poll = self.timeout.min(POLL_INTERVAL);
        let mut seen = 0;
        let mut last_output = Instant::now();
        let status = loop {
            if let Some(status) = child.wait_timeout(poll)? {
                break status;
            }

            let written = stdout_file.metadata()?.len() + stderr_file.metadata()?.len();
            if written != seen {
                seen = written;
                last_output = Instant::now();
            } else if last_output.elapsed() >= self.timeout {
                warn!("Command silent for {:?}, killing: {}", self.timeout, cmd);
                kill_group(&mut child)?;
                return Err(Error::CommandError(format!(
                    "{}: timed out after {:?} without output",
                    cmd, self.timeout
                )));
            }
        };

        let output = Output {
            stdout: read_captured(&mut stdout_file)?,
            stderr: read_captured(&mut stderr_file)?,
        };
        for line in output.stdout.lines() {
            debug!("[{}] {}", cmd, line);
        }
        for line in output.stderr.lines() {
            debug!("[{}] {}", cmd, line);
        }

        if !status.success() {
            return Err(Error::CommandError(format!(
                "{}: exit code {:?}\nstderr: {}",
                cmd,
                status.code(),
                output.stderr.trim_end()
            )));
        }

        Ok(output)
    }
}

/// Kill the command and everything it started, then reap it
fn kill_group(child: &mut Child) -> Result<()> {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        debug!("killpg({}) failed: {}, killing leader only", pgid, e);
        child.kill()?;
    }
    child.wait()?;
    Ok(())
}

fn read_captured(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_captures_output() {
        let output = Shell::new().run("echo hello; echo oops >&2").unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.lines(), vec!["hello", "oops"]);
        assert!(output.contains("oops"));
    }

    #[test]
    fn test_nonzero_exit_is_error() {
        let err = Shell::new().run("echo broken >&2; exit 3").unwrap_err();
        match err {
            Error::CommandError(msg) => {
                assert!(msg.contains("Some(3)"));
                assert!(msg.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cwd_and_env() {
        let temp = TempDir::new().unwrap();
        let mut env = HashMap::new();
        env.insert("PANTRY_TEST_VAR".to_string(), "value".to_string());

        let shell = Shell::new().in_dir(temp.path()).with_env(env);
        shell.run("touch marker").unwrap();
        assert!(temp.path().join("marker").exists());

        let output = shell.run("echo $PANTRY_TEST_VAR").unwrap();
        assert_eq!(output.stdout.trim(), "value");
    }

    #[test]
    fn test_timeout_kills_command() {
        let shell = Shell::new().with_timeout(Duration::from_millis(200));
        let err = shell.run("sleep 5").unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_output_keeps_command_alive() {
        let shell = Shell::new().with_timeout(Duration::from_secs(1));
        let output = shell
            .run("for i in 1 2 3 4 5 6; do echo $i; sleep 0.3; done")
            .unwrap();
        assert_eq!(output.stdout.lines().count(), 6);
    }

    #[test]
    fn test_timeout_kills_whole_group() {
        let temp = TempDir::new().unwrap();
        let shell = Shell::new()
            .in_dir(temp.path())
            .with_timeout(Duration::from_millis(300));

        let err = shell.run("(sleep 1; touch survivor); true").unwrap_err();
        assert!(matches!(err, Error::CommandError(_)));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!temp.path().join("survivor").exists());
    }
}
