//! Directly spawned child processes.

use std::io;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Process management errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be spawned.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Waiting for or signalling the process failed.
    #[error("failed to stop process {pid}: {source}")]
    Stop {
        /// Process id.
        pid: u32,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A child process owned by a launcher.
///
/// Dropping a `DirectProcess` that is still running kills it.
#[derive(Debug)]
pub struct DirectProcess {
    program: String,
    child: Child,
    exit_status: Option<ExitStatus>,
}

impl DirectProcess {
    /// Spawns `command`.
    pub fn spawn(command: &mut Command) -> Result<Self, ProcessError> {
        let program = command.get_program().to_string_lossy().into_owned();
        let child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;
        info!(program = %program, pid = child.id(), "Process started");
        Ok(Self {
            program,
            child,
            exit_status: None,
        })
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Returns `true` while the process has not exited.
    pub fn is_running(&mut self) -> bool {
        self.poll_exit().is_none()
    }

    /// Exit status, once the process has exited.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.poll_exit()
    }

    /// Stops the process.
    ///
    /// Sends a termination request (SIGTERM on Unix) and waits up to
    /// `timeout` for the process to exit, then kills it. With `None` the
    /// process is given unlimited time to exit.
    pub fn stop(&mut self, timeout: Option<Duration>) -> Result<ExitStatus, ProcessError> {
        if let Some(status) = self.poll_exit() {
            return Ok(status);
        }
        let pid = self.id();
        debug!(program = %self.program, pid, "Stopping process");
        self.terminate()?;

        let status = match timeout {
            None => self.child.wait().map_err(|source| ProcessError::Stop { pid, source })?,
            Some(timeout) => match self.wait_until(Instant::now() + timeout) {
                Some(status) => status,
                None => {
                    warn!(program = %self.program, pid, "Process did not exit gracefully, killing it");
                    self.kill()?
                }
            },
        };
        self.exit_status = Some(status);
        info!(program = %self.program, pid, code = ?status.code(), "Process exited");
        Ok(status)
    }

    /// Kills the process immediately and reaps it.
    pub fn kill(&mut self) -> Result<ExitStatus, ProcessError> {
        let pid = self.id();
        // The process may exit between the signal and the kill.
        match self.child.kill() {
            Err(source) if source.kind() != io::ErrorKind::InvalidInput => {
                return Err(ProcessError::Stop { pid, source });
            }
            _ => {}
        }
        let status = self.child.wait().map_err(|source| ProcessError::Stop { pid, source })?;
        self.exit_status = Some(status);
        Ok(status)
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), ProcessError> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = self.id();
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(ProcessError::Stop {
                pid,
                source: io::Error::from(errno),
            }),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), ProcessError> {
        self.kill().map(|_| ())
    }

    fn wait_until(&mut self, deadline: Instant) -> Option<ExitStatus> {
        loop {
            if let Some(status) = self.poll_exit() {
                return Some(status);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn poll_exit(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_none() {
            self.exit_status = self.child.try_wait().ok().flatten();
        }
        self.exit_status
    }
}

impl Drop for DirectProcess {
    fn drop(&mut self) {
        if self.poll_exit().is_none() {
            warn!(program = %self.program, pid = self.id(), "Killing process left running");
            let _ = self.kill();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_stop_terminates_gracefully() {
        let mut process = DirectProcess::spawn(Command::new("sleep").arg("30")).unwrap();
        assert!(process.is_running());

        let started = Instant::now();
        let status = process.stop(Some(Duration::from_secs(5))).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!status.success());
        assert!(!process.is_running());
    }

    #[test]
    fn test_stop_kills_after_timeout() {
        let mut process = DirectProcess::spawn(
            Command::new("sh").args(["-c", "trap '' TERM; sleep 30"]),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        process.stop(Some(Duration::from_millis(200))).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!process.is_running());
    }

    #[test]
    fn test_stop_after_exit() {
        let mut process = DirectProcess::spawn(&mut Command::new("true")).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while process.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let status = process.stop(None).unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_spawn_missing_program() {
        let err = DirectProcess::spawn(&mut Command::new("definitely-not-a-program-xyz")).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
