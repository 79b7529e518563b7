// ============================================================================
// src/cmd/base.rs – Allowlisted external command runner (for system utilities)
// ============================================================================

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Locations `tar` may be run from.
pub const TAR_BINARIES: &[&str] = &["/bin/tar", "/usr/bin/tar", "/usr/local/bin/tar"];

/// Safe wrapper for external process execution.
/// Used for invoking allowlisted system tools; today that is only `tar`.
#[derive(Debug)]
pub struct Cmd {
    pub path: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct OutputData {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl OutputData {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

impl Cmd {
    /// Create a new allowlisted command runner.
    pub fn new_allowlisted<S: Into<String>>(path: S, timeout: Duration) -> Result<Self> {
        let path_str = path.into();
        if !TAR_BINARIES.contains(&path_str.as_str()) {
            return Err(anyhow!("Command '{}' not in allowlist", path_str));
        }

        Ok(Self {
            path: path_str,
            timeout,
        })
    }

    /// First allowlisted candidate that exists on this host.
    pub fn discover(candidates: &[&str], timeout: Duration) -> Result<Self> {
        let found = candidates
            .iter()
            .find(|p| Path::new(p).is_file())
            .ok_or_else(|| anyhow!("none of {} found", candidates.join(", ")))?;
        Self::new_allowlisted(*found, timeout)
    }

    /// Run command with arguments, returning `OutputData`
    pub fn run(&self, args: &[&str]) -> Result<OutputData> {
        let child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {}", self.path))?;

        self.wait_with_timeout(child)
    }

    /// Like `run`, but a non-zero exit status is an error carrying stderr.
    pub fn check(&self, args: &[&str]) -> Result<OutputData> {
        let out = self.run(args)?;
        if !out.success() {
            return Err(anyhow!(
                "{} exited with status {}: {}",
                self.path,
                out.status,
                out.stderr.trim()
            ));
        }
        Ok(out)
    }

    fn wait_with_timeout(&self, mut child: Child) -> Result<OutputData> {
        let start = Instant::now();
        // Pipes are drained while waiting so a chatty child cannot fill them and stall.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        loop {
            match child.try_wait().context("try_wait")? {
                Some(status) => {
                    return Ok(OutputData {
                        stdout: collect(stdout).context("collect stdout")?,
                        stderr: collect(stderr).context("collect stderr")?,
                        status: status.code().unwrap_or(-1),
                    });
                }
                None => {
                    if start.elapsed() > self.timeout {
                        // Best effort terminate, then kill.
                        #[cfg(unix)]
                        {
                            use nix::sys::signal::{kill, Signal::SIGTERM};
                            use nix::unistd::Pid;
                            let _ = kill(Pid::from_raw(child.id() as i32), SIGTERM);
                        }
                        thread::sleep(Duration::from_millis(200));
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(anyhow!("{} timed out after {:?}", self.path, self.timeout));
                    }
                    thread::sleep(Duration::from_millis(30));
                }
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<std::io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| anyhow!("output reader panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
