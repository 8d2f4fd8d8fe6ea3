//! Bounded subprocess execution for usage tools.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Runs an external command and returns its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Runs real processes with a wall-clock timeout and a stdout size cap.
pub struct ProcessRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let resolved =
            which::which(program).with_context(|| format!("{} is not installed", program))?;

        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        let stdout = child
            .stdout
            .take()
            .context("Child stdout was not captured")?;

        let limit = read_limit(self.max_output_bytes);
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = stdout.take(limit).read_to_end(&mut buffer).map(|_| buffer);
            let _ = tx.send(result);
        });

        let start = Instant::now();
        let output = match rx.recv_timeout(self.timeout) {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                terminate(&mut child);
                return Err(e).with_context(|| format!("Failed to read output of {}", program));
            }
            Err(_) => {
                terminate(&mut child);
                bail!("{} timed out after {}s", program, self.timeout.as_secs());
            }
        };

        if output.len() > self.max_output_bytes {
            terminate(&mut child);
            bail!(
                "{} produced more than {} bytes of output",
                program,
                self.max_output_bytes
            );
        }

        let remaining = self.timeout.saturating_sub(start.elapsed());
        let status = wait_with_deadline(&mut child, remaining)
            .with_context(|| format!("{} did not exit in time", program))?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

/// Bytes to read from stdout; one past the cap tells us the cap was exceeded.
fn read_limit(max_output_bytes: usize) -> u64 {
    u64::try_from(max_output_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1)
}

fn wait_with_deadline(child: &mut Child, budget: Duration) -> Result<ExitStatus> {
    let deadline = Instant::now() + budget;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            terminate(child);
            bail!("timed out waiting for exit");
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
