//! Daemon lifecycle glue: pid file, double-fork detachment, SIGTERM stop.
//!
//! Kept outside the core; the monitor itself never touches process-global
//! state beyond what happens here before the runtime starts.

use std::fs;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::path::Path;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::{ForkResult, Pid, chdir, dup2, fork, setsid};

pub const PID_FILE: &str = "/run/zbakd.pid";

/// Send SIGTERM to the process named in the pid file, if any.
/// A missing pid file or an already-gone process is not an error.
pub fn stop_existing() -> Result<()> {
    stop_existing_at(Path::new(PID_FILE))
}

fn stop_existing_at(pid_file: &Path) -> Result<()> {
    let contents = match fs::read_to_string(pid_file) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {}", pid_file.display()));
        }
    };

    let pid: i32 = contents
        .trim()
        .parse()
        .with_context(|| format!("invalid pid in {}", pid_file.display()))?;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => println!("Sent SIGTERM to PID {pid}"),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(errno) => return Err(errno).with_context(|| format!("failed to signal PID {pid}")),
    }

    let _ = fs::remove_file(pid_file);
    Ok(())
}

/// Remove the pid file written by [`daemonize`]. Best effort; a missing
/// file is fine. Call on clean shutdown so a later `--stop` cannot SIGTERM
/// a recycled pid.
pub fn remove_pid_file() {
    remove_pid_file_at(Path::new(PID_FILE));
}

fn remove_pid_file_at(pid_file: &Path) {
    if let Err(error) = fs::remove_file(pid_file)
        && error.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(%error, pid_file = %pid_file.display(), "failed to remove pid file");
    }
}

/// Detach from the controlling terminal and write the pid file.
///
/// Must run before the tokio runtime is created; forking a live runtime is
/// not supported.
pub fn daemonize() -> Result<()> {
    // First fork: the parent returns to the shell.
    match unsafe { fork() }.context("first fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().context("setsid failed")?;

    // Second fork: the session leader exits so we can never reacquire a tty.
    match unsafe { fork() }.context("second fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    chdir("/").context("chdir to / failed")?;

    let devnull = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .context("failed to open /dev/null")?;
    for fd in 0..=2 {
        dup2(devnull.as_raw_fd(), fd).context("failed to redirect standard stream")?;
    }
    // Leak on purpose; the descriptor backs stdio for the process lifetime.
    let _ = devnull.into_raw_fd();

    fs::write(PID_FILE, std::process::id().to_string())
        .with_context(|| format!("failed to write {PID_FILE}"))?;

    Ok(())
}
