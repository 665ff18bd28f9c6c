//! The audible alert: a BEL written to a console tty.

use std::fs;
use std::path::PathBuf;

const DEFAULT_TTY: &str = "/dev/tty5";

pub trait Alerter: Send + Sync {
    fn alert(&self);
}

/// Writes the terminal bell character to a tty so the host speaker beeps.
pub struct TtyBell {
    path: PathBuf,
}

impl TtyBell {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for TtyBell {
    fn default() -> Self {
        Self::new(DEFAULT_TTY)
    }
}

impl Alerter for TtyBell {
    fn alert(&self) {
        // Best effort; a missing tty must not disturb the monitor loop.
        if let Err(error) = fs::write(&self.path, "\x07") {
            tracing::debug!(path = %self.path.display(), %error, "could not ring bell");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bell_writes_bel_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tty");
        std::fs::write(&path, b"").unwrap();

        TtyBell::new(&path).alert();

        assert_eq!(std::fs::read(&path).unwrap(), b"\x07");
    }

    #[test]
    fn missing_tty_does_not_panic() {
        TtyBell::new("/nonexistent/tty").alert();
    }
}
