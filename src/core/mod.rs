pub mod alert;
pub mod autobackup;
pub mod hardware;
pub mod monitor;
pub mod notifications;
pub mod pipeline;
pub mod runner;

#[cfg(test)]
pub(crate) mod testutil;

pub use alert::{Alerter, TtyBell};
pub use autobackup::{BackupInvoker, BackupRun, ZfsAutobackupCli};
pub use hardware::{DeviceEvent, HardwareAdapter};
pub use monitor::{Monitor, NAG_INTERVAL};
pub use notifications::Notifier;
pub use pipeline::{BackupOutcome, BackupPipeline};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
