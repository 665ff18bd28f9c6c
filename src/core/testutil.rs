//! Shared fakes for unit tests: a scripted command runner, a canned backup
//! invoker, and recording notifier/alerter implementations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::core::alert::Alerter;
use crate::core::autobackup::{BackupInvoker, BackupRun};
use crate::core::notifications::Notifier;
use crate::core::runner::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: String,
    pub input: Option<String>,
}

/// Records every command and answers from a script: exit 0 with empty output
/// by default, a non-zero exit for `fail_on` prefixes, `Err` for `error_on`
/// prefixes.
pub struct ScriptedRunner {
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<Vec<(String, String)>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_on(&self, prefix: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((prefix.to_string(), stderr.to_string()));
    }

    pub fn error_on(&self, prefix: &str) {
        self.errors.lock().unwrap().push(prefix.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &[String], input: Option<&str>) -> Result<CommandOutput> {
        let joined = command.join(" ");
        self.calls.lock().unwrap().push(RecordedCall {
            command: joined.clone(),
            input: input.map(str::to_string),
        });

        if self
            .errors
            .lock()
            .unwrap()
            .iter()
            .any(|p| joined.starts_with(p.as_str()))
        {
            bail!("scripted spawn failure: {joined}");
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| joined.starts_with(p.as_str()))
            .map(|(_, stderr)| stderr.clone());
        if let Some(stderr) = failure {
            return Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr,
            });
        }

        Ok(CommandOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

pub struct FakeInvoker {
    run: Mutex<BackupRun>,
    invocations: Mutex<Vec<Vec<String>>>,
}

impl FakeInvoker {
    pub fn ok(stdout: &str) -> Arc<Self> {
        Self::with_run(true, stdout, "")
    }

    pub fn with_run(success: bool, stdout: &str, stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            run: Mutex::new(BackupRun {
                success,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackupInvoker for FakeInvoker {
    async fn invoke(&self, args: &[String]) -> Result<BackupRun> {
        self.invocations.lock().unwrap().push(args.to_vec());
        Ok(self.run.lock().unwrap().clone())
    }
}

pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages().into_iter().map(|(s, _)| s).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct CountingAlerter {
    count: AtomicUsize,
}

impl CountingAlerter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Alerter for CountingAlerter {
    fn alert(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
