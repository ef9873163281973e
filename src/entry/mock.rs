use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::EntryPoint;
use crate::trigger::Trigger;

/// A scripted entry point for tests. Counts calls and can be told to
/// refuse binding, fail runs, or stall.
pub struct MockEntryPoint {
    name: String,
    refuse: bool,
    failure: Option<String>,
    delay: Option<Duration>,
    prepared: AtomicUsize,
    runs: AtomicUsize,
}

impl MockEntryPoint {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            refuse: false,
            failure: None,
            delay: None,
            prepared: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    /// Fail `prepare`, so binding aborts.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Fail every run with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Sleep before answering each run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prepare_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryPoint for MockEntryPoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&self) -> Result<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            bail!("MockEntryPoint '{}' refuses to start", self.name);
        }
        Ok(())
    }

    async fn run(&self, trigger: &Trigger) -> Result<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            bail!("{message}");
        }
        Ok(format!("{} handled {} ({})", self.name, trigger.kind, trigger.payload))
    }
}
