//! Execution contexts and the handles the registry caches.
//!
//! A context starts life as an [`ExecutionContext`] (constructed, not yet
//! runnable) and becomes an [`EngineHandle`] only once it is bound to an
//! entry point. Nothing unbound can reach the registry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::consts::DEFAULT_DISPATCH_TIMEOUT;
use crate::entry::EntryPoint;
use crate::error::{BootstrapError, EngineError};
use crate::trigger::Trigger;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub dispatch_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

/// A freshly constructed, unbound context.
#[derive(Debug)]
pub struct ExecutionContext {
    instance: u64,
    config: EngineConfig,
}

impl ExecutionContext {
    pub fn new(config: EngineConfig) -> Self {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        debug!(instance, "execution context constructed");
        Self { instance, config }
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Bind the context to its entry point. The entry point gets one chance
    /// to refuse; a refusal consumes the context.
    pub fn bind(self, entry_point: Arc<dyn EntryPoint>) -> Result<EngineHandle, BootstrapError> {
        entry_point
            .prepare()
            .map_err(|e| BootstrapError::EngineConstructionFailure {
                reason: format!("entry point '{}' refused to start: {e:#}", entry_point.name()),
            })?;

        info!(
            instance = self.instance,
            entry_point = entry_point.name(),
            "execution context bound"
        );

        Ok(EngineHandle {
            instance: self.instance,
            entry_point,
            config: self.config,
            dispatched: AtomicU64::new(0),
            released: AtomicBool::new(false),
        })
    }
}

/// A bound, runnable engine. Shared through the registry as
/// `Arc<EngineHandle>`; holders of a clone do not own it.
pub struct EngineHandle {
    instance: u64,
    entry_point: Arc<dyn EntryPoint>,
    config: EngineConfig,
    dispatched: AtomicU64,
    released: AtomicBool,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("instance", &self.instance)
            .field("entry_point", &self.entry_point.name())
            .field("config", &self.config)
            .field("dispatched", &self.dispatch_count())
            .field("released", &self.is_released())
            .finish()
    }
}

impl EngineHandle {
    /// Process-unique number assigned at construction.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn entry_point(&self) -> &str {
        self.entry_point.name()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of dispatches attempted, including failed ones.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Mark the engine as released. Returns `false` if it already was.
    pub(crate) fn release(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    /// Run the bound entry point for one trigger.
    ///
    /// Release is checked once, on entry. A dispatch already past that check
    /// runs to completion (or timeout) even if the engine is released
    /// meanwhile; only dispatches that start afterwards fail with
    /// [`EngineError::Released`].
    pub async fn dispatch(&self, trigger: &Trigger) -> Result<String, EngineError> {
        if self.is_released() {
            return Err(EngineError::Released {
                instance: self.instance,
            });
        }
        self.dispatched.fetch_add(1, Ordering::SeqCst);

        let timeout = self.config.dispatch_timeout;
        match tokio::time::timeout(timeout, self.entry_point.run(trigger)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(EngineError::EntryPoint {
                entry_point: self.entry_point().to_string(),
                message: format!("{e:#}"),
            }),
            Err(_) => Err(EngineError::TimedOut {
                entry_point: self.entry_point().to_string(),
                timeout,
            }),
        }
    }
}
