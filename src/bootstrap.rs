//! Startup hook that guarantees one bound engine is cached per process.
//!
//! Runs synchronously after the host finishes its own base initialization:
//! construct a context, bind it to the configured entry point, store it under
//! the well-known identifier. A second run finds the cached engine and does
//! nothing. Any failure is fatal and leaves the registry untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};

use crate::consts::BACKGROUND_ENGINE_ID;
use crate::engine::{EngineConfig, EngineHandle, ExecutionContext};
use crate::entry::{EntryPoint, EntryPointCatalog, EntryPointRef};
use crate::error::{BootstrapError, RegistryError, validate_id};
use crate::events::{Event, EventBus};
use crate::registry::EngineRegistry;

/// The process hosting the engine. Bootstrap refuses to run until the
/// host reports its own initialization complete.
pub trait Host: Send + Sync {
    fn is_initialized(&self) -> bool;
}

/// The running process as a [`Host`]. Call [`ProcessHost::initialize`]
/// once base startup is done.
#[derive(Debug, Default)]
pub struct ProcessHost {
    initialized: AtomicBool,
}

impl ProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }
}

impl Host for ProcessHost {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// What a bootstrap run did.
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// A new engine was constructed, bound, and stored.
    Created(Arc<EngineHandle>),
    /// An engine was already cached; nothing was constructed.
    AlreadyPresent(Arc<EngineHandle>),
}

impl BootstrapOutcome {
    pub fn handle(&self) -> &Arc<EngineHandle> {
        match self {
            BootstrapOutcome::Created(h) | BootstrapOutcome::AlreadyPresent(h) => h,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, BootstrapOutcome::Created(_))
    }
}

pub struct Bootstrapper {
    registry: Arc<EngineRegistry>,
    entry_point: Arc<dyn EntryPoint>,
    engine_id: String,
    config: EngineConfig,
    events: Option<Arc<EventBus>>,
    shut_down: AtomicBool,
}

impl Bootstrapper {
    /// Resolve `entry_point` against `catalog` up front. An unknown entry
    /// point is a construction failure.
    pub fn new(
        registry: Arc<EngineRegistry>,
        catalog: &EntryPointCatalog,
        entry_point: &EntryPointRef,
    ) -> Result<Self, BootstrapError> {
        let Some(resolved) = catalog.resolve(entry_point) else {
            error!(entry_point = entry_point.name(), "entry point not found");
            return Err(BootstrapError::EngineConstructionFailure {
                reason: format!(
                    "entry point '{}' not found (known: {})",
                    entry_point.name(),
                    catalog.names().join(", ")
                ),
            });
        };

        Ok(Self {
            registry,
            entry_point: resolved,
            engine_id: BACKGROUND_ENGINE_ID.to_string(),
            config: EngineConfig::default(),
            events: None,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Cache the engine under a different identifier.
    pub fn with_engine_id(mut self, engine_id: &str) -> Result<Self, BootstrapError> {
        validate_id(engine_id)?;
        self.engine_id = engine_id.to_string();
        Ok(self)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Make sure a bound engine is cached. Idempotent until
    /// [`shutdown`](Self::shutdown); after that it always fails with
    /// [`BootstrapError::ShutDown`].
    pub fn bootstrap(&self, host: &dyn Host) -> Result<BootstrapOutcome, BootstrapError> {
        if !host.is_initialized() {
            error!("bootstrap invoked before host initialization");
            return Err(BootstrapError::HostNotInitialized);
        }
        if self.is_shut_down() {
            error!(id = %self.engine_id, "bootstrap invoked after shutdown");
            return Err(BootstrapError::ShutDown);
        }

        let stored = self
            .registry
            .get_or_try_insert_with(&self.engine_id, || {
                // Re-checked here: shutdown may have run while we waited to build.
                if self.is_shut_down() {
                    return Err(BootstrapError::ShutDown);
                }
                ExecutionContext::new(self.config.clone()).bind(Arc::clone(&self.entry_point))
            })
            .inspect_err(|e| error!(id = %self.engine_id, error = %e, "bootstrap failed"))?;

        let outcome = match stored {
            (handle, true) => {
                info!(
                    id = %self.engine_id,
                    instance = handle.instance(),
                    entry_point = handle.entry_point(),
                    "background engine cached"
                );
                self.emit(Event::EngineStored {
                    id: self.engine_id.clone(),
                    instance: handle.instance(),
                    entry_point: handle.entry_point().to_string(),
                });
                BootstrapOutcome::Created(handle)
            }
            (handle, false) => {
                info!(
                    id = %self.engine_id,
                    instance = handle.instance(),
                    "background engine already cached"
                );
                self.emit(Event::EngineReused {
                    id: self.engine_id.clone(),
                    instance: handle.instance(),
                });
                BootstrapOutcome::AlreadyPresent(handle)
            }
        };
        Ok(outcome)
    }

    /// Remove the cached engine and release it. Holders of an older clone
    /// see dispatch fail from now on, and this bootstrapper never builds
    /// another engine. Returns the released handle, if any.
    pub fn shutdown(&self) -> Result<Option<Arc<EngineHandle>>, RegistryError> {
        self.shut_down.store(true, Ordering::SeqCst);
        let removed = self.registry.remove(&self.engine_id)?;
        if let Some(handle) = &removed
            && handle.release()
        {
            info!(id = %self.engine_id, instance = handle.instance(), "background engine released");
            self.emit(Event::EngineReleased {
                id: self.engine_id.clone(),
                instance: handle.instance(),
            });
        }
        Ok(removed)
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}
