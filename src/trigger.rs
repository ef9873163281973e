//! Background triggers and the handler that routes them into the cached engine.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, warn};

use crate::error::{TriggerError, validate_id};
use crate::events::{Event, EventBus};
use crate::registry::EngineRegistry;

/// What woke the process up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Alarm,
    Notification,
    Broadcast,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 3] = [
        TriggerKind::Alarm,
        TriggerKind::Notification,
        TriggerKind::Broadcast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Alarm => "alarm",
            TriggerKind::Notification => "notification",
            TriggerKind::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "alarm" => Ok(TriggerKind::Alarm),
            "notification" | "notify" => Ok(TriggerKind::Notification),
            "broadcast" => Ok(TriggerKind::Broadcast),
            other => bail!("unknown trigger kind: {other}"),
        }
    }
}

/// A single background event plus whatever the scheduler attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub payload: String,
}

impl Trigger {
    pub fn new(kind: TriggerKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Parse `"<kind> [payload...]"`, e.g. `"alarm aspirin 08:00"`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (kind, payload) = match line.split_once(char::is_whitespace) {
            Some((kind, rest)) => (kind, rest.trim()),
            None => (line, ""),
        };
        if kind.is_empty() {
            bail!("empty trigger");
        }
        Ok(Self::new(kind.parse()?, payload))
    }
}

/// Result of handing a trigger to the background engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The engine ran the trigger.
    Completed { instance: u64, output: String },
    /// No engine is cached. Fallback is the caller's business.
    Unavailable,
}

/// Looks up the cached engine on every trigger and dispatches into it.
pub struct TriggerHandler {
    registry: Arc<EngineRegistry>,
    engine_id: String,
    events: Option<Arc<EventBus>>,
}

impl TriggerHandler {
    pub fn new(
        registry: Arc<EngineRegistry>,
        engine_id: impl Into<String>,
    ) -> Result<Self, TriggerError> {
        let engine_id = engine_id.into();
        validate_id(&engine_id)?;
        Ok(Self {
            registry,
            engine_id,
            events: None,
        })
    }

    /// Announce each successful dispatch on the given bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    pub async fn handle(&self, trigger: &Trigger) -> Result<Dispatch, TriggerError> {
        let Some(engine) = self.registry.get(&self.engine_id)? else {
            warn!(id = %self.engine_id, kind = %trigger.kind, "no cached engine for trigger");
            return Ok(Dispatch::Unavailable);
        };

        let output = engine.dispatch(trigger).await?;
        debug!(
            id = %self.engine_id,
            instance = engine.instance(),
            kind = %trigger.kind,
            "trigger dispatched"
        );

        if let Some(events) = &self.events {
            events.emit(Event::TriggerDispatched {
                id: self.engine_id.clone(),
                instance: engine.instance(),
                kind: trigger.kind,
            });
        }

        Ok(Dispatch::Completed {
            instance: engine.instance(),
            output,
        })
    }
}
