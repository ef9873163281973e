use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use super::EntryPoint;
use crate::consts::DEFAULT_ENTRY_POINT;
use crate::trigger::{Trigger, TriggerKind};

/// The application's default background entry point: a medication reminder
/// check. Schedules live elsewhere; this only acknowledges what woke it.
#[derive(Default)]
pub struct ReminderCheck {
    runs: AtomicU64,
}

impl ReminderCheck {
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryPoint for ReminderCheck {
    fn name(&self) -> &str {
        DEFAULT_ENTRY_POINT
    }

    async fn run(&self, trigger: &Trigger) -> Result<String> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, kind = %trigger.kind, payload = %trigger.payload, "reminder check");

        let subject = if trigger.payload.is_empty() {
            "all medications"
        } else {
            trigger.payload.as_str()
        };
        let verb = match trigger.kind {
            TriggerKind::Alarm => "due check",
            TriggerKind::Notification => "acknowledged",
            TriggerKind::Broadcast => "rescheduled",
        };
        Ok(format!("reminder #{run}: {verb} for {subject}"))
    }
}
