//! Mindful-pause bookkeeping.
//!
//! The overlay renderer is a dumb display; the countdown itself runs here so
//! stale-instance arbitration lives in one place. A countdown that elapses
//! delivers a `Complete` signal through the same path an overlay dismissal
//! message takes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::EngineInner;
use crate::events::{FinishReason, TabId};
use crate::host::HostKey;

/// Prompts shown on the pause overlay; one is picked at random per instance.
pub const MINDFUL_PROMPTS: [&str; 6] = [
    "Take a breath. What did you come here to do?",
    "Is this where you want to spend the next few minutes?",
    "Still on task, or just scrolling?",
    "What would future-you prefer right now?",
    "One thing you meant to finish today is still waiting.",
    "Pause. Scroll later, or not at all?",
];

pub(crate) fn pick_prompt() -> String {
    use rand::seq::SliceRandom;
    MINDFUL_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MINDFUL_PROMPTS[0])
        .to_string()
}

/// Where a mindful instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MindfulPhase {
    InFlight,
    /// Finished (countdown elapsed or dismissed). Suppresses further pauses
    /// for this tab until it navigates to a different host.
    Completed,
}

/// Dispatcher-owned record of one overlay instance.
#[derive(Debug)]
pub(crate) struct MindfulRecord {
    pub instance_id: Uuid,
    pub host: HostKey,
    pub url: String,
    pub phase: MindfulPhase,
    countdown: Option<JoinHandle<()>>,
}

impl MindfulRecord {
    pub fn new(
        instance_id: Uuid,
        host: HostKey,
        url: String,
        countdown: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            instance_id,
            host,
            url,
            phase: MindfulPhase::InFlight,
            countdown,
        }
    }

    pub fn abort_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

/// Start the countdown for an overlay instance. A zero delay returns `None`;
/// the caller completes the instance inline, with no clock tick involved.
/// Delivery is instance-id guarded, so aborting late is harmless.
pub(crate) fn spawn_countdown(
    engine: Arc<EngineInner>,
    tab_id: TabId,
    instance_id: Uuid,
    delay: Duration,
) -> Option<JoinHandle<()>> {
    if delay.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        engine
            .on_mindful_signal(tab_id, instance_id, FinishReason::Complete)
            .await;
    }))
}
