//! Background execution of one gateway turn and the hand-off channel that
//! carries its output to the UI thread.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use agent_gateway::{AgentGateway, Conversation, GatewayProfile};
use thiserror::Error;

pub type TurnId = u64;

/// Prefix of every turn worker thread name.
pub const TURN_THREAD_PREFIX: &str = "hunter-turn-";

const EMPTY_ERROR_FALLBACK: &str = "agent gateway failed without a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    TextFragment { turn_id: TurnId, content: String },
    /// Last event of every turn. `error` is set when the turn failed.
    Terminal { turn_id: TurnId, error: Option<String> },
}

impl OutputEvent {
    pub fn turn_id(&self) -> TurnId {
        match self {
            Self::TextFragment { turn_id, .. } | Self::Terminal { turn_id, .. } => *turn_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}

/// Unbounded FIFO shared between the turn worker and the poll loop.
#[derive(Debug, Clone, Default)]
pub struct HandoffChannel {
    queue: Arc<Mutex<VecDeque<OutputEvent>>>,
}

impl HandoffChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: OutputEvent) {
        lock_unpoisoned(&self.queue).push_back(event);
    }

    /// Pops the oldest event without blocking.
    pub fn try_pop(&self) -> Option<OutputEvent> {
        lock_unpoisoned(&self.queue).pop_front()
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_unpoisoned(&self.queue).is_empty()
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("turn {turn_id} is still running")]
    Busy { turn_id: TurnId },
    #[error("failed to spawn turn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

struct ActiveTurn {
    turn_id: TurnId,
    join_handle: Option<JoinHandle<()>>,
}

/// Runs at most one gateway turn at a time on a background thread.
pub struct StreamingBridge {
    gateway: Arc<dyn AgentGateway>,
    channel: HandoffChannel,
    next_turn_id: TurnId,
    active: Option<ActiveTurn>,
}

impl StreamingBridge {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self::with_channel(gateway, HandoffChannel::new())
    }

    pub fn with_channel(gateway: Arc<dyn AgentGateway>, channel: HandoffChannel) -> Self {
        Self {
            gateway,
            channel,
            next_turn_id: 1,
            active: None,
        }
    }

    pub fn profile(&self) -> GatewayProfile {
        self.gateway.profile()
    }

    pub fn channel(&self) -> &HandoffChannel {
        &self.channel
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.active.as_ref().map(|active| active.turn_id)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a turn over `conversation` on a new worker thread.
    ///
    /// The worker pushes every fragment in production order, then exactly one
    /// `Terminal` event.
    pub fn begin_turn(&mut self, conversation: Conversation) -> Result<TurnId, BridgeError> {
        if let Some(turn_id) = self.active_turn() {
            return Err(BridgeError::Busy { turn_id });
        }

        let turn_id = self.next_turn_id;
        let gateway = Arc::clone(&self.gateway);
        let channel = self.channel.clone();
        let join_handle = thread::Builder::new()
            .name(format!("{TURN_THREAD_PREFIX}{turn_id}"))
            .spawn(move || run_turn(gateway.as_ref(), &conversation, &channel, turn_id))
            .map_err(BridgeError::Spawn)?;

        self.next_turn_id += 1;
        self.active = Some(ActiveTurn {
            turn_id,
            join_handle: Some(join_handle),
        });
        tracing::info!(turn_id, "turn started");

        Ok(turn_id)
    }

    /// Pops the next event; draining a turn's `Terminal` retires its worker.
    pub fn try_next_event(&mut self) -> Option<OutputEvent> {
        let event = self.channel.try_pop()?;
        if event.is_terminal() {
            self.retire_turn(event.turn_id());
        }
        Some(event)
    }

    fn retire_turn(&mut self, turn_id: TurnId) {
        if self.active_turn() != Some(turn_id) {
            return;
        }

        let Some(mut finished) = self.active.take() else {
            return;
        };

        if let Some(join_handle) = finished.join_handle.take() {
            // The worker exits right after pushing `Terminal`; one still
            // unwinding its stack is left detached.
            if join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }
}

/// Body of a turn worker. Never panics out: gateway panics become a failed
/// `Terminal`.
fn run_turn(
    gateway: &dyn AgentGateway,
    conversation: &Conversation,
    channel: &HandoffChannel,
    turn_id: TurnId,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut fragments = 0usize;
        for fragment in gateway.stream(conversation) {
            let content = fragment.map_err(|error| error.to_string())?;
            if content.is_empty() {
                continue;
            }
            fragments += 1;
            tracing::debug!(turn_id, len = content.len(), "fragment");
            channel.push(OutputEvent::TextFragment { turn_id, content });
        }
        Ok::<usize, String>(fragments)
    }));

    let error = match outcome {
        Ok(Ok(fragments)) => {
            tracing::info!(turn_id, fragments, "turn finished");
            None
        }
        Ok(Err(error)) => {
            let error = if error.trim().is_empty() {
                EMPTY_ERROR_FALLBACK.to_string()
            } else {
                error
            };
            tracing::warn!(turn_id, %error, "turn failed");
            Some(error)
        }
        Err(payload) => {
            let error = format!("agent gateway panicked: {}", panic_message(payload.as_ref()));
            tracing::error!(turn_id, %error, "turn panicked");
            Some(error)
        }
    };

    channel.push(OutputEvent::Terminal { turn_id, error });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
