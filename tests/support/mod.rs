#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use agent_gateway::{AgentGateway, Conversation, FragmentStream, GatewayError, GatewayProfile};
use hunter::app::TurnHost;
use hunter::bridge::{BridgeError, TurnId};
use hunter::session::Session;

pub const TURN_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls `session` until no turn is running.
pub fn wait_for_idle(session: &mut Session) {
    let deadline = Instant::now() + TURN_TIMEOUT;
    loop {
        session.poll();
        if !session.app().is_running() {
            return;
        }
        assert!(Instant::now() < deadline, "turn did not finish in time");
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn session_with(gateway: impl AgentGateway) -> Session {
    Session::new(Arc::new(gateway), "")
}

/// Records every request instead of starting workers.
#[derive(Default)]
pub struct HostSpy {
    pub started: Vec<Conversation>,
    pub renders: usize,
    pub fail_with: Option<String>,
    next_turn: TurnId,
}

impl HostSpy {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

impl TurnHost for HostSpy {
    fn begin_turn(&mut self, conversation: Conversation) -> Result<TurnId, BridgeError> {
        if let Some(message) = self.fail_with.as_deref() {
            return Err(BridgeError::Spawn(std::io::Error::other(message.to_string())));
        }
        self.started.push(conversation);
        self.next_turn += 1;
        Ok(self.next_turn)
    }

    fn request_render(&mut self) {
        self.renders += 1;
    }
}

/// Panics on the first fragment request.
pub struct PanickingGateway;

impl AgentGateway for PanickingGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            provider_id: "test".to_string(),
            model_id: "panicking".to_string(),
        }
    }

    fn stream<'a>(&'a self, _conversation: &'a Conversation) -> FragmentStream<'a> {
        Box::new(std::iter::from_fn(|| -> Option<Result<String, GatewayError>> {
            panic!("gateway exploded")
        }))
    }
}
