use std::sync::Arc;

use agent_gateway::{AgentGateway, Conversation, GatewayProfile};

use crate::app::{App, InputAction, TurnHost, STARTUP_HINT};
use crate::bridge::{BridgeError, StreamingBridge, TurnId};

/// The controller paired with its bridge, built once at startup and owned by
/// the UI loop.
pub struct Session {
    app: App,
    bridge: StreamingBridge,
    profile: GatewayProfile,
    needs_render: bool,
}

struct BridgeHost<'a> {
    bridge: &'a mut StreamingBridge,
    needs_render: &'a mut bool,
}

impl TurnHost for BridgeHost<'_> {
    fn begin_turn(&mut self, conversation: Conversation) -> Result<TurnId, BridgeError> {
        self.bridge.begin_turn(conversation)
    }

    fn request_render(&mut self) {
        *self.needs_render = true;
    }
}

impl Session {
    pub fn new(gateway: Arc<dyn AgentGateway>, system_instructions: &str) -> Self {
        let bridge = StreamingBridge::new(gateway);
        let profile = bridge.profile();
        let mut app = App::with_system_instructions(system_instructions);
        app.push_system_line(STARTUP_HINT);

        Self {
            app,
            bridge,
            profile,
            needs_render: true,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn profile(&self) -> &GatewayProfile {
        &self.profile
    }

    pub fn should_exit(&self) -> bool {
        self.app.should_exit
    }

    pub fn apply(&mut self, action: InputAction) {
        self.with_app_mut(|app, host| app.apply(action, host));
    }

    /// Replaces the input line with `text` and submits it.
    pub fn submit(&mut self, text: &str) {
        self.with_app_mut(|app, host| {
            app.on_input_replace(text);
            app.on_submit(host);
        });
    }

    /// Drains every queued output event into the controller, in order.
    ///
    /// Returns how many events were applied.
    pub fn poll(&mut self) -> usize {
        let mut drained = 0usize;
        while let Some(event) = self.bridge.try_next_event() {
            let mut host = BridgeHost {
                bridge: &mut self.bridge,
                needs_render: &mut self.needs_render,
            };
            self.app.on_output_event(event, &mut host);
            drained += 1;
        }
        drained
    }

    /// Returns whether a redraw was requested since the last call.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_render)
    }

    fn with_app_mut(&mut self, f: impl FnOnce(&mut App, &mut dyn TurnHost)) {
        let mut host = BridgeHost {
            bridge: &mut self.bridge,
            needs_render: &mut self.needs_render,
        };
        f(&mut self.app, &mut host);
    }
}
