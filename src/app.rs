use agent_gateway::{Conversation, Role, Turn};

use crate::bridge::{BridgeError, OutputEvent, TurnId};
use crate::input::{InputHistory, InputLine};
use crate::transcript::Transcript;

pub const STARTUP_HINT: &str = "Type a message and press Enter.";
pub const USER_PREFIX: &str = "You: ";
pub const ASSISTANT_PREFIX: &str = "Assistant: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Running { turn_id: TurnId },
}

/// Side effects the controller asks of its host.
pub trait TurnHost {
    fn begin_turn(&mut self, conversation: Conversation) -> Result<TurnId, BridgeError>;
    fn request_render(&mut self);
}

/// Editing and control actions decoded from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Insert(char),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    HistoryPrevious,
    HistoryNext,
    Submit,
    ControlC,
    Quit,
}

/// Transcript controller state machine.
///
/// Owns the model-facing conversation, the visible transcript and the input
/// line. All transitions run on the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub state: TurnState,
    pub input: InputLine,
    pub transcript: Transcript,
    conversation: Conversation,
    /// Assistant text of the running turn, committed on success.
    pending_reply: Option<String>,
    history: InputHistory,
    pub should_exit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            state: TurnState::Idle,
            input: InputLine::default(),
            transcript: Transcript::new(),
            conversation: Conversation::new(),
            pending_reply: None,
            history: InputHistory::default(),
            should_exit: false,
        }
    }

    /// Starts the conversation with a leading system turn.
    pub fn with_system_instructions(system_instructions: &str) -> Self {
        let mut app = Self::new();
        if !system_instructions.trim().is_empty() {
            app.conversation
                .push(Turn::system(system_instructions.trim()));
        }
        app
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn history_entries(&self) -> &[String] {
        self.history.entries()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TurnState::Running { .. })
    }

    /// Whether the send affordance is enabled.
    pub fn can_send(&self) -> bool {
        !self.is_running() && !self.should_exit
    }

    /// Appends a full system line to the transcript.
    pub fn push_system_line(&mut self, text: &str) {
        self.transcript.append(Role::System, text);
        self.transcript.append(Role::System, "\n");
    }

    pub fn apply(&mut self, action: InputAction, host: &mut dyn TurnHost) {
        match action {
            InputAction::Insert(ch) => self.edit(|input| input.insert_char(ch)),
            InputAction::Backspace => self.edit(InputLine::backspace),
            InputAction::Delete => self.edit(InputLine::delete),
            InputAction::CursorLeft => self.input.move_left(),
            InputAction::CursorRight => self.input.move_right(),
            InputAction::CursorHome => self.input.move_home(),
            InputAction::CursorEnd => self.input.move_end(),
            InputAction::HistoryPrevious => self.on_history_previous(),
            InputAction::HistoryNext => self.on_history_next(),
            InputAction::Submit => {
                self.on_submit(host);
                return;
            }
            InputAction::ControlC => {
                self.on_control_c(host);
                return;
            }
            InputAction::Quit => {
                self.on_quit(host);
                return;
            }
        }

        host.request_render();
    }

    fn edit(&mut self, change: impl FnOnce(&mut InputLine)) {
        change(&mut self.input);
        self.history.reset_navigation();
    }

    pub fn on_input_replace(&mut self, text: impl Into<String>) {
        self.input.set(text);
        self.history.reset_navigation();
    }

    pub fn on_history_previous(&mut self) {
        if let Some(previous) = self.history.previous(self.input.as_str()) {
            self.input.set(previous);
        }
    }

    pub fn on_history_next(&mut self) {
        if let Some(next) = self.history.next() {
            self.input.set(next);
        }
    }

    /// Submits the input line. Ignored while a turn runs or when blank.
    pub fn on_submit(&mut self, host: &mut dyn TurnHost) {
        if self.is_running() || self.should_exit {
            tracing::debug!("submission ignored while a turn is running");
            return;
        }

        let submitted = self.input.take();
        let prompt = submitted.trim().to_string();
        if prompt.is_empty() {
            host.request_render();
            return;
        }

        if is_quit_command(&prompt) {
            self.on_quit(host);
            return;
        }

        match host.begin_turn(self.conversation_with_user_prompt(&prompt)) {
            Ok(turn_id) => {
                self.history.record_entry(prompt.clone());
                self.transcript
                    .append(Role::User, &format!("{USER_PREFIX}{prompt}\n"));
                self.conversation.push(Turn::user(prompt));
                self.state = TurnState::Running { turn_id };
                self.pending_reply = Some(String::new());
                self.transcript.append(Role::Assistant, ASSISTANT_PREFIX);
            }
            Err(error) => {
                tracing::error!(%error, "failed to start turn");
                self.push_system_line(&format!("[Error] Failed to start turn: {error}"));
                // Nothing was sent; keep the text so it can be retried.
                self.input.set(submitted);
            }
        }

        host.request_render();
    }

    fn conversation_with_user_prompt(&self, prompt: &str) -> Conversation {
        let mut conversation = self.conversation.clone();
        conversation.push(Turn::user(prompt));
        conversation
    }

    pub fn on_output_event(&mut self, event: OutputEvent, host: &mut dyn TurnHost) {
        if !self.is_active_turn(event.turn_id()) {
            tracing::debug!(turn_id = event.turn_id(), "dropping event for inactive turn");
            return;
        }

        match event {
            OutputEvent::TextFragment { content, .. } => {
                self.transcript.append(Role::Assistant, &content);
                if let Some(pending) = self.pending_reply.as_mut() {
                    pending.push_str(&content);
                }
            }
            OutputEvent::Terminal { error, .. } => {
                self.transcript.append(Role::Assistant, "\n");
                let pending = self.pending_reply.take();
                match error {
                    Some(error) => {
                        self.push_system_line(&format!("[Error] {error}"));
                    }
                    None => {
                        self.conversation
                            .push(Turn::assistant(pending.unwrap_or_default()));
                    }
                }
                self.state = TurnState::Idle;
            }
        }

        host.request_render();
    }

    pub fn on_control_c(&mut self, host: &mut dyn TurnHost) {
        if !self.input.is_empty() {
            self.on_input_replace(String::new());
            host.request_render();
            return;
        }

        self.on_quit(host);
    }

    pub fn on_quit(&mut self, host: &mut dyn TurnHost) {
        self.should_exit = true;
        host.request_render();
    }

    fn is_active_turn(&self, turn_id: TurnId) -> bool {
        matches!(self.state, TurnState::Running { turn_id: active } if active == turn_id)
    }
}

/// `quit` or `/quit`, case-insensitive.
fn is_quit_command(prompt: &str) -> bool {
    let command = prompt.strip_prefix('/').unwrap_or(prompt);
    command.eq_ignore_ascii_case("quit")
}
