//! Minimal contract between the chat client and a reasoning engine.
//!
//! A gateway receives the whole conversation for one turn and hands back a lazy
//! sequence of text fragments. Transport, model selection and tool execution
//! strategy stay behind the trait; this crate only carries the shared shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(role, text)` entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }
}

/// Ordered, append-only turn history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Returns the most recent user turn, if any.
    #[must_use]
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.text.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl FromIterator<Turn> for Conversation {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

/// Failure raised by a gateway while producing a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model returned an error: {0}")]
    Model(String),
    #[error("tool loop exceeded {limit} steps")]
    ToolLoopLimit { limit: usize },
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Error returned while constructing a gateway, before any turn runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayInitError {
    message: String,
}

impl GatewayInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for GatewayInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for GatewayInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Lazy, single-pass sequence of text fragments for one turn.
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<String, GatewayError>> + Send + 'a>;

/// Immutable metadata describing a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Reasoning engine entry point.
pub trait AgentGateway: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> GatewayProfile;

    /// Starts one turn over the full conversation.
    ///
    /// Called once per turn from a background thread. Iteration may block for
    /// arbitrary time between fragments and may yield an error at any point;
    /// callers stop at the first error.
    fn stream<'a>(&'a self, conversation: &'a Conversation) -> FragmentStream<'a>;
}

/// JSON-schema described tool exposed to a reasoning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Named callable invoked by a gateway with structured arguments.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool. Errors are returned as text for the model to read.
    fn call(&self, arguments: &Value) -> Result<String, String>;
}

/// Name-indexed set of tools shared by gateways.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any previous tool of the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes `name`, reporting unknown tools as an error result.
    pub fn call(&self, name: &str, arguments: &Value) -> Result<String, String> {
        match self.tools.get(name) {
            Some(tool) => tool.call(arguments),
            None => Err(format!("Unknown tool '{name}'")),
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
