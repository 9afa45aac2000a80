//! Deterministic gateways for local runs and contract tests.
//!
//! Nothing here talks to a network. [`ScriptedGateway`] replays fixed fragments
//! with optional failure injection; [`EchoGateway`] is the interactive demo used
//! by `HUNTER_PROVIDER=mock`, answering arithmetic through the tool registry.

use std::thread;
use std::time::Duration;

use agent_gateway::{
    AgentGateway, Conversation, FragmentStream, GatewayError, GatewayProfile, ToolRegistry,
};
use serde_json::json;

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

#[derive(Debug, Clone, PartialEq, Eq)]
struct InjectedFailure {
    after: usize,
    message: String,
}

/// Replays the same fragments on every turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedGateway {
    fragments: Vec<String>,
    fragment_delay: Duration,
    failure: Option<InjectedFailure>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fragment_delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Sleeps before each fragment, simulating model latency.
    #[must_use]
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Yields `GatewayError::Other(message)` once `after` fragments were produced.
    #[must_use]
    pub fn failing_after(mut self, after: usize, message: impl Into<String>) -> Self {
        self.failure = Some(InjectedFailure {
            after,
            message: message.into(),
        });
        self
    }
}

impl AgentGateway for ScriptedGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "scripted".to_string(),
        }
    }

    fn stream<'a>(&'a self, _conversation: &'a Conversation) -> FragmentStream<'a> {
        Box::new(ScriptedStream {
            gateway: self,
            index: 0,
            done: false,
        })
    }
}

struct ScriptedStream<'a> {
    gateway: &'a ScriptedGateway,
    index: usize,
    done: bool,
}

impl Iterator for ScriptedStream<'_> {
    type Item = Result<String, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let gateway = self.gateway;
        let failure_due = gateway
            .failure
            .as_ref()
            .filter(|failure| self.index >= failure.after.min(gateway.fragments.len()));

        let item = match (failure_due, gateway.fragments.get(self.index)) {
            (Some(failure), _) => {
                self.done = true;
                Err(GatewayError::other(failure.message.clone()))
            }
            (None, Some(fragment)) => {
                self.index += 1;
                Ok(fragment.clone())
            }
            (None, None) => {
                self.done = true;
                return None;
            }
        };

        if !gateway.fragment_delay.is_zero() {
            thread::sleep(gateway.fragment_delay);
        }

        Some(item)
    }
}

const DEFAULT_TOKEN_DELAY_MS: u64 = 40;
const GREETING: &str = "Hello! I'm a local mock assistant. Ask me to calculate something, \
                        for example `(2 + 3) * 4`.";

/// Demo gateway: evaluates arithmetic prompts through the `calculator` tool and
/// otherwise echoes the prompt back word by word.
#[derive(Debug, Clone)]
pub struct EchoGateway {
    tools: ToolRegistry,
    token_delay: Duration,
}

impl EchoGateway {
    #[must_use]
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            tools,
            token_delay: Duration::from_millis(DEFAULT_TOKEN_DELAY_MS),
        }
    }

    #[must_use]
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    fn reply_for(&self, prompt: &str) -> String {
        let trimmed = prompt.trim();
        let expression = strip_calculation_prefix(trimmed);

        if !expression.is_empty() {
            if let Ok(result) = self
                .tools
                .call("calculator", &json!({ "expression": expression }))
            {
                tracing::debug!(expression, result = %result, "mock gateway used calculator");
                return format!("{expression} = {result}");
            }
        }

        if trimmed.eq_ignore_ascii_case("hello") || trimmed.eq_ignore_ascii_case("hi") {
            return GREETING.to_string();
        }

        format!("You said: {trimmed}")
    }
}

impl AgentGateway for EchoGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "echo".to_string(),
        }
    }

    fn stream<'a>(&'a self, conversation: &'a Conversation) -> FragmentStream<'a> {
        let reply = self.reply_for(conversation.last_user_text().unwrap_or_default());
        let delay = self.token_delay;

        Box::new(split_tokens(&reply).into_iter().map(move |token| {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            Ok(token)
        }))
    }
}

fn strip_calculation_prefix(prompt: &str) -> &str {
    const PREFIXES: [&str; 3] = ["calculate ", "what is ", "compute "];

    let lowered = prompt.to_ascii_lowercase();
    let stripped = PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
        .map_or(prompt, |prefix| &prompt[prefix.len()..]);

    stripped.trim().trim_end_matches('?').trim()
}

/// Splits text into whitespace-terminated tokens, keeping the separators.
#[must_use]
pub fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending_token = String::new();

    for ch in text.chars() {
        pending_token.push(ch);
        if matches!(ch, ' ' | '\n') {
            tokens.push(std::mem::take(&mut pending_token));
        }
    }

    if !pending_token.is_empty() {
        tokens.push(pending_token);
    }

    tokens
}
