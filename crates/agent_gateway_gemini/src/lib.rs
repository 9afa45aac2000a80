//! Gemini-backed implementation of the `agent_gateway` contract.
//!
//! Each turn is a small tool loop: stream one `streamGenerateContent` step,
//! yield its text parts as fragments, run any requested functions through the
//! [`ToolRegistry`] and feed the results into the next step.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use agent_gateway::{
    AgentGateway, Conversation, FragmentStream, GatewayError, GatewayInitError, GatewayProfile,
    Role, ToolRegistry,
};
use gemini_api::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GeminiApiClient,
    GeminiApiConfig, GeminiApiError, GenerateContentRequest, GenerateStream, Part, StreamEvent,
};

pub use gemini_api::config::DEFAULT_GEMINI_MODEL;

/// Stable provider identifier shown in the status line.
pub const GEMINI_PROVIDER_ID: &str = "gemini";

/// Upper bound on model steps (requests) per turn.
pub const MAX_STEPS: usize = 8;

/// Runtime configuration for the Gemini gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiGatewayConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl GeminiGatewayConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_api_config(self) -> GeminiApiConfig {
        let mut config = GeminiApiConfig::new(self.api_key).with_model(self.model.trim());

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

type StepEvents = Box<dyn Iterator<Item = Result<StreamEvent, GeminiApiError>> + Send>;

/// Opens one model step and hands back its events as a blocking iterator.
trait StepClient: Send + Sync {
    fn open_step(&self, request: &GenerateContentRequest) -> Result<StepEvents, GeminiApiError>;
}

struct DefaultStepClient {
    client: GeminiApiClient,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl StepClient for DefaultStepClient {
    fn open_step(&self, request: &GenerateContentRequest) -> Result<StepEvents, GeminiApiError> {
        let stream = self.runtime.block_on(self.client.open_stream(request))?;
        Ok(Box::new(BlockingEvents {
            runtime: Arc::clone(&self.runtime),
            stream,
        }))
    }
}

struct BlockingEvents {
    runtime: Arc<tokio::runtime::Runtime>,
    stream: GenerateStream,
}

impl Iterator for BlockingEvents {
    type Item = Result<StreamEvent, GeminiApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next_event())
    }
}

/// `AgentGateway` adapter backed by `gemini_api` transport primitives.
pub struct GeminiGateway {
    model_id: String,
    tools: ToolRegistry,
    step_client: Arc<dyn StepClient>,
}

impl GeminiGateway {
    /// Creates a gateway using real Gemini transport.
    pub fn new(config: GeminiGatewayConfig, tools: ToolRegistry) -> Result<Self, GatewayInitError> {
        let model_id = config.model.trim().to_string();
        let client = GeminiApiClient::new(config.into_api_config()).map_err(map_init_error)?;
        // A current-thread runtime is only driven from inside `block_on`, so it
        // must outlive every response body opened on it.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                GatewayInitError::new(format!("failed to initialize tokio runtime: {error}"))
            })?;

        Ok(Self {
            model_id,
            tools,
            step_client: Arc::new(DefaultStepClient {
                client,
                runtime: Arc::new(runtime),
            }),
        })
    }

    #[cfg(test)]
    fn with_step_client_for_tests(tools: ToolRegistry, step_client: Arc<dyn StepClient>) -> Self {
        Self {
            model_id: "gemini-test".to_string(),
            tools,
            step_client,
        }
    }

    fn function_declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .definitions()
            .into_iter()
            .map(|definition| FunctionDeclaration {
                name: definition.name,
                description: definition.description,
                parameters: definition.input_schema,
            })
            .collect()
    }
}

impl AgentGateway for GeminiGateway {
    fn profile(&self) -> GatewayProfile {
        GatewayProfile {
            provider_id: GEMINI_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn stream<'a>(&'a self, conversation: &'a Conversation) -> FragmentStream<'a> {
        let (system_instruction, contents) = conversation_to_contents(conversation);
        Box::new(GeminiTurn {
            gateway: self,
            system_instruction,
            declarations: self.function_declarations(),
            contents,
            steps: 0,
            current: None,
            model_parts: Vec::new(),
            calls: VecDeque::new(),
            done: false,
        })
    }
}

/// Splits a conversation into the system instruction and Gemini `contents`.
fn conversation_to_contents(conversation: &Conversation) -> (String, Vec<Content>) {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for turn in conversation {
        if turn.text.trim().is_empty() {
            continue;
        }
        match turn.role {
            Role::System => system.push(turn.text.as_str()),
            Role::User => contents.push(Content::user(vec![Part::text(turn.text.clone())])),
            Role::Assistant => contents.push(Content::model(vec![Part::text(turn.text.clone())])),
        }
    }

    (system.join("\n\n"), contents)
}

struct GeminiTurn<'a> {
    gateway: &'a GeminiGateway,
    system_instruction: String,
    declarations: Vec<FunctionDeclaration>,
    contents: Vec<Content>,
    steps: usize,
    current: Option<StepEvents>,
    model_parts: Vec<Part>,
    calls: VecDeque<FunctionCall>,
    done: bool,
}

impl GeminiTurn<'_> {
    fn request(&self) -> GenerateContentRequest {
        GenerateContentRequest::new(self.contents.clone())
            .with_system_instruction(self.system_instruction.clone())
            .with_functions(self.declarations.clone())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Part {
            text: Some(existing),
            ..
        }) = self.model_parts.last_mut()
        {
            existing.push_str(text);
            return;
        }
        self.model_parts.push(Part::text(text));
    }

    /// Closes the current step. Returns `true` when another step is needed.
    fn finish_step(&mut self) -> bool {
        if self.calls.is_empty() {
            return false;
        }

        let mut model_parts = std::mem::take(&mut self.model_parts);
        let mut responses = Vec::with_capacity(self.calls.len());

        while let Some(call) = self.calls.pop_front() {
            tracing::info!(tool = %call.name, step = self.steps, "running tool call");
            let response = match self.gateway.tools.call(&call.name, &call.args) {
                Ok(result) => FunctionResponse::success(&call.name, result),
                Err(error) => {
                    tracing::warn!(tool = %call.name, %error, "tool call failed");
                    FunctionResponse::error(&call.name, error)
                }
            };
            model_parts.push(Part::function_call(call));
            responses.push(Part::function_response(response));
        }

        self.contents.push(Content::model(model_parts));
        self.contents.push(Content::user(responses));
        true
    }

    fn fail(&mut self, error: GatewayError) -> Option<Result<String, GatewayError>> {
        self.done = true;
        self.current = None;
        Some(Err(error))
    }
}

impl Iterator for GeminiTurn<'_> {
    type Item = Result<String, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.current.is_none() {
                if self.steps >= MAX_STEPS {
                    return self.fail(GatewayError::ToolLoopLimit { limit: MAX_STEPS });
                }
                self.steps += 1;
                tracing::debug!(step = self.steps, contents = self.contents.len(), "opening Gemini step");

                let request = self.request();
                match self.gateway.step_client.open_step(&request) {
                    Ok(events) => self.current = Some(events),
                    Err(error) => return self.fail(map_api_error(error)),
                }
            }

            let event = match self.current.as_mut() {
                Some(events) => events.next(),
                None => continue,
            };

            match event {
                Some(Ok(StreamEvent::Text(text))) => {
                    self.push_text(&text);
                    return Some(Ok(text));
                }
                Some(Ok(StreamEvent::FunctionCall(call))) => self.calls.push_back(call),
                Some(Ok(StreamEvent::Finished { reason })) => {
                    tracing::debug!(%reason, step = self.steps, "Gemini step finished");
                }
                Some(Ok(StreamEvent::Blocked { reason })) => {
                    return self.fail(GatewayError::Model(format!("response blocked: {reason}")));
                }
                Some(Ok(StreamEvent::Error { message })) => {
                    return self.fail(GatewayError::Model(message));
                }
                Some(Err(error)) => return self.fail(map_api_error(error)),
                None => {
                    self.current = None;
                    if !self.finish_step() {
                        self.done = true;
                        return None;
                    }
                }
            }
        }
    }
}

fn map_api_error(error: GeminiApiError) -> GatewayError {
    match error {
        GeminiApiError::StreamFailed(message) => GatewayError::Model(message),
        GeminiApiError::Status(status, message) => {
            GatewayError::Transport(format!("Gemini API request failed ({status}): {message}"))
        }
        other => GatewayError::Transport(format!("Gemini API request failed: {other}")),
    }
}

fn map_init_error(error: GeminiApiError) -> GatewayInitError {
    GatewayInitError::new(format!("Failed to initialize gemini provider: {error}"))
}
