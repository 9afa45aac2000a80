//! Transport-only client for the Gemini `streamGenerateContent` endpoint.
//!
//! This crate builds requests, streams server-sent events and normalizes them
//! into [`StreamEvent`]s. It knows nothing about conversations, tools or the
//! chat UI; the gateway crate layers the tool loop on top.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod url;

pub use client::{GeminiApiClient, GenerateStream};
pub use config::GeminiApiConfig;
pub use error::GeminiApiError;
pub use events::{FunctionCall, StreamEvent};
pub use payload::{
    Content, FunctionDeclaration, FunctionResponse, GenerateContentRequest, Part, ToolDeclaration,
};
pub use sse::SseStreamParser;
pub use url::stream_generate_content_url;
