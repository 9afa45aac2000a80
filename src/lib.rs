//! Terminal chat client for tool-augmented conversational agents.
//!
//! Replies stream from an [`agent_gateway::AgentGateway`] on a background
//! worker and are handed to the UI thread through a thread-safe queue
//! ([`bridge::HandoffChannel`]). Only the UI thread touches [`app::App`].
//!
//! # Layout
//! - [`app`]: controller state machine and transcript updates.
//! - [`bridge`]: turn workers and the hand-off channel.
//! - [`session`]: controller and bridge wired together.
//! - [`ui`]: ratatui rendering and the crossterm event loop.
//! - [`config`], [`logging`], [`providers`], [`tools`]: startup plumbing.

pub mod app;
pub mod bridge;
pub mod config;
pub mod input;
pub mod logging;
pub mod providers;
pub mod session;
pub mod tools;
pub mod transcript;
pub mod ui;

pub use crate::app::{App, InputAction, TurnHost, TurnState};
pub use crate::bridge::{BridgeError, HandoffChannel, OutputEvent, StreamingBridge, TurnId};
pub use crate::config::{ConfigError, HunterConfig, ProviderKind};
pub use crate::session::Session;
pub use crate::transcript::{Segment, Transcript};
