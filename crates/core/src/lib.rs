//! # judgebot core
//!
//! Domain types, traits, and error definitions shared by every judgebot crate.
//! Nothing in here talks to the network or the filesystem.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`] in `judgebot-providers`
//! - [`Tool`] in `judgebot-tools`
//! - [`Embedder`] in `judgebot-rules`
//!
//! This keeps tests cheap: the agent loop can be driven by a scripted provider
//! and the rules index by a deterministic embedder.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod schema;
pub mod embedding;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, IndexError, ProviderError, ToolError, TranscriptError};
pub use message::{AssistantTurn, ConversationId, Message, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolFailure, ToolRegistry, ToolResult};
pub use schema::{InputSchema, Param, ParamKind};
pub use embedding::Embedder;
pub use event::{DomainEvent, EventBus};
