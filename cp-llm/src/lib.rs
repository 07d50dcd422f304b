//! BYO-key LLM capability for Copiloto.
//!
//! Pure HTTP clients plus a fallback router; no domain knowledge.

mod anthropic;
mod client;
mod error;
mod openai;
mod router;
mod types;

pub use client::{LlmClient, Provider};
pub use error::{LlmError, Result};
pub use router::LlmRouter;
pub use types::{ChatMessage, ChatResponse, Role, ToolCall, ToolDefinition, Usage};
