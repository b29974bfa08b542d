//! Provider-agnostic LLM plumbing for the triad runtime.
//!
//! This crate is deliberately an **orchestration seam**, not an inference
//! engine: it defines the [`ChatModel`] trait the router's disambiguation
//! fallback calls through, and the [`Embedder`] trait the semantic router
//! uses for route scoring. Callers supply a real provider (or the bundled
//! deterministic [`embed::HashEmbedder`] for dependency-free testing);
//! this crate never ships model weights or calls a specific vendor API by
//! default.
//!
//! # Modules
//!
//! - `chat` - `ChatModel` trait and request/response types
//! - `embed` - `Embedder` trait and the deterministic default embedder
//! - `error` - crate-local error type
//! - `provider` - a minimal generic HTTP-backed `ChatModel` adapter

pub mod chat;
pub mod embed;
pub mod error;
pub mod provider;

pub use chat::{ChatModel, ChatRequest, ChatResponse, Message, MessageRole, Usage};
pub use embed::{Embedder, HashEmbedder};
pub use error::{LlmError, Result};
