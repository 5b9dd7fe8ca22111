//! Model-backed conflict resolution for forksync
//!
//! [`ModelResolver`] implements the engine's `ConflictResolver` capability by
//! asking an OpenAI-compatible chat completions endpoint to rewrite each
//! conflicted file, then staging the results.

pub mod chat;
pub mod error;
pub mod prompt;
pub mod resolver;

pub use chat::{ChatClient, Completion, Message};
pub use error::{Error, Result};
pub use resolver::ModelResolver;
