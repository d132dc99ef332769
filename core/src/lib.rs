// Core pieces of the document chat service:
// - Streaming client for the Gemini API
// - Conversation turns and prompt composition
// - Word-boundary chunking of streamed text
// - Document text extraction
// - Configuration and shared error types

// Export client module - streaming API client for Gemini
pub mod client;
pub use client::GeminiClient;

// Export types module - request/response data structures and conversation turns
pub mod types;
pub use types::{Role, Turn};

// Export config module - client configuration
pub mod config;
pub use config::GeminiConfig;

// Export errors module - shared error types
pub mod errors;
pub use errors::{GeminiError, GeminiResult};

pub mod chunker;
pub mod document;
pub mod prompt;
pub mod provider;

pub use chunker::WordChunker;
pub use document::{load_document, DocumentError};
pub use prompt::{PromptComposer, PromptError, PromptInput};
pub use provider::{FragmentProvider, FragmentStream};
