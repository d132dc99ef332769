use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::errors::GeminiResult;
use crate::types::Turn;

/// Forward-only sequence of text fragments produced by a remote model.
///
/// `Ok(None)` marks an element that carried no text. It is skipped by consumers
/// and does not end the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = GeminiResult<Option<String>>> + Send>>;

/// Source of streamed model output for a conversation
#[async_trait]
pub trait FragmentProvider: Send + Sync {
    /// Opens a streaming generation session for the given turns.
    ///
    /// Dropping the returned stream releases the session.
    async fn stream(&self, turns: &[Turn]) -> GeminiResult<FragmentStream>;
}
