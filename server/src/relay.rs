//! Turns provider fragments into word-aligned chunks for the response body.

use std::time::Duration;

use docchat_core::{FragmentStream, GeminiError, WordChunker};
use futures::stream::{self, Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Stands in for timeouts too large to represent as an instant
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Per-request streaming behavior
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    pub timeout: Duration,
    pub flush_remainder: bool,
}

impl RelayOptions {
    /// Deadline for a request starting now. Covers opening the provider
    /// stream as well as relaying it.
    pub fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.timeout).unwrap_or_else(|| now + FAR_FUTURE)
    }
}

struct Relay {
    fragments: FragmentStream,
    /// `None` once the stream has ended
    chunker: Option<WordChunker>,
    deadline: Instant,
    options: RelayOptions,
}

impl Relay {
    async fn next_chunk(&mut self) -> Option<Result<String, GeminiError>> {
        loop {
            let chunker = self.chunker.as_mut()?;

            let next = match tokio::time::timeout_at(self.deadline, self.fragments.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(timeout_secs = self.options.timeout.as_secs(), "Request timed out");
                    self.chunker = None;
                    return Some(Err(GeminiError::Timeout(self.options.timeout.as_secs())));
                }
            };

            match next {
                Some(Ok(Some(fragment))) if fragment.is_empty() => {
                    debug!("Skipping empty fragment");
                }
                Some(Ok(Some(fragment))) => {
                    if let Some(chunk) = chunker.absorb(&fragment) {
                        return Some(Ok(chunk));
                    }
                }
                Some(Ok(None)) => {
                    debug!("Skipping fragment without text");
                }
                Some(Err(e)) => {
                    error!(error = %e, "Provider stream failed");
                    self.chunker = None;
                    return Some(Err(e));
                }
                None => {
                    let remainder = self.chunker.take().and_then(WordChunker::finish);
                    info!("Provider stream complete");
                    if self.options.flush_remainder {
                        return remainder.map(Ok);
                    }
                    if let Some(dropped) = remainder {
                        debug!(dropped_len = dropped.len(), "Dropping text after last word boundary");
                    }
                    return None;
                }
            }
        }
    }
}

/// Relays `fragments` as word-aligned chunks, in order, until the provider is
/// exhausted, fails or `deadline` passes. Errors end the stream.
pub fn chunk_stream(
    fragments: FragmentStream,
    options: RelayOptions,
    deadline: Instant,
    span: Span,
) -> impl Stream<Item = Result<String, GeminiError>> + Send + 'static {
    let relay = Relay {
        fragments,
        chunker: Some(WordChunker::new()),
        deadline,
        options,
    };

    stream::unfold(relay, move |mut relay| {
        async move {
            let chunk = relay.next_chunk().await?;
            Some((chunk, relay))
        }
        .instrument(span.clone())
    })
}
