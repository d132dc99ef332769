use std::sync::Arc;

use thiserror::Error;

use crate::types::Turn;

/// Instructions placed ahead of the document when no custom prompt is configured
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant answering questions about \
the document below on behalf of its owner. Answer only with information found in the document. \
If the document does not contain the answer, say plainly that the information is not available. \
Never invent facts, dates, names or figures that are not in the document.";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PromptError {
    #[error("Request must carry either a conversation history or a non-empty 'q' parameter")]
    MissingInput,
}

/// What a caller supplied for one chat request
#[derive(Debug, Clone, Default)]
pub struct PromptInput {
    /// Prior turns, takes precedence over `query`
    pub history: Option<Vec<Turn>>,
    pub query: Option<String>,
}

impl PromptInput {
    pub fn from_query(query: Option<String>) -> Self {
        Self {
            history: None,
            query,
        }
    }

    pub fn from_history(history: Vec<Turn>) -> Self {
        Self {
            history: Some(history),
            query: None,
        }
    }
}

/// Builds the turn list sent to the provider, always led by the document context
#[derive(Debug, Clone)]
pub struct PromptComposer {
    instructions: String,
    document: Arc<str>,
}

impl PromptComposer {
    pub fn new(document: Arc<str>, instructions: Option<String>) -> Self {
        Self {
            instructions: instructions.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            document,
        }
    }

    pub fn context_turn(&self) -> Turn {
        Turn::context(format!(
            "{}\n\nHere is the document:\n{}",
            self.instructions, self.document
        ))
    }

    pub fn compose(&self, input: PromptInput) -> Result<Vec<Turn>, PromptError> {
        let follow_up = match (input.history, input.query) {
            (Some(history), _) => history,
            (None, Some(query)) if !query.is_empty() => vec![Turn::user(query)],
            _ => return Err(PromptError::MissingInput),
        };

        let mut turns = Vec::with_capacity(follow_up.len() + 1);
        turns.push(self.context_turn());
        turns.extend(follow_up);
        Ok(turns)
    }
}
