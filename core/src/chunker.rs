//! Word-boundary buffering of streamed text.

/// Characters a released chunk may end on
pub const DELIMITERS: [char; 6] = [' ', '\n', '.', ',', '!', '?'];

/// Accumulates fragments and releases text only up to the last word boundary,
/// so a client never sees a word cut in half.
#[derive(Debug, Default)]
pub struct WordChunker {
    pending: String,
}

impl WordChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment` and returns everything up to and including the last
    /// delimiter seen so far, or `None` while no boundary is available.
    pub fn absorb(&mut self, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }
        self.pending.push_str(fragment);

        let (idx, delimiter) = self
            .pending
            .char_indices()
            .rev()
            .find(|(_, c)| DELIMITERS.contains(c))?;
        let rest = self.pending.split_off(idx + delimiter.len_utf8());
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Text received but not yet released
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Consumes the chunker, returning the unreleased tail if there is one.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}
