//! Composition buffer: the pending phonetic input of the current session.
//!
//! The buffer is a two-state machine. `Idle` holds nothing; `Composing`
//! always holds at least one character, so "composing with an empty buffer"
//! is not representable.
//!
//! ```text
//!   Idle ──append_letter──▶ Composing ──append_letter──▶ Composing
//!    ▲                          │
//!    └── delete (last char) / commit / clear
//! ```
//!
//! Every operation is total: nothing here can fail.

/// State of the composition buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompositionState {
    /// No pending input.
    #[default]
    Idle,
    /// Pending phonetic input; never empty.
    Composing(String),
}

/// What a `delete()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A character was removed from the pending input.
    Removed(char),
    /// Nothing was pending; the host should delete backward itself.
    ForwardToHost,
}

/// Pending phonetic input built from raw letter keys.
#[derive(Debug, Clone, Default)]
pub struct CompositionBuffer {
    state: CompositionState,
}

impl CompositionBuffer {
    /// Create an idle buffer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CompositionState {
        &self.state
    }

    /// Pending input, empty when idle.
    pub fn text(&self) -> &str {
        match &self.state {
            CompositionState::Idle => "",
            CompositionState::Composing(buf) => buf,
        }
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.state, CompositionState::Composing(_))
    }

    /// Length of the pending input in characters.
    pub fn len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_composing()
    }

    /// Append a letter, lower-cased. Enters `Composing` from `Idle`.
    pub fn append_letter(&mut self, ch: char) {
        match &mut self.state {
            CompositionState::Composing(buf) => buf.extend(ch.to_lowercase()),
            CompositionState::Idle => {
                self.state = CompositionState::Composing(ch.to_lowercase().collect());
            }
        }
    }

    /// Remove the last pending character.
    ///
    /// Removing the only character returns the buffer to `Idle`. When already
    /// idle the buffer is untouched and the caller is told to forward the
    /// delete to the host.
    pub fn delete(&mut self) -> DeleteOutcome {
        let CompositionState::Composing(buf) = &mut self.state else {
            return DeleteOutcome::ForwardToHost;
        };
        let Some(removed) = buf.pop() else {
            self.state = CompositionState::Idle;
            return DeleteOutcome::ForwardToHost;
        };
        if buf.is_empty() {
            self.state = CompositionState::Idle;
        }
        DeleteOutcome::Removed(removed)
    }

    /// Take the pending input (possibly empty) and return to `Idle`.
    pub fn commit(&mut self) -> String {
        match std::mem::take(&mut self.state) {
            CompositionState::Idle => String::new(),
            CompositionState::Composing(buf) => buf,
        }
    }

    /// Discard any pending input.
    pub fn clear(&mut self) {
        self.state = CompositionState::Idle;
    }
}
