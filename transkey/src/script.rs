//! Line-oriented key scripts for driving a keyboard from text.
//!
//! A line is a sequence of whitespace-separated tokens. Plain words type
//! their letters; `:`-prefixed tokens are named keys or session commands:
//!
//! | token | action |
//! |---|---|
//! | `:space` `:return` `:delete` `:toggle` | named keys |
//! | `:up` `:down` | move the candidate highlight |
//! | `:1` .. `:N` | select candidate N (1-based) |
//! | `:orig` `:trans` | final choice: original or translation |
//! | `:wait` | block until requested translations arrive |
//! | `:purge` | simulate a low-memory notification |

use thiserror::Error;
use transkey_core::{HostSink, KeyEvent};

/// One parsed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Key(KeyEvent),
    /// `true` commits the translation
    Choose(bool),
    Wait,
    Purge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown token '{0}'")]
pub struct UnknownToken(pub String);

fn parse_command(cmd: &str) -> Option<Action> {
    let action = match cmd {
        "space" => Action::Key(KeyEvent::Space),
        "return" | "enter" => Action::Key(KeyEvent::Return),
        "delete" | "bs" => Action::Key(KeyEvent::Delete),
        "toggle" => Action::Key(KeyEvent::ModeToggle),
        "up" => Action::Key(KeyEvent::SelectionUp),
        "down" => Action::Key(KeyEvent::SelectionDown),
        "orig" => Action::Choose(false),
        "trans" => Action::Choose(true),
        "wait" => Action::Wait,
        "purge" => Action::Purge,
        n => {
            let index: usize = n.parse().ok()?;
            Action::Key(KeyEvent::Select(index.checked_sub(1)?))
        }
    };
    Some(action)
}

/// Parse a script line into actions.
pub fn parse_line(line: &str) -> Result<Vec<Action>, UnknownToken> {
    let mut actions = Vec::new();
    for token in line.split_whitespace() {
        if let Some(cmd) = token.strip_prefix(':') {
            let action = parse_command(cmd).ok_or_else(|| UnknownToken(token.to_string()))?;
            actions.push(action);
            continue;
        }
        for ch in token.chars() {
            match KeyEvent::from_key_name(ch.encode_utf8(&mut [0; 4])) {
                Some(key) => actions.push(Action::Key(key)),
                None => return Err(UnknownToken(token.to_string())),
            }
        }
    }
    Ok(actions)
}

/// In-memory document standing in for the host's text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl HostSink for Document {
    fn insert_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn delete_backward(&mut self) {
        self.text.pop();
    }
}
