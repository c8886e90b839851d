//! Keyboard orchestrator with mode handling and the commit protocol.
//!
//! `Keyboard` ties the composition buffer, the candidate resolver and the
//! translation pipeline together. The platform feeds it key events through
//! `on_key()`, calls `pump()` from its event loop to receive finished
//! translations, and reads `context()` to redraw.
//!
//! All methods run on the foreground context. Translation results are only
//! ever applied from `pump()` / `wait_for_translations()`, so keyboard state
//! has a single writer.

use tracing::debug;

use crate::candidate::Direction;
use crate::composition::{CompositionBuffer, DeleteOutcome};
use crate::resolver::CandidateResolver;
use crate::service::{CompletionService, HostSink};
use crate::translation::{OutcomeStatus, Task, TranslationOutcome, TranslationPipeline};
use crate::Config;

/// Key events the keyboard can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Letter key (any alphabetic character, either case)
    Letter(char),
    /// Delete / backspace key
    Delete,
    /// Space bar (select highlighted candidate or insert a space)
    Space,
    /// Return key (select highlighted candidate or insert a newline)
    Return,
    /// Translate-mode toggle button
    ModeToggle,
    /// Tap on the candidate at this index
    Select(usize),
    /// Move the candidate highlight towards the start
    SelectionUp,
    /// Move the candidate highlight towards the end
    SelectionDown,
}

impl KeyEvent {
    /// Map a key name as reported by the keyboard layout.
    ///
    /// Named keys are `"delete"`, `"space"`, `"return"` and
    /// `"translate_toggle"`; any single letter is a `Letter`.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "delete" => Some(Self::Delete),
            "space" => Some(Self::Space),
            "return" => Some(Self::Return),
            "translate_toggle" => Some(Self::ModeToggle),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if ch.is_alphabetic() => Some(Self::Letter(ch)),
                    _ => None,
                }
            }
        }
    }
}

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Key was handled by the keyboard
    Handled,
    /// Key was not handled (ignored)
    NotHandled,
}

/// What happens to a selected candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMode {
    /// Commit the candidate as-is.
    DirectInsert,
    /// Translate the candidate, then let the user pick original or translation.
    TranslateThenChoose,
}

impl InputMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::DirectInsert => Self::TranslateThenChoose,
            Self::TranslateThenChoose => Self::DirectInsert,
        }
    }

    pub fn is_translate(self) -> bool {
        self == Self::TranslateThenChoose
    }
}

/// Original and translated forms of a selection, waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationChoice {
    pub original: String,
    /// Equals `original` when translation failed.
    pub translated: String,
    pub status: OutcomeStatus,
}

impl From<TranslationOutcome> for TranslationChoice {
    fn from(outcome: TranslationOutcome) -> Self {
        Self {
            original: outcome.original,
            translated: outcome.text,
            status: outcome.status,
        }
    }
}

/// Keyboard state for the presentation layer.
///
/// Plain data, refreshed after every state change. The platform reads these
/// fields to draw the input display, candidate bar and translation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardContext {
    /// Phonetic text being composed
    pub preedit_text: String,

    /// Candidates for the current preedit
    pub candidates: Vec<String>,

    /// Highlighted candidate index (0-based)
    pub candidate_cursor: usize,

    /// Translation options awaiting a final choice
    pub pending_choice: Option<TranslationChoice>,

    /// A translation has been requested and not delivered yet
    pub translating: bool,

    /// Status line (mode, candidate count)
    pub auxiliary_text: String,
}

impl KeyboardContext {
    /// Check if there's any visible state (preedit, candidates or a choice).
    pub fn has_visible_state(&self) -> bool {
        !self.preedit_text.is_empty() || !self.candidates.is_empty() || self.pending_choice.is_some()
    }
}

/// The keyboard session.
///
/// Owns the host sink it types into; `host()` / `host_mut()` give the
/// embedding application access to it.
pub struct Keyboard<C, H> {
    composition: CompositionBuffer,
    resolver: CandidateResolver<C>,
    pipeline: TranslationPipeline,
    mode: InputMode,
    host: H,
    /// Translation of the latest selection, if not delivered yet
    in_flight: Option<Task<TranslationOutcome>>,
    context: KeyboardContext,
}

impl<C: CompletionService, H: HostSink> Keyboard<C, H> {
    /// Create a keyboard in the mode chosen by `config`.
    pub fn new(config: &Config, service: C, pipeline: TranslationPipeline, host: H) -> Self {
        let mut keyboard = Self {
            composition: CompositionBuffer::new(),
            resolver: CandidateResolver::new(service, config),
            pipeline,
            mode: config.initial_mode(),
            host,
            in_flight: None,
            context: KeyboardContext::default(),
        };
        keyboard.sync_context();
        keyboard
    }

    /// Process a key event.
    ///
    /// After calling this, read `context()` to update the UI. Text destined
    /// for the document goes straight to the host sink.
    pub fn on_key(&mut self, key: KeyEvent) -> KeyResult {
        let result = match key {
            KeyEvent::Letter(ch) => {
                if !ch.is_alphabetic() {
                    return KeyResult::NotHandled;
                }
                self.composition.append_letter(ch);
                self.refresh_candidates();
                KeyResult::Handled
            }
            KeyEvent::Delete => {
                match self.composition.delete() {
                    DeleteOutcome::Removed(_) => self.refresh_candidates(),
                    DeleteOutcome::ForwardToHost => self.host.delete_backward(),
                }
                KeyResult::Handled
            }
            KeyEvent::Space => self.commit_or_forward(" "),
            KeyEvent::Return => self.commit_or_forward("\n"),
            KeyEvent::ModeToggle => {
                self.mode = self.mode.toggled();
                debug!(mode = ?self.mode, "input mode toggled");
                self.clear_input();
                KeyResult::Handled
            }
            KeyEvent::Select(index) => match self.resolver.select_candidate(index) {
                Some(candidate) => {
                    self.on_selection(&candidate);
                    KeyResult::Handled
                }
                None => KeyResult::NotHandled,
            },
            KeyEvent::SelectionUp => self.move_selection(Direction::Previous),
            KeyEvent::SelectionDown => self.move_selection(Direction::Next),
        };
        self.sync_context();
        result
    }

    /// Space / Return: the highlighted candidate counts as selected. Without
    /// candidates, pending phonetic input is committed raw and the whitespace
    /// goes to the host.
    fn commit_or_forward(&mut self, whitespace: &str) -> KeyResult {
        if let Some(candidate) = self.resolver.selected_candidate().map(str::to_string) {
            self.on_selection(&candidate);
            return KeyResult::Handled;
        }
        if self.composition.is_composing() {
            let raw = self.composition.commit();
            self.host.insert_text(&raw);
            self.clear_input();
        }
        self.host.insert_text(whitespace);
        KeyResult::Handled
    }

    fn move_selection(&mut self, direction: Direction) -> KeyResult {
        if self.resolver.candidates().is_empty() {
            return KeyResult::NotHandled;
        }
        self.resolver.move_selection(direction);
        KeyResult::Handled
    }

    /// A candidate was chosen.
    ///
    /// Direct mode commits it. Translate mode requests its translation; the
    /// result shows up as `pending_choice` once delivered by `pump()` and
    /// nothing is committed until `on_final_choice()`. A new selection
    /// replaces the previous one, so an older translation that arrives late
    /// is never presented.
    pub fn on_selection(&mut self, candidate: &str) {
        match self.mode {
            InputMode::DirectInsert => {
                self.host.insert_text(candidate);
                self.clear_input();
            }
            InputMode::TranslateThenChoose => {
                self.context.pending_choice = None;
                self.in_flight = Some(self.pipeline.translate(candidate));
                // Cache hits are already resolved.
                self.pump();
            }
        }
        self.sync_context();
    }

    /// Commit `original` or its cached translation, then reset the input.
    ///
    /// Falls back to `original` when no translation is cached.
    pub fn on_final_choice(&mut self, original: &str, use_translated: bool) {
        let text = if use_translated {
            self.pipeline
                .get_cached_translation(original)
                .unwrap_or_else(|| original.to_string())
        } else {
            original.to_string()
        };
        self.host.insert_text(&text);
        self.clear_input();
        self.sync_context();
    }

    /// Resolve the pending choice. Returns false when there is none.
    pub fn choose(&mut self, use_translated: bool) -> bool {
        match self.context.pending_choice.take() {
            Some(choice) => {
                self.on_final_choice(&choice.original, use_translated);
                true
            }
            None => false,
        }
    }

    /// Apply the requested translation if it has finished. Returns how many
    /// were applied (0 or 1).
    ///
    /// Call this from the platform's event loop.
    pub fn pump(&mut self) -> usize {
        let (outcome, pending) = match self.in_flight.as_mut() {
            Some(task) => (task.try_take(), task.is_pending()),
            None => return 0,
        };
        if pending {
            return 0;
        }
        self.in_flight = None;
        let delivered = outcome.map(|outcome| self.present(outcome)).is_some();
        self.sync_context();
        usize::from(delivered)
    }

    /// Block until the requested translation is applied.
    pub fn wait_for_translations(&mut self) -> usize {
        let outcome = self.in_flight.take().and_then(Task::wait);
        let delivered = outcome.map(|outcome| self.present(outcome)).is_some();
        self.sync_context();
        usize::from(delivered)
    }

    fn present(&mut self, outcome: TranslationOutcome) {
        debug!(original = %outcome.original, status = ?outcome.status, "translation ready");
        self.context.pending_choice = Some(outcome.into());
    }

    /// Drop both caches. Exposed to the host for low-memory notifications.
    ///
    /// The returned task resolves once the translation cache is empty.
    pub fn on_memory_pressure(&mut self) -> Task<()> {
        self.resolver.clear_cache();
        self.pipeline.clear_cache()
    }

    /// Discard pending input, candidates and translation options.
    pub fn reset(&mut self) {
        self.clear_input();
        self.sync_context();
    }

    /// Also forgets the requested translation; its background job still
    /// finishes and fills the cache.
    fn clear_input(&mut self) {
        self.composition.clear();
        self.resolver.clear_candidates();
        self.in_flight = None;
        self.context.pending_choice = None;
    }

    fn refresh_candidates(&mut self) {
        if self.composition.is_empty() {
            self.resolver.clear_candidates();
        } else {
            let input = self.composition.text().to_string();
            self.resolver.generate_candidates(&input);
        }
    }

    fn sync_context(&mut self) {
        let list = self.resolver.candidates();
        self.context.preedit_text = self.composition.text().to_string();
        self.context.candidates = list.candidates().to_vec();
        self.context.candidate_cursor = list.selected_index();
        self.context.translating = self.in_flight.is_some();
        self.context.auxiliary_text = self.auxiliary_text();
    }

    fn auxiliary_text(&self) -> String {
        let mode = match self.mode {
            InputMode::DirectInsert => "直接输入",
            InputMode::TranslateThenChoose => "翻译",
        };
        if self.in_flight.is_some() {
            format!("{} | 翻译中...", mode)
        } else if self.context.pending_choice.is_some() {
            format!("{} | 原文/译文", mode)
        } else if !self.context.candidates.is_empty() {
            format!("{} | {} 个候选", mode, self.context.candidates.len())
        } else {
            mode.to_string()
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Get a reference to the context for reading keyboard state.
    pub fn context(&self) -> &KeyboardContext {
        &self.context
    }

    pub fn composition(&self) -> &CompositionBuffer {
        &self.composition
    }

    pub fn resolver(&self) -> &CandidateResolver<C> {
        &self.resolver
    }

    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
