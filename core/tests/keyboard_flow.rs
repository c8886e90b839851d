//! Keyboard sessions driven by key names, as a host layout would send them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use transkey_core::{
    CompletionError, CompletionService, Config, DownloadConditions, HostSink, InputMode, KeyEvent,
    KeyResult, Keyboard, OutcomeStatus, TranslateError, TranslationPipeline, Translator,
};

struct Table;

impl CompletionService for Table {
    fn complete(&self, input: &str, locale: &str) -> Result<Option<Vec<String>>, CompletionError> {
        assert_eq!(locale, "zh-Hans");
        match input {
            "ni" => Ok(Some(vec!["你".to_string()])),
            "nihao" => Ok(Some(vec!["你好".to_string(), "你号".to_string()])),
            _ => Ok(None),
        }
    }
}

struct Dictionary;

impl Translator for Dictionary {
    fn ensure_ready(&self, _conditions: &DownloadConditions) -> Result<(), TranslateError> {
        Ok(())
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>, TranslateError> {
        assert_eq!((source, target), ("zh", "en"));
        Ok(match text {
            "你好" => Some("Hello".to_string()),
            _ => None,
        })
    }
}

/// Records everything the keyboard sends to the document.
#[derive(Default)]
struct Document {
    text: String,
    deletes: usize,
}

impl HostSink for Document {
    fn insert_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn delete_backward(&mut self) {
        self.deletes += 1;
        self.text.pop();
    }
}

fn keyboard(config: &Config) -> Keyboard<Table, Document> {
    let pipeline = TranslationPipeline::builder(Arc::new(Dictionary))
        .config(config)
        .build()
        .unwrap();
    Keyboard::new(config, Table, pipeline, Document::default())
}

fn press(kb: &mut Keyboard<Table, Document>, names: &[&str]) {
    for name in names {
        let key = KeyEvent::from_key_name(name).unwrap();
        assert_eq!(kb.on_key(key), KeyResult::Handled, "key {}", name);
    }
}

fn pump_until_choice(kb: &mut Keyboard<Table, Document>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while kb.context().pending_choice.is_none() {
        assert!(Instant::now() < deadline, "translation never delivered");
        kb.pump();
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_direct_mode_commits_selected_candidate() {
    let config = Config {
        start_in_translate_mode: false,
        ..Config::default()
    };
    let mut kb = keyboard(&config);

    press(&mut kb, &["n", "i"]);
    assert!(kb.composition().is_composing());
    assert_eq!(kb.context().candidates, vec!["你"]);

    assert_eq!(kb.on_key(KeyEvent::Select(0)), KeyResult::Handled);
    assert_eq!(kb.host().text, "你");
    assert!(!kb.composition().is_composing());
    assert!(kb.context().candidates.is_empty());
}

#[test]
fn test_translate_mode_pumps_choice_then_commits_translation() {
    let mut kb = keyboard(&Config::default());
    assert_eq!(kb.mode(), InputMode::TranslateThenChoose);

    press(&mut kb, &["n", "i", "h", "a", "o", "space"]);
    assert!(kb.host().text.is_empty());
    // Input stays visible until the final choice.
    assert_eq!(kb.context().preedit_text, "nihao");

    pump_until_choice(&mut kb);
    let choice = kb.context().pending_choice.clone().unwrap();
    assert_eq!(choice.original, "你好");
    assert_eq!(choice.translated, "Hello");
    assert_eq!(choice.status, OutcomeStatus::Translated);

    kb.on_final_choice("你好", true);
    assert_eq!(kb.host().text, "Hello");
    assert!(!kb.context().has_visible_state());
}

#[test]
fn test_failed_translation_offers_original_twice() {
    let mut kb = keyboard(&Config::default());
    press(&mut kb, &["n", "i", "return"]);

    kb.wait_for_translations();
    let choice = kb.context().pending_choice.clone().unwrap();
    assert_eq!(choice.translated, "你");
    assert_eq!(choice.status, OutcomeStatus::FailedOpen);

    assert!(kb.choose(true));
    assert_eq!(kb.host().text, "你");
}

#[test]
fn test_toggle_then_delete_forwards_to_host() {
    let mut kb = keyboard(&Config::default());
    kb.host_mut().text.push_str("hi");

    press(&mut kb, &["n", "translate_toggle", "delete"]);
    assert_eq!(kb.mode(), InputMode::DirectInsert);
    assert_eq!(kb.host().deletes, 1);
    assert_eq!(kb.host().text, "h");
}

#[test]
fn test_reset_discards_requested_translation() {
    let mut kb = keyboard(&Config::default());
    press(&mut kb, &["n", "i", "h", "a", "o", "space"]);
    kb.reset();

    assert_eq!(kb.wait_for_translations(), 0);
    assert!(kb.context().pending_choice.is_none());
    assert!(!kb.context().translating);
    assert!(kb.host().text.is_empty());
}

#[test]
fn test_memory_pressure_keeps_session_usable() {
    let config = Config {
        start_in_translate_mode: false,
        ..Config::default()
    };
    let mut kb = keyboard(&config);
    press(&mut kb, &["n", "i"]);
    kb.on_memory_pressure().wait();
    assert_eq!(kb.resolver().cache_len(), 0);

    press(&mut kb, &["space"]);
    assert_eq!(kb.host().text, "你");
}
