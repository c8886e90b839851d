//! transkey crate root
//!
//! Concrete backends for `transkey-core` and the pieces of the command-line
//! keyboard:
//! - `phrasebook`: offline phonetic table and translation phrasebook
//! - `cloud`: HTTP completion service and translator
//! - `script`: key-script parsing and an in-memory host document

pub mod cloud;
pub mod phrasebook;
pub mod script;

use std::path::PathBuf;

pub use cloud::{CloudCompletion, CloudTranslator};
pub use phrasebook::{PhoneticTable, Phrasebook};
pub use script::{parse_line, Action, Document};

/// Default location of the persisted translation cache:
/// `~/.transkey/translation_cache.json`.
pub fn default_cache_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".transkey")
        .join("translation_cache.json")
}
