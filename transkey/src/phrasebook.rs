//! Offline backends loaded from tab-separated tables.
//!
//! - `PhoneticTable`: `key<TAB>phrase[<TAB>freq]` lines, used as the
//!   completion service. Exact key matches rank first, then keys that extend
//!   the input, each group by descending frequency.
//! - `Phrasebook`: `source<TAB>translation` lines, used as the translator.
//!   Unknown text has no translation, so the pipeline keeps the original.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use transkey_core::translation::COMMON_PHRASES;
use transkey_core::{
    CompletionError, CompletionService, DownloadConditions, TranslateError, Translator,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PhraseEntry {
    text: String,
    freq: u64,
}

/// Phonetic key -> phrases table.
#[derive(Debug, Clone, Default)]
pub struct PhoneticTable {
    map: BTreeMap<String, Vec<PhraseEntry>>,
}

impl PhoneticTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a phrase under `key`. Duplicate phrases keep the higher frequency.
    pub fn insert(&mut self, key: &str, phrase: &str, freq: u64) {
        let entries = self.map.entry(key.to_lowercase()).or_default();
        match entries.iter_mut().find(|e| e.text == phrase) {
            Some(existing) => existing.freq = existing.freq.max(freq),
            None => entries.push(PhraseEntry {
                text: phrase.to_string(),
                freq,
            }),
        }
    }

    /// Load a table file. Blank lines and `#` comments are skipped; a missing
    /// frequency column counts as 1.
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open table {}", path.display()))?;
        let mut table = Self::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = if line.contains('\t') {
                line.split('\t').collect()
            } else {
                line.split_whitespace().collect()
            };
            if parts.len() < 2 {
                continue;
            }
            let freq = parts.get(2).and_then(|s| s.parse::<u64>().ok()).unwrap_or(1);
            table.insert(parts[0], parts[1], freq);
        }
        debug!(keys = table.len(), path = %path.display(), "phonetic table loaded");
        Ok(table)
    }

    /// Small built-in table for trying the keyboard out.
    pub fn demo() -> Self {
        let mut t = Self::new();
        for (key, phrase, freq) in [
            ("ni", "你", 50),
            ("ni", "尼", 5),
            ("ni", "泥", 3),
            ("hao", "好", 40),
            ("hao", "号", 8),
            ("nihao", "你好", 30),
            ("nihao", "你号", 1),
            ("xie", "谢", 10),
            ("xiexie", "谢谢", 30),
            ("zai", "在", 30),
            ("zai", "再", 20),
            ("zaijian", "再见", 25),
            ("zhong", "中", 30),
            ("zhongguo", "中国", 20),
            ("zhongguo", "中华", 4),
            ("wo", "我", 50),
            ("ai", "爱", 20),
            ("keyi", "可以", 15),
            ("duibuqi", "对不起", 10),
            ("meiguanxi", "没关系", 10),
        ] {
            t.insert(key, phrase, freq);
        }
        t
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Phrases for `input`: exact matches, then completions of longer keys.
    pub fn lookup(&self, input: &str) -> Vec<String> {
        let input = input.to_lowercase();
        let mut exact: Vec<&PhraseEntry> = self.map.get(&input).into_iter().flatten().collect();
        let mut longer: Vec<&PhraseEntry> = self
            .map
            .range(input.clone()..)
            .skip_while(|(k, _)| **k == input)
            .take_while(|(k, _)| k.starts_with(&input))
            .flat_map(|(_, v)| v.iter())
            .collect();
        exact.sort_by(|a, b| b.freq.cmp(&a.freq));
        longer.sort_by(|a, b| b.freq.cmp(&a.freq));
        exact
            .into_iter()
            .chain(longer)
            .map(|e| e.text.clone())
            .collect()
    }
}

impl CompletionService for PhoneticTable {
    fn complete(&self, input: &str, _locale: &str) -> Result<Option<Vec<String>>, CompletionError> {
        let found = self.lookup(input);
        Ok(if found.is_empty() { None } else { Some(found) })
    }
}

/// Source text -> translation lookup.
#[derive(Debug, Clone, Default)]
pub struct Phrasebook {
    entries: HashMap<String, String>,
}

impl Phrasebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, translation: &str) {
        self.entries
            .insert(source.to_string(), translation.to_string());
    }

    /// Load `source<TAB>translation` lines.
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("open phrasebook {}", path.display()))?;
        let mut book = Self::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((source, translation)) = line.split_once('\t') {
                book.insert(source.trim(), translation.trim());
            }
        }
        debug!(entries = book.len(), path = %path.display(), "phrasebook loaded");
        Ok(book)
    }

    /// Everyday phrases plus the single characters of the demo table.
    pub fn demo() -> Self {
        let mut book = Self::new();
        for (source, translation) in COMMON_PHRASES {
            book.insert(source, translation);
        }
        for (source, translation) in [
            ("你", "you"),
            ("好", "good"),
            ("我", "I"),
            ("爱", "love"),
            ("中国", "China"),
            ("再", "again"),
            ("在", "at"),
        ] {
            book.insert(source, translation);
        }
        book
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for Phrasebook {
    fn ensure_ready(&self, _conditions: &DownloadConditions) -> Result<(), TranslateError> {
        if self.entries.is_empty() {
            return Err(TranslateError::NotReady("phrasebook is empty".into()));
        }
        Ok(())
    }

    fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<Option<String>, TranslateError> {
        Ok(self.entries.get(text).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_exact_before_longer_keys() {
        let table = PhoneticTable::demo();
        let out = table.lookup("ni");
        assert_eq!(&out[..3], &["你", "尼", "泥"]);
        assert!(out.contains(&"你好".to_string()));
        assert_eq!(table.lookup("NiHao"), vec!["你好", "你号"]);
    }

    #[test]
    fn test_unknown_prefix_is_no_result() {
        let table = PhoneticTable::demo();
        assert_eq!(table.complete("qqq", "zh-Hans").unwrap(), None);
    }

    #[test]
    fn test_duplicate_phrase_keeps_max_freq() {
        let mut table = PhoneticTable::new();
        table.insert("a", "啊", 1);
        table.insert("a", "阿", 5);
        table.insert("a", "啊", 9);
        assert_eq!(table.lookup("a"), vec!["啊", "阿"]);
    }

    #[test]
    fn test_load_table_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "ma\t妈\t10").unwrap();
        writeln!(file, "ma\t马\t20").unwrap();
        writeln!(file, "ma 吗").unwrap();
        writeln!(file, "broken").unwrap();

        let table = PhoneticTable::load_tsv(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("ma"), vec!["马", "妈", "吗"]);
    }

    #[test]
    fn test_phrasebook() {
        let book = Phrasebook::demo();
        assert!(book.ensure_ready(&DownloadConditions::default()).is_ok());
        assert_eq!(book.translate("你好", "zh", "en").unwrap().as_deref(), Some("Hello"));
        assert_eq!(book.translate("鼠", "zh", "en").unwrap(), None);

        let empty = Phrasebook::new();
        assert!(matches!(
            empty.ensure_ready(&DownloadConditions::default()),
            Err(TranslateError::NotReady(_))
        ));
    }

    #[test]
    fn test_load_phrasebook_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "猫\tcat").unwrap();
        writeln!(file, "狗 \t dog").unwrap();
        let book = Phrasebook::load_tsv(file.path()).unwrap();
        assert_eq!(book.translate("狗", "zh", "en").unwrap().as_deref(), Some("dog"));
        assert_eq!(book.len(), 2);
    }
}
