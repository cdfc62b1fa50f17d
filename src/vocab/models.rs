//! Corpus entry types and the read-only vocabulary store

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Corpus collection an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Hiragana,
    Katakana,
    Kanji,
    /// Honorific speech
    Keigo,
    /// Core survival vocabulary
    Vocab,
    /// Survival phrases
    Survival,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Hiragana,
        Mode::Katakana,
        Mode::Kanji,
        Mode::Keigo,
        Mode::Vocab,
        Mode::Survival,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hiragana => "hiragana",
            Self::Katakana => "katakana",
            Self::Kanji => "kanji",
            Self::Keigo => "keigo",
            Self::Vocab => "vocab",
            Self::Survival => "survival",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hiragana" => Some(Self::Hiragana),
            "katakana" => Some(Self::Katakana),
            "kanji" => Some(Self::Kanji),
            "keigo" => Some(Self::Keigo),
            "vocab" => Some(Self::Vocab),
            "survival" => Some(Self::Survival),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a session draws from: one collection, or both kana scripts merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyMode {
    Kana,
    Only(Mode),
}

impl StudyMode {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        if s == "kana" {
            return Some(Self::Kana);
        }
        Mode::parse(&s).map(Self::Only)
    }

    /// Collections touched by this study mode
    pub fn modes(&self) -> Vec<Mode> {
        match self {
            Self::Kana => vec![Mode::Hiragana, Mode::Katakana],
            Self::Only(mode) => vec![*mode],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kana => "kana",
            Self::Only(mode) => mode.as_str(),
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Politeness register of an honorific form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    /// Respectful, elevates the referent
    Sonkeigo,
    /// Humble, lowers the speaker
    Kenjogo,
    /// Polite, formal-neutral
    Teineigo,
}

impl Register {
    /// Fixed choice order used by classification questions
    pub const ALL: [Register; 3] = [Register::Sonkeigo, Register::Kenjogo, Register::Teineigo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sonkeigo => "sonkeigo",
            Self::Kenjogo => "kenjogo",
            Self::Teineigo => "teineigo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sonkeigo => "Sonkeigo",
            Self::Kenjogo => "Kenjogo",
            Self::Teineigo => "Teineigo",
        }
    }

    pub fn labels() -> [&'static str; 3] {
        Self::ALL.map(|register| register.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanaEntry {
    pub kana: String,
    pub romaji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiEntry {
    pub kanji: String,
    /// Accepts a single string or a list in the corpus file
    #[serde(deserialize_with = "one_or_many")]
    pub meaning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeigoEntry {
    pub base: String,
    pub keigo: String,
    #[serde(rename = "type")]
    pub register: Register,
    pub meaning: String,
    pub usage: String,
    pub example_contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub english: String,
    pub japanese: String,
    pub kana: String,
    pub romaji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Read-only snapshot of the corpus for one session
#[derive(Debug, Clone, Default)]
pub struct VocabStore {
    pub hiragana: Vec<KanaEntry>,
    pub katakana: Vec<KanaEntry>,
    /// Kanji entries keyed by proficiency level (N5..N2)
    pub kanji: BTreeMap<String, Vec<KanjiEntry>>,
    pub keigo: Vec<KeigoEntry>,
    pub core_vocab: Vec<PhraseEntry>,
    pub survival_phrases: Vec<PhraseEntry>,
}

impl VocabStore {
    /// Kana entries for a kana mode; empty for any other mode
    pub fn kana(&self, mode: Mode) -> &[KanaEntry] {
        match mode {
            Mode::Hiragana => &self.hiragana,
            Mode::Katakana => &self.katakana,
            _ => &[],
        }
    }

    pub fn kanji_level(&self, level: &str) -> Option<&[KanjiEntry]> {
        self.kanji.get(level).map(Vec::as_slice)
    }

    /// Phrase entries for a phrase mode; empty for any other mode
    pub fn phrases(&self, mode: Mode) -> &[PhraseEntry] {
        match mode {
            Mode::Vocab => &self.core_vocab,
            Mode::Survival => &self.survival_phrases,
            _ => &[],
        }
    }

    pub fn find_kana(&self, mode: Mode, kana: &str) -> Option<&KanaEntry> {
        self.kana(mode).iter().find(|entry| entry.kana == kana)
    }

    pub fn find_kanji(&self, level: &str, kanji: &str) -> Option<&KanjiEntry> {
        self.kanji_level(level)?
            .iter()
            .find(|entry| entry.kanji == kanji)
    }

    pub fn find_keigo(&self, base: &str) -> Option<&KeigoEntry> {
        self.keigo.iter().find(|entry| entry.base == base)
    }

    pub fn find_phrase(&self, mode: Mode, english: &str) -> Option<&PhraseEntry> {
        self.phrases(mode).iter().find(|entry| entry.english == english)
    }
}
