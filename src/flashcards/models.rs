//! Data models for review items and their scheduling state

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::vocab::Mode;

/// Question shape selector stored with every item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    KanaToRomaji,
    RomajiToKana,
    KanjiToMeaning,
    MeaningToKanji,
    PlainToKeigo,
    ContextSelection,
    PolitenessClassification,
    EnglishToJapanese,
    JapaneseToEnglish,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KanaToRomaji => "kana_to_romaji",
            Self::RomajiToKana => "romaji_to_kana",
            Self::KanjiToMeaning => "kanji_to_meaning",
            Self::MeaningToKanji => "meaning_to_kanji",
            Self::PlainToKeigo => "plain_to_keigo",
            Self::ContextSelection => "context_selection",
            Self::PolitenessClassification => "politeness_classification",
            Self::EnglishToJapanese => "english_to_japanese",
            Self::JapaneseToEnglish => "japanese_to_english",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kana_to_romaji" => Some(Self::KanaToRomaji),
            "romaji_to_kana" => Some(Self::RomajiToKana),
            "kanji_to_meaning" => Some(Self::KanjiToMeaning),
            "meaning_to_kanji" => Some(Self::MeaningToKanji),
            "plain_to_keigo" => Some(Self::PlainToKeigo),
            "context_selection" => Some(Self::ContextSelection),
            "politeness_classification" => Some(Self::PolitenessClassification),
            "english_to_japanese" => Some(Self::EnglishToJapanese),
            "japanese_to_english" => Some(Self::JapaneseToEnglish),
            _ => None,
        }
    }

    /// Variants the catalog creates for each entry of a mode
    pub fn for_mode(mode: Mode) -> &'static [Variant] {
        match mode {
            Mode::Hiragana | Mode::Katakana => &[Self::KanaToRomaji, Self::RomajiToKana],
            Mode::Kanji => &[Self::KanjiToMeaning, Self::MeaningToKanji],
            Mode::Keigo => &[
                Self::PlainToKeigo,
                Self::ContextSelection,
                Self::PolitenessClassification,
            ],
            Mode::Vocab | Mode::Survival => &[Self::EnglishToJapanese, Self::JapaneseToEnglish],
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewable item: a corpus entry asked in one direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub id: String,
    pub mode: Mode,
    /// Kanji proficiency level, only set for kanji items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub variant: Variant,
    pub vocab_key: String,
}

/// The part of the store an item selection is drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub mode: Mode,
    pub level: Option<String>,
}

impl Scope {
    pub fn new(mode: Mode, level: Option<String>) -> Self {
        Self { mode, level }
    }
}

/// Persisted scheduling state for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub item_id: String,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub variant: Variant,
    /// Ease factor, kept within [1.3, 2.5]
    pub ease: f64,
    /// Current interval in days
    pub interval: u32,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub last_outcome: Option<bool>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

/// Everything `apply_review` commits for one answered question
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewUpdate {
    pub item_id: String,
    pub correct: bool,
    pub response_ms: u64,
    pub ease_before: f64,
    pub ease_after: f64,
    pub interval_before: u32,
    pub interval_after: u32,
    pub due_date: NaiveDate,
}

/// A row of the append-only review log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub item_id: String,
    pub reviewed_at: DateTime<Utc>,
    pub correct: bool,
    pub response_ms: u64,
    pub ease_before: f64,
    pub ease_after: f64,
    pub interval_before: u32,
    pub interval_after: u32,
}

/// Item counts for one mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeStats {
    pub mode: String,
    pub total: usize,
    pub due: usize,
}

/// Correct answers out of total reviews over a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    /// Whole-number percentage, `None` when nothing was reviewed
    pub fn percent(&self) -> Option<usize> {
        (self.total > 0).then(|| self.correct * 100 / self.total)
    }
}

/// Inserted and removed counts from a catalog sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub inserted: usize,
    pub removed: usize,
}
