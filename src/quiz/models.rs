//! Types shared by the planner, generator, verifier and session loop

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::Variant;
use crate::vocab::{Mode, StudyMode};

/// Scope and determinism of one study session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub mode: StudyMode,
    /// Kanji proficiency level, required for kanji sessions
    pub level: Option<String>,
    /// Situational hint (email, meeting, ...) for honorific context questions
    pub context: Option<String>,
    pub count: usize,
    pub seed: u64,
}

/// Every question shape the generator knows, resolved from (mode, variant)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionShape {
    KanaToRomaji(Mode),
    RomajiToKana(Mode),
    KanjiToMeaning,
    MeaningToKanji,
    PlainToKeigo,
    ContextSelection,
    PolitenessClassification,
    EnglishToJapanese(Mode),
    JapaneseToEnglish(Mode),
}

impl QuestionShape {
    pub fn resolve(mode: Mode, variant: Variant) -> Result<Self, QuestionError> {
        use Variant::*;

        let shape = match (mode, variant) {
            (Mode::Hiragana | Mode::Katakana, KanaToRomaji) => Self::KanaToRomaji(mode),
            (Mode::Hiragana | Mode::Katakana, RomajiToKana) => Self::RomajiToKana(mode),
            (Mode::Kanji, KanjiToMeaning) => Self::KanjiToMeaning,
            (Mode::Kanji, MeaningToKanji) => Self::MeaningToKanji,
            (Mode::Keigo, PlainToKeigo) => Self::PlainToKeigo,
            (Mode::Keigo, ContextSelection) => Self::ContextSelection,
            (Mode::Keigo, PolitenessClassification) => Self::PolitenessClassification,
            (Mode::Vocab | Mode::Survival, EnglishToJapanese) => Self::EnglishToJapanese(mode),
            (Mode::Vocab | Mode::Survival, JapaneseToEnglish) => Self::JapaneseToEnglish(mode),
            _ => return Err(QuestionError::UnsupportedShape { mode, variant }),
        };
        Ok(shape)
    }
}

/// Reasons a question cannot be built for an item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("Unsupported question shape: {variant} in {mode} mode")]
    UnsupportedShape { mode: Mode, variant: Variant },

    #[error("Not enough distinct {scope} values for a 3-choice question")]
    InsufficientDistractors { scope: String },

    #[error("Kanji item {0} has no level")]
    MissingLevel(String),

    #[error("Vocab key '{key}' for {item_id} is not in the loaded corpus")]
    UnknownEntry { item_id: String, key: String },
}

/// A multiple-choice question ready to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    /// Shown after answering; empty when the shape has none
    pub explanation: String,
    /// Auxiliary facts for display (register, usage, reading, ...)
    pub metadata: BTreeMap<String, String>,
}

impl GeneratedQuestion {
    pub fn correct_answer(&self) -> Option<&str> {
        self.choices.get(self.correct_index).map(String::as_str)
    }
}

/// A problem found by the verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    WrongChoiceCount(usize),
    CorrectIndexOutOfRange,
    DuplicateChoices,
    UnsupportedShape,
    MissingLevel,
    UnknownEntry,
    ChoiceNotWhitelisted(Variant),
    CorrectAnswerMismatch(Variant),
    ClassificationChoicesInvalid,
    /// Explanation contains Japanese text outside the item's own forms
    ExplanationLeak,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongChoiceCount(n) => write!(f, "expected 3 choices, found {}", n),
            Self::CorrectIndexOutOfRange => f.write_str("correct_index out of range"),
            Self::DuplicateChoices => f.write_str("duplicate choices"),
            Self::UnsupportedShape => f.write_str("unsupported mode/variant"),
            Self::MissingLevel => f.write_str("kanji item missing level"),
            Self::UnknownEntry => f.write_str("vocab key missing in whitelist"),
            Self::ChoiceNotWhitelisted(variant) => write!(f, "{} choices not in whitelist", variant),
            Self::CorrectAnswerMismatch(variant) => write!(f, "{} correct answer mismatch", variant),
            Self::ClassificationChoicesInvalid => f.write_str("politeness classification choices invalid"),
            Self::ExplanationLeak => f.write_str("explanation includes non-whitelisted Japanese text"),
        }
    }
}

/// Verdict on one generated question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub question: GeneratedQuestion,
    pub issues: Vec<Issue>,
}

impl VerificationResult {
    pub fn has_leak(&self) -> bool {
        self.issues.contains(&Issue::ExplanationLeak)
    }
}
