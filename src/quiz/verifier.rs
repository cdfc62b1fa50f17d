//! Checks a generated question against the corpus before it is shown
//!
//! Verification never fails; every problem found is collected as an [`Issue`].

use std::collections::HashSet;

use regex::Regex;

use crate::flashcards::{ItemSpec, Variant};
use crate::vocab::{KeigoEntry, Register, VocabStore};

use super::models::{GeneratedQuestion, Issue, QuestionShape, VerificationResult};

pub const CHOICE_COUNT: usize = 3;

pub struct Verifier {
    japanese: Regex,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    pub fn new() -> Self {
        Self {
            // Hiragana, katakana and the CJK unified ideographs block
            japanese: Regex::new(r"[\x{3040}-\x{30FF}\x{4E00}-\x{9FFF}]").expect("valid regex"),
        }
    }

    pub fn verify(&self, item: &ItemSpec, question: &GeneratedQuestion, vocab: &VocabStore) -> VerificationResult {
        let mut issues = Vec::new();

        if question.choices.len() != CHOICE_COUNT {
            issues.push(Issue::WrongChoiceCount(question.choices.len()));
        }
        if question.correct_index >= question.choices.len() {
            issues.push(Issue::CorrectIndexOutOfRange);
        }
        let unique: HashSet<&String> = question.choices.iter().collect();
        if unique.len() != question.choices.len() {
            issues.push(Issue::DuplicateChoices);
        }

        match QuestionShape::resolve(item.mode, item.variant) {
            Err(_) => issues.push(Issue::UnsupportedShape),
            Ok(QuestionShape::KanaToRomaji(mode) | QuestionShape::RomajiToKana(mode)) => {
                let entries = vocab.kana(mode);
                let allowed: HashSet<&str> = match item.variant {
                    Variant::KanaToRomaji => entries.iter().map(|e| e.romaji.as_str()).collect(),
                    _ => entries.iter().map(|e| e.kana.as_str()).collect(),
                };
                check_whitelist(item.variant, question, &allowed, &mut issues);
            }
            Ok(QuestionShape::KanjiToMeaning | QuestionShape::MeaningToKanji) => {
                self.check_kanji(item, question, vocab, &mut issues)
            }
            Ok(QuestionShape::EnglishToJapanese(mode) | QuestionShape::JapaneseToEnglish(mode)) => {
                let entries = vocab.phrases(mode);
                let allowed: HashSet<&str> = match item.variant {
                    Variant::EnglishToJapanese => entries.iter().map(|e| e.japanese.as_str()).collect(),
                    _ => entries.iter().map(|e| e.english.as_str()).collect(),
                };
                check_whitelist(item.variant, question, &allowed, &mut issues);
            }
            Ok(shape) => self.check_keigo(item, shape, question, vocab, &mut issues),
        }

        if !issues.is_empty() {
            log::debug!("{} failed verification: {:?}", item.id, issues);
        }
        VerificationResult {
            valid: issues.is_empty(),
            question: question.clone(),
            issues,
        }
    }

    fn check_kanji(&self, item: &ItemSpec, question: &GeneratedQuestion, vocab: &VocabStore, issues: &mut Vec<Issue>) {
        let Some(level) = item.level.as_deref() else {
            issues.push(Issue::MissingLevel);
            return;
        };
        let entries = vocab.kanji_level(level).unwrap_or_default();
        let allowed: HashSet<&str> = match item.variant {
            Variant::KanjiToMeaning => entries
                .iter()
                .flat_map(|e| e.meaning.iter().map(String::as_str))
                .collect(),
            _ => entries.iter().map(|e| e.kanji.as_str()).collect(),
        };
        check_whitelist(item.variant, question, &allowed, issues);
    }

    fn check_keigo(
        &self,
        item: &ItemSpec,
        shape: QuestionShape,
        question: &GeneratedQuestion,
        vocab: &VocabStore,
        issues: &mut Vec<Issue>,
    ) {
        let Some(entry) = vocab.find_keigo(&item.vocab_key) else {
            issues.push(Issue::UnknownEntry);
            return;
        };

        match shape {
            QuestionShape::PolitenessClassification => {
                let labels: HashSet<&str> = Register::labels().into_iter().collect();
                let offered: HashSet<&str> = question.choices.iter().map(String::as_str).collect();
                if offered != labels || question.choices.len() != labels.len() {
                    issues.push(Issue::ClassificationChoicesInvalid);
                }
                if question.correct_answer() != Some(entry.register.label()) {
                    issues.push(Issue::CorrectAnswerMismatch(item.variant));
                }
            }
            _ => {
                let allowed: HashSet<&str> = vocab.keigo.iter().map(|e| e.keigo.as_str()).collect();
                check_whitelist(item.variant, question, &allowed, issues);
                if question.correct_answer() != Some(entry.keigo.as_str()) {
                    issues.push(Issue::CorrectAnswerMismatch(item.variant));
                }
            }
        }

        if self.leaks(entry, &question.explanation) {
            issues.push(Issue::ExplanationLeak);
        }
    }

    /// True if the text has Japanese characters not found in the entry's own forms
    fn leaks(&self, entry: &KeigoEntry, explanation: &str) -> bool {
        let allowed: HashSet<char> = entry.base.chars().chain(entry.keigo.chars()).collect();
        self.japanese
            .find_iter(explanation)
            .flat_map(|m| m.as_str().chars())
            .any(|ch| !allowed.contains(&ch))
    }
}

fn check_whitelist(variant: Variant, question: &GeneratedQuestion, allowed: &HashSet<&str>, issues: &mut Vec<Issue>) {
    if question.choices.iter().any(|choice| !allowed.contains(choice.as_str())) {
        issues.push(Issue::ChoiceNotWhitelisted(variant));
    }
}
