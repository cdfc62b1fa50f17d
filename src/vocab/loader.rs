//! Loading and validating the JSON corpus files
//!
//! Each file is a JSON array of entries. Entries are validated one by one so the
//! error message can point at the offending index.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::models::*;

/// Supported kanji proficiency levels
pub const KANJI_LEVELS: [&str; 4] = ["N5", "N4", "N3", "N2"];

pub const HIRAGANA_FILE: &str = "hiragana.json";
pub const KATAKANA_FILE: &str = "katakana.json";
pub const KEIGO_FILE: &str = "keigo_basic.json";
pub const CORE_VOCAB_FILE: &str = "core_vocab_survival.json";
pub const SURVIVAL_FILE: &str = "survival_phrases.json";

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Missing vocab file: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Vocab file must be a JSON array: {0}")]
    NotAnArray(PathBuf),

    #[error("Invalid entry at index {index} in {path}: {reason}")]
    InvalidEntry {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Kanji mode requires a level (N5, N4, N3, N2)")]
    MissingLevel,

    #[error("Unsupported kanji level: {0}")]
    UnknownLevel(String),

    #[error("Vocab hashes not initialized. Run 'nihongo init --sync'.")]
    HashesNotInitialized,

    #[error("Vocab file hash mismatch for {0}. Run 'nihongo init --sync'.")]
    HashMismatch(String),

    #[error(transparent)]
    Store(#[from] crate::flashcards::StoreError),
}

pub type Result<T> = std::result::Result<T, VocabError>;

pub fn kanji_file(level: &str) -> String {
    format!("kanji_{}.json", level)
}

/// Every corpus file name, in a stable order
pub fn expected_files() -> Vec<String> {
    let mut files = vec![HIRAGANA_FILE.to_string(), KATAKANA_FILE.to_string()];
    files.extend(KANJI_LEVELS.iter().map(|level| kanji_file(level)));
    files.push(KEIGO_FILE.to_string());
    files.push(CORE_VOCAB_FILE.to_string());
    files.push(SURVIVAL_FILE.to_string());
    files
}

/// Normalize and check a kanji level name
pub fn validate_level(level: Option<&str>) -> Result<String> {
    let level = level.ok_or(VocabError::MissingLevel)?.trim().to_uppercase();
    if KANJI_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(VocabError::UnknownLevel(level))
    }
}

/// Corpus files a study session needs
pub fn required_files(study: StudyMode, level: Option<&str>) -> Result<Vec<String>> {
    let files = match study {
        StudyMode::Kana => vec![HIRAGANA_FILE.to_string(), KATAKANA_FILE.to_string()],
        StudyMode::Only(Mode::Hiragana) => vec![HIRAGANA_FILE.to_string()],
        StudyMode::Only(Mode::Katakana) => vec![KATAKANA_FILE.to_string()],
        StudyMode::Only(Mode::Kanji) => vec![kanji_file(&validate_level(level)?)],
        StudyMode::Only(Mode::Keigo) => vec![KEIGO_FILE.to_string()],
        StudyMode::Only(Mode::Vocab) => vec![CORE_VOCAB_FILE.to_string()],
        StudyMode::Only(Mode::Survival) => vec![SURVIVAL_FILE.to_string()],
    };
    Ok(files)
}

/// Locate a corpus file, tolerating lowercase and extension-less names
pub fn resolve_vocab_path(data_dir: &Path, filename: &str) -> Result<PathBuf> {
    let mut candidates = vec![data_dir.join(filename), data_dir.join(filename.to_lowercase())];
    if let Some(stem) = filename.strip_suffix(".json") {
        candidates.push(data_dir.join(stem));
        candidates.push(data_dir.join(stem.to_lowercase()));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.exists())
        .ok_or_else(|| VocabError::MissingFile(data_dir.join(filename)))
}

/// SHA-256 of a file as lowercase hex
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|source| VocabError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|source| VocabError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(hasher.finalize()))
}

fn load_entries<T, F>(path: &Path, validate: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Option<&'static str>,
{
    if !path.exists() {
        return Err(VocabError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| VocabError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&content).map_err(|source| VocabError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = raw else {
        return Err(VocabError::NotAnArray(path.to_path_buf()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let invalid = |reason: String| VocabError::InvalidEntry {
                path: path.to_path_buf(),
                index,
                reason,
            };
            let entry: T = serde_json::from_value(item).map_err(|e| invalid(e.to_string()))?;
            match validate(&entry) {
                Some(reason) => Err(invalid(reason.to_string())),
                None => Ok(entry),
            }
        })
        .collect()
}

pub fn load_kana(path: &Path) -> Result<Vec<KanaEntry>> {
    load_entries(path, |entry: &KanaEntry| {
        (entry.kana.is_empty() || entry.romaji.is_empty()).then_some("kana and romaji must not be empty")
    })
}

pub fn load_kanji(path: &Path) -> Result<Vec<KanjiEntry>> {
    load_entries(path, |entry: &KanjiEntry| {
        if entry.kanji.is_empty() {
            Some("kanji must not be empty")
        } else if entry.meaning.is_empty() {
            Some("meaning must list at least one gloss")
        } else {
            None
        }
    })
}

pub fn load_keigo(path: &Path) -> Result<Vec<KeigoEntry>> {
    load_entries(path, |entry: &KeigoEntry| {
        if entry.base.is_empty() || entry.keigo.is_empty() {
            Some("base and keigo must not be empty")
        } else if entry.example_contexts.is_empty() {
            Some("example_contexts must list at least one context")
        } else {
            None
        }
    })
}

pub fn load_phrases(path: &Path) -> Result<Vec<PhraseEntry>> {
    load_entries(path, |entry: &PhraseEntry| {
        (entry.english.is_empty() || entry.japanese.is_empty())
            .then_some("english and japanese must not be empty")
    })
}

fn load_kanji_levels(data_dir: &Path, levels: &[&str]) -> Result<BTreeMap<String, Vec<KanjiEntry>>> {
    levels
        .iter()
        .map(|level| {
            let path = resolve_vocab_path(data_dir, &kanji_file(level))?;
            Ok((level.to_string(), load_kanji(&path)?))
        })
        .collect()
}

/// Load the entire corpus (used when syncing the catalog)
pub fn load_all_vocab(data_dir: &Path) -> Result<VocabStore> {
    Ok(VocabStore {
        hiragana: load_kana(&resolve_vocab_path(data_dir, HIRAGANA_FILE)?)?,
        katakana: load_kana(&resolve_vocab_path(data_dir, KATAKANA_FILE)?)?,
        kanji: load_kanji_levels(data_dir, &KANJI_LEVELS)?,
        keigo: load_keigo(&resolve_vocab_path(data_dir, KEIGO_FILE)?)?,
        core_vocab: load_phrases(&resolve_vocab_path(data_dir, CORE_VOCAB_FILE)?)?,
        survival_phrases: load_phrases(&resolve_vocab_path(data_dir, SURVIVAL_FILE)?)?,
    })
}

/// Load only the collections a study session needs
pub fn load_vocab_for_mode(data_dir: &Path, study: StudyMode, level: Option<&str>) -> Result<VocabStore> {
    let mut vocab = VocabStore::default();
    for mode in study.modes() {
        match mode {
            Mode::Hiragana => vocab.hiragana = load_kana(&resolve_vocab_path(data_dir, HIRAGANA_FILE)?)?,
            Mode::Katakana => vocab.katakana = load_kana(&resolve_vocab_path(data_dir, KATAKANA_FILE)?)?,
            Mode::Kanji => {
                let level = validate_level(level)?;
                vocab.kanji = load_kanji_levels(data_dir, &[level.as_str()])?;
            }
            Mode::Keigo => vocab.keigo = load_keigo(&resolve_vocab_path(data_dir, KEIGO_FILE)?)?,
            Mode::Vocab => vocab.core_vocab = load_phrases(&resolve_vocab_path(data_dir, CORE_VOCAB_FILE)?)?,
            Mode::Survival => {
                vocab.survival_phrases = load_phrases(&resolve_vocab_path(data_dir, SURVIVAL_FILE)?)?
            }
        }
    }
    Ok(vocab)
}
