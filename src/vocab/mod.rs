//! Vocabulary corpus for study sessions
//!
//! This module provides:
//! - Typed entries for kana, kanji, honorific forms and phrases
//! - JSON corpus loading with per-entry validation
//! - File fingerprints that guard the catalog against silent corpus edits

mod integrity;
mod loader;
mod models;

pub use integrity::{record_vocab_hashes, verify_vocab_hashes};
pub use loader::{
    compute_sha256, expected_files, kanji_file, load_all_vocab, load_kana, load_kanji, load_keigo,
    load_phrases, load_vocab_for_mode, required_files, resolve_vocab_path, validate_level, VocabError,
    CORE_VOCAB_FILE, HIRAGANA_FILE, KANJI_LEVELS, KATAKANA_FILE, KEIGO_FILE, SURVIVAL_FILE,
};
pub use models::*;
