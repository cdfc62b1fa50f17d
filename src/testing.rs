//! Shared fixtures for unit tests

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::vocab::{
    kanji_file, load_all_vocab, VocabStore, CORE_VOCAB_FILE, HIRAGANA_FILE, KANJI_LEVELS, KATAKANA_FILE,
    KEIGO_FILE, SURVIVAL_FILE,
};

/// Write a small but complete corpus under `root/data`
pub fn write_vocab_dir(root: &Path) -> PathBuf {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let kana = json!([
        {"kana": "a", "romaji": "a"},
        {"kana": "i", "romaji": "i"},
        {"kana": "u", "romaji": "u"},
    ]);
    fs::write(data_dir.join(HIRAGANA_FILE), kana.to_string()).unwrap();
    fs::write(data_dir.join(KATAKANA_FILE), kana.to_string()).unwrap();

    let kanji = json!([
        {"kanji": "日", "meaning": ["sun", "day"]},
        {"kanji": "月", "meaning": ["moon", "month"]},
        {"kanji": "火", "meaning": "fire"},
    ]);
    for level in KANJI_LEVELS {
        fs::write(data_dir.join(kanji_file(level)), kanji.to_string()).unwrap();
    }

    let keigo = json!([
        {
            "base": "言う",
            "keigo": "申し上げる",
            "type": "kenjogo",
            "meaning": "to say (humble)",
            "usage": "business",
            "example_contexts": ["email", "meeting"],
        },
        {
            "base": "見る",
            "keigo": "拝見する",
            "type": "kenjogo",
            "meaning": "to see (humble)",
            "usage": "business",
            "example_contexts": ["email"],
        },
        {
            "base": "行く",
            "keigo": "伺う",
            "type": "kenjogo",
            "meaning": "to go (humble)",
            "usage": "business",
            "example_contexts": ["meeting"],
        },
        {
            "base": "食べる",
            "keigo": "召し上がる",
            "type": "sonkeigo",
            "meaning": "to eat (respectful)",
            "usage": "hosting a guest",
            "example_contexts": ["dinner"],
        },
    ]);
    fs::write(data_dir.join(KEIGO_FILE), keigo.to_string()).unwrap();

    let core_vocab = json!([
        {"category": "people", "english": "friend", "japanese": "友達", "kana": "ともだち", "romaji": "tomodachi"},
        {"category": "places", "english": "station", "japanese": "駅", "kana": "えき", "romaji": "eki"},
        {"category": "food", "english": "water", "japanese": "水", "kana": "みず", "romaji": "mizu"},
    ]);
    fs::write(data_dir.join(CORE_VOCAB_FILE), core_vocab.to_string()).unwrap();

    let survival = json!([
        {"english": "thank you", "japanese": "ありがとうございます", "kana": "ありがとうございます", "romaji": "arigatou gozaimasu"},
        {"english": "excuse me", "japanese": "すみません", "kana": "すみません", "romaji": "sumimasen"},
        {"english": "how much is this?", "japanese": "これはいくらですか？", "kana": "これはいくらですか", "romaji": "kore wa ikura desu ka"},
    ]);
    fs::write(data_dir.join(SURVIVAL_FILE), survival.to_string()).unwrap();

    data_dir
}

/// The same corpus as `write_vocab_dir`, loaded into memory
pub fn sample_vocab() -> VocabStore {
    let temp = tempfile::TempDir::new().unwrap();
    let data_dir = write_vocab_dir(temp.path());
    load_all_vocab(&data_dir).unwrap()
}
