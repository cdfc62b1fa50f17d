//! The item catalog derived from the corpus
//!
//! Item ids are stable strings built from mode, level, vocab key and variant:
//! `hiragana:あ:kana_to_romaji`, `kanji:N5:日:kanji_to_meaning`, `keigo:言う:plain_to_keigo`.

use crate::vocab::{Mode, VocabStore};

use super::models::{ItemSpec, ScheduledItem, Variant};

/// Build the stable id for an item
pub fn item_id(mode: Mode, level: Option<&str>, vocab_key: &str, variant: Variant) -> String {
    match (mode, level) {
        (Mode::Kanji, Some(level)) => format!("kanji:{}:{}:{}", level, vocab_key, variant),
        _ => format!("{}:{}:{}", mode, vocab_key, variant),
    }
}

fn items_for(mode: Mode, level: Option<&str>, keys: impl Iterator<Item = String>) -> Vec<ItemSpec> {
    let mut items = Vec::new();
    for key in keys {
        for &variant in Variant::for_mode(mode) {
            items.push(ItemSpec {
                id: item_id(mode, level, &key, variant),
                mode,
                level: level.map(str::to_string),
                variant,
                vocab_key: key.clone(),
            });
        }
    }
    items
}

/// Every item the corpus can produce
pub fn build_all_items(vocab: &VocabStore) -> Vec<ItemSpec> {
    let mut items = Vec::new();
    for mode in [Mode::Hiragana, Mode::Katakana] {
        items.extend(items_for(mode, None, vocab.kana(mode).iter().map(|e| e.kana.clone())));
    }
    for (level, entries) in &vocab.kanji {
        items.extend(items_for(
            Mode::Kanji,
            Some(level.as_str()),
            entries.iter().map(|e| e.kanji.clone()),
        ));
    }
    items.extend(items_for(Mode::Keigo, None, vocab.keigo.iter().map(|e| e.base.clone())));
    for mode in [Mode::Vocab, Mode::Survival] {
        items.extend(items_for(mode, None, vocab.phrases(mode).iter().map(|e| e.english.clone())));
    }
    items
}

/// Recover the vocab key from an item id
///
/// The key sits between the mode (and level) prefix and the variant suffix, so
/// keys that themselves contain `:` survive the round trip.
pub fn parse_vocab_key(item_id: &str, mode: Mode) -> Option<String> {
    let rest = item_id.strip_prefix(mode.as_str())?.strip_prefix(':')?;
    let rest = if mode == Mode::Kanji {
        rest.split_once(':')?.1
    } else {
        rest
    };
    let (key, variant) = rest.rsplit_once(':')?;
    if key.is_empty() || Variant::parse(variant).is_none() {
        return None;
    }
    Some(key.to_string())
}

impl ItemSpec {
    /// Rebuild the spec of a stored item, `None` if its id is malformed
    pub fn from_scheduled(item: &ScheduledItem) -> Option<Self> {
        Some(Self {
            id: item.item_id.clone(),
            mode: item.mode,
            level: item.level.clone(),
            variant: item.variant,
            vocab_key: parse_vocab_key(&item.item_id, item.mode)?,
        })
    }
}
