//! Multiple-choice question synthesis
//!
//! Every question has exactly three distinct choices drawn from the corpus. Only
//! honorific items carry an explanation; it starts as a fixed template and may be
//! replaced by provider text when enrichment is allowed.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::flashcards::ItemSpec;
use crate::vocab::{KeigoEntry, Mode, Register, VocabStore};

use super::enrichment::{ExplanationProvider, Pacer};
use super::models::{GeneratedQuestion, QuestionError, QuestionShape, SessionRequest};

type Result<T> = std::result::Result<T, QuestionError>;

pub const SYSTEM_INSTRUCTION: &str = "You are a Japanese language tutor. \
Explain in English using 2 short sentences. \
Do not introduce any Japanese words besides the provided base and keigo terms.";

const DEFAULT_CONTEXT: &str = "general business";

pub struct QuestionGenerator<'a> {
    vocab: &'a VocabStore,
    provider: Option<Box<dyn ExplanationProvider + 'a>>,
    pacer: Pacer,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(vocab: &'a VocabStore) -> Self {
        Self {
            vocab,
            provider: None,
            pacer: Pacer::default(),
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn ExplanationProvider + 'a>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn vocab(&self) -> &'a VocabStore {
        self.vocab
    }

    /// Build a question for one item
    pub fn synthesize<R: Rng + ?Sized>(
        &mut self,
        item: &ItemSpec,
        request: &SessionRequest,
        rng: &mut R,
        allow_enrichment: bool,
    ) -> Result<GeneratedQuestion> {
        let shape = QuestionShape::resolve(item.mode, item.variant)?;
        let mut question = match shape {
            QuestionShape::KanaToRomaji(mode) | QuestionShape::RomajiToKana(mode) => {
                self.kana_question(item, mode, shape, rng)?
            }
            QuestionShape::KanjiToMeaning | QuestionShape::MeaningToKanji => self.kanji_question(item, shape, rng)?,
            QuestionShape::PlainToKeigo | QuestionShape::ContextSelection | QuestionShape::PolitenessClassification => {
                self.keigo_question(item, shape, request, rng, allow_enrichment)?
            }
            QuestionShape::EnglishToJapanese(mode) | QuestionShape::JapaneseToEnglish(mode) => {
                self.phrase_question(item, mode, shape, rng)?
            }
        };

        question.metadata.insert("mode".to_string(), item.mode.to_string());
        question.metadata.insert("variant".to_string(), item.variant.to_string());
        Ok(question)
    }

    fn kana_question<R: Rng + ?Sized>(
        &self,
        item: &ItemSpec,
        mode: Mode,
        shape: QuestionShape,
        rng: &mut R,
    ) -> Result<GeneratedQuestion> {
        let entries = self.vocab.kana(mode);
        let entry = self
            .vocab
            .find_kana(mode, &item.vocab_key)
            .ok_or_else(|| unknown_entry(item))?;

        let (prompt, correct, pool): (_, _, Vec<String>) = match shape {
            QuestionShape::KanaToRomaji(_) => (
                &entry.kana,
                &entry.romaji,
                entries.iter().map(|e| e.romaji.clone()).collect(),
            ),
            _ => (
                &entry.romaji,
                &entry.kana,
                entries.iter().map(|e| e.kana.clone()).collect(),
            ),
        };
        let (choices, correct_index) = build_choices(rng, pool, correct, mode.as_str())?;
        Ok(GeneratedQuestion {
            prompt: format!("{} -> ?", prompt),
            choices,
            correct_index,
            explanation: String::new(),
            metadata: BTreeMap::new(),
        })
    }

    fn kanji_question<R: Rng + ?Sized>(
        &self,
        item: &ItemSpec,
        shape: QuestionShape,
        rng: &mut R,
    ) -> Result<GeneratedQuestion> {
        let level = item
            .level
            .as_deref()
            .ok_or_else(|| QuestionError::MissingLevel(item.id.clone()))?;
        let entries = self.vocab.kanji_level(level).unwrap_or_default();
        let entry = self
            .vocab
            .find_kanji(level, &item.vocab_key)
            .ok_or_else(|| unknown_entry(item))?;
        let gloss = entry.meaning.choose(rng).ok_or_else(|| unknown_entry(item))?.clone();
        let scope = format!("kanji {}", level);

        let (prompt, choices, correct_index) = match shape {
            QuestionShape::KanjiToMeaning => {
                // One gloss per other character, never a synonym of the tested one
                let pool: Vec<String> = entries
                    .iter()
                    .filter(|other| other.kanji != entry.kanji)
                    .filter_map(|other| other.meaning.choose(rng).cloned())
                    .filter(|candidate| !entry.meaning.contains(candidate))
                    .collect();
                let (choices, index) = build_choices(rng, pool, &gloss, &scope)?;
                (entry.kanji.clone(), choices, index)
            }
            _ => {
                let pool = entries.iter().map(|e| e.kanji.clone()).collect();
                let (choices, index) = build_choices(rng, pool, &entry.kanji, &scope)?;
                (gloss, choices, index)
            }
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("level".to_string(), level.to_string());
        Ok(GeneratedQuestion {
            prompt: format!("{} -> ?", prompt),
            choices,
            correct_index,
            explanation: String::new(),
            metadata,
        })
    }

    fn keigo_question<R: Rng + ?Sized>(
        &mut self,
        item: &ItemSpec,
        shape: QuestionShape,
        request: &SessionRequest,
        rng: &mut R,
        allow_enrichment: bool,
    ) -> Result<GeneratedQuestion> {
        let vocab = self.vocab;
        let entry = vocab.find_keigo(&item.vocab_key).ok_or_else(|| unknown_entry(item))?;

        let (prompt, choices, correct_index) = match shape {
            QuestionShape::PlainToKeigo => {
                let pool = vocab.keigo.iter().map(|e| e.keigo.clone()).collect();
                let (choices, index) = build_choices(rng, pool, &entry.keigo, "keigo")?;
                (format!("{} -> ?", entry.base), choices, index)
            }
            QuestionShape::ContextSelection => {
                let context = resolve_context(entry, request.context.as_deref());
                let others: Vec<&KeigoEntry> = vocab.keigo.iter().filter(|e| e.base != entry.base).collect();
                let outside: Vec<&KeigoEntry> = others
                    .iter()
                    .copied()
                    .filter(|e| !e.example_contexts.iter().any(|c| c == context))
                    .collect();
                let pool_entries = if outside.len() >= 2 { outside } else { others };
                let pool = pool_entries.iter().map(|e| e.keigo.clone()).collect();
                let (choices, index) = build_choices(rng, pool, &entry.keigo, "keigo")?;
                (format!("Which is appropriate in a {} context?", context), choices, index)
            }
            _ => {
                let choices = Register::labels().map(str::to_string).to_vec();
                let index = Register::ALL
                    .iter()
                    .position(|register| *register == entry.register)
                    .unwrap_or_default();
                (format!("{} is which politeness level?", entry.keigo), choices, index)
            }
        };

        let explanation = self.explain(entry, request.context.as_deref(), allow_enrichment);

        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), entry.register.as_str().to_string());
        metadata.insert("usage".to_string(), entry.usage.clone());
        metadata.insert("base".to_string(), entry.base.clone());
        metadata.insert("keigo".to_string(), entry.keigo.clone());
        Ok(GeneratedQuestion {
            prompt,
            choices,
            correct_index,
            explanation,
            metadata,
        })
    }

    fn phrase_question<R: Rng + ?Sized>(
        &self,
        item: &ItemSpec,
        mode: Mode,
        shape: QuestionShape,
        rng: &mut R,
    ) -> Result<GeneratedQuestion> {
        let entries = self.vocab.phrases(mode);
        let entry = self
            .vocab
            .find_phrase(mode, &item.vocab_key)
            .ok_or_else(|| unknown_entry(item))?;

        let (prompt, correct, pool): (_, _, Vec<String>) = match shape {
            QuestionShape::EnglishToJapanese(_) => (
                &entry.english,
                &entry.japanese,
                entries.iter().map(|e| e.japanese.clone()).collect(),
            ),
            _ => (
                &entry.japanese,
                &entry.english,
                entries.iter().map(|e| e.english.clone()).collect(),
            ),
        };
        let (choices, correct_index) = build_choices(rng, pool, correct, mode.as_str())?;

        let mut metadata = BTreeMap::new();
        metadata.insert("kana".to_string(), entry.kana.clone());
        metadata.insert("romaji".to_string(), entry.romaji.clone());
        if let Some(note) = &entry.note {
            metadata.insert("note".to_string(), note.clone());
        }
        Ok(GeneratedQuestion {
            prompt: format!("{} -> ?", prompt),
            choices,
            correct_index,
            explanation: String::new(),
            metadata,
        })
    }

    fn explain(&mut self, entry: &KeigoEntry, context: Option<&str>, allow_enrichment: bool) -> String {
        let template = template_explanation(entry);
        if !allow_enrichment {
            return template;
        }
        let Some(provider) = self.provider.as_ref() else {
            return template;
        };

        let user = format!(
            "Base: {}\nKeigo: {}\nType: {}\nMeaning: {}\nUsage: {}\nContext: {}\nExplain the nuance for business usage.",
            entry.base,
            entry.keigo,
            entry.register.as_str(),
            entry.meaning,
            entry.usage,
            context.unwrap_or(DEFAULT_CONTEXT),
        );

        self.pacer.wait();
        match provider.complete(SYSTEM_INSTRUCTION, &user) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                log::debug!("Empty explanation for {}, using template", entry.base);
                template
            }
            Err(e) => {
                log::warn!("Explanation enrichment failed for {}: {}", entry.base, e);
                template
            }
        }
    }
}

pub fn template_explanation(entry: &KeigoEntry) -> String {
    format!(
        "{} is the {} form of {}. Meaning: {}. Usage: {}.",
        entry.keigo,
        entry.register.as_str(),
        entry.base,
        entry.meaning,
        entry.usage
    )
}

/// The hint when the entry lists it, otherwise the entry's first context
fn resolve_context<'e>(entry: &'e KeigoEntry, hint: Option<&'e str>) -> &'e str {
    match hint {
        Some(hint) if entry.example_contexts.iter().any(|c| c == hint) => hint,
        _ => entry
            .example_contexts
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTEXT),
    }
}

fn unknown_entry(item: &ItemSpec) -> QuestionError {
    QuestionError::UnknownEntry {
        item_id: item.id.clone(),
        key: item.vocab_key.clone(),
    }
}

/// Two distinct distractors plus the correct answer, in random order
fn build_choices<R: Rng + ?Sized>(
    rng: &mut R,
    pool: Vec<String>,
    correct: &str,
    scope: &str,
) -> Result<(Vec<String>, usize)> {
    let mut seen = HashSet::new();
    let distractors: Vec<String> = pool
        .into_iter()
        .filter(|candidate| candidate != correct)
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect();
    if distractors.len() < 2 {
        return Err(QuestionError::InsufficientDistractors {
            scope: scope.to_string(),
        });
    }

    let mut choices: Vec<String> = distractors.choose_multiple(rng, 2).cloned().collect();
    choices.push(correct.to_string());
    choices.shuffle(rng);
    let correct_index = choices.iter().position(|choice| choice == correct).unwrap_or_default();
    Ok((choices, correct_index))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::flashcards::{build_all_items, Variant};
    use crate::quiz::enrichment::{self, EnrichmentError};
    use crate::testing::sample_vocab;
    use crate::vocab::StudyMode;

    struct StubProvider {
        reply: Option<String>,
        calls: Rc<Cell<usize>>,
        stamps: Rc<RefCell<Vec<Instant>>>,
    }

    impl StubProvider {
        fn replying(reply: Option<&str>) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let provider = Self {
                reply: reply.map(str::to_string),
                calls: Rc::clone(&calls),
                stamps: Rc::new(RefCell::new(Vec::new())),
            };
            (provider, calls)
        }
    }

    impl ExplanationProvider for StubProvider {
        fn complete(&self, system: &str, user: &str) -> enrichment::Result<String> {
            assert_eq!(system, SYSTEM_INSTRUCTION);
            assert!(user.ends_with("Explain the nuance for business usage."));
            self.calls.set(self.calls.get() + 1);
            self.stamps.borrow_mut().push(Instant::now());
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(EnrichmentError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)),
            }
        }
    }

    fn request(mode: StudyMode, context: Option<&str>) -> SessionRequest {
        SessionRequest {
            mode,
            level: None,
            context: context.map(str::to_string),
            count: 10,
            seed: 7,
        }
    }

    fn item(vocab: &VocabStore, mode: Mode, variant: Variant, key: &str) -> ItemSpec {
        build_all_items(vocab)
            .into_iter()
            .find(|i| {
                i.mode == mode
                    && i.variant == variant
                    && i.vocab_key == key
                    && matches!(i.level.as_deref(), None | Some("N5"))
            })
            .unwrap()
    }

    #[test]
    fn test_every_item_has_three_distinct_choices() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let mut rng = StdRng::seed_from_u64(42);
        let req = request(StudyMode::Kana, None);

        for card in build_all_items(&vocab) {
            let question = generator.synthesize(&card, &req, &mut rng, false).unwrap();
            assert_eq!(question.choices.len(), 3, "{}", card.id);
            let unique: HashSet<_> = question.choices.iter().collect();
            assert_eq!(unique.len(), 3, "{}", card.id);
            assert!(question.correct_index < 3);
            assert_eq!(question.metadata["variant"], card.variant.as_str());
        }
    }

    #[test]
    fn test_kana_question_points_at_romaji() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let mut rng = StdRng::seed_from_u64(1);
        let card = item(&vocab, Mode::Hiragana, Variant::KanaToRomaji, "i");

        let question = generator
            .synthesize(&card, &request(StudyMode::Kana, None), &mut rng, false)
            .unwrap();
        assert_eq!(question.prompt, "i -> ?");
        assert_eq!(question.correct_answer(), Some("i"));
        assert!(question.explanation.is_empty());
    }

    #[test]
    fn test_same_seed_same_question() {
        let vocab = sample_vocab();
        let card = item(&vocab, Mode::Keigo, Variant::PlainToKeigo, "言う");
        let req = request(StudyMode::Only(Mode::Keigo), None);

        let first = QuestionGenerator::new(&vocab)
            .synthesize(&card, &req, &mut StdRng::seed_from_u64(9), false)
            .unwrap();
        let second = QuestionGenerator::new(&vocab)
            .synthesize(&card, &req, &mut StdRng::seed_from_u64(9), false)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_kanji_distractors_exclude_own_glosses() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Kanji, Variant::KanjiToMeaning, "日");
        let req = request(StudyMode::Only(Mode::Kanji), None);

        for seed in 0..20 {
            let question = generator
                .synthesize(&card, &req, &mut StdRng::seed_from_u64(seed), false)
                .unwrap();
            let correct = question.correct_answer().unwrap().to_string();
            assert!(correct == "sun" || correct == "day");
            for (i, choice) in question.choices.iter().enumerate() {
                if i != question.correct_index {
                    assert!(choice != "sun" && choice != "day");
                }
            }
        }
    }

    #[test]
    fn test_kanji_without_level_is_rejected() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let mut card = item(&vocab, Mode::Kanji, Variant::MeaningToKanji, "月");
        card.level = None;

        let err = generator
            .synthesize(&card, &request(StudyMode::Only(Mode::Kanji), None), &mut StdRng::seed_from_u64(0), false)
            .unwrap_err();
        assert!(matches!(err, QuestionError::MissingLevel(_)));
    }

    #[test]
    fn test_unknown_key_and_shape() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let mut rng = StdRng::seed_from_u64(0);
        let req = request(StudyMode::Kana, None);

        let mut missing = item(&vocab, Mode::Hiragana, Variant::KanaToRomaji, "a");
        missing.vocab_key = "zz".to_string();
        assert!(matches!(
            generator.synthesize(&missing, &req, &mut rng, false),
            Err(QuestionError::UnknownEntry { .. })
        ));

        let mut mismatched = item(&vocab, Mode::Hiragana, Variant::KanaToRomaji, "a");
        mismatched.variant = Variant::PlainToKeigo;
        assert!(matches!(
            generator.synthesize(&mismatched, &req, &mut rng, false),
            Err(QuestionError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_insufficient_distractors() {
        let mut vocab = sample_vocab();
        vocab.hiragana.truncate(2);
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Hiragana, Variant::RomajiToKana, "a");

        let err = generator
            .synthesize(&card, &request(StudyMode::Kana, None), &mut StdRng::seed_from_u64(0), false)
            .unwrap_err();
        assert_eq!(
            err,
            QuestionError::InsufficientDistractors {
                scope: "hiragana".to_string()
            }
        );
    }

    #[test]
    fn test_correct_answer_lands_in_every_position() {
        let pool: Vec<String> = ["b", "c", "d", "c"].iter().map(|s| s.to_string()).collect();
        let mut positions = HashSet::new();
        for seed in 0..50 {
            let (choices, index) = build_choices(&mut StdRng::seed_from_u64(seed), pool.clone(), "a", "test").unwrap();
            assert_eq!(choices.len(), 3);
            assert_eq!(choices[index], "a");
            assert_eq!(choices.iter().filter(|c| *c == "a").count(), 1);
            positions.insert(index);
        }
        assert_eq!(positions, HashSet::from([0, 1, 2]));
    }

    #[test]
    fn test_context_selection_uses_listed_hint() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Keigo, Variant::ContextSelection, "言う");

        let question = generator
            .synthesize(&card, &request(StudyMode::Only(Mode::Keigo), Some("meeting")), &mut StdRng::seed_from_u64(3), false)
            .unwrap();
        assert_eq!(question.prompt, "Which is appropriate in a meeting context?");
        assert_eq!(question.correct_answer(), Some("申し上げる"));
        // 伺う also lists "meeting" and two entries remain without it
        assert!(!question.choices.contains(&"伺う".to_string()));
    }

    #[test]
    fn test_context_selection_falls_back_to_first_context() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Keigo, Variant::ContextSelection, "食べる");

        let question = generator
            .synthesize(&card, &request(StudyMode::Only(Mode::Keigo), Some("email")), &mut StdRng::seed_from_u64(3), false)
            .unwrap();
        assert_eq!(question.prompt, "Which is appropriate in a dinner context?");
    }

    #[test]
    fn test_politeness_classification_fixed_choices() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Keigo, Variant::PolitenessClassification, "食べる");

        let question = generator
            .synthesize(&card, &request(StudyMode::Only(Mode::Keigo), None), &mut StdRng::seed_from_u64(0), false)
            .unwrap();
        assert_eq!(question.choices, vec!["Sonkeigo", "Kenjogo", "Teineigo"]);
        assert_eq!(question.correct_index, 0);
        assert_eq!(question.prompt, "召し上がる is which politeness level?");
        assert_eq!(
            question.explanation,
            "召し上がる is the sonkeigo form of 食べる. Meaning: to eat (respectful). Usage: hosting a guest."
        );
        assert_eq!(question.metadata["type"], "sonkeigo");
    }

    #[test]
    fn test_phrase_metadata_carries_reading() {
        let vocab = sample_vocab();
        let mut generator = QuestionGenerator::new(&vocab);
        let card = item(&vocab, Mode::Vocab, Variant::EnglishToJapanese, "station");

        let question = generator
            .synthesize(&card, &request(StudyMode::Only(Mode::Vocab), None), &mut StdRng::seed_from_u64(0), false)
            .unwrap();
        assert_eq!(question.prompt, "station -> ?");
        assert_eq!(question.correct_answer(), Some("駅"));
        assert_eq!(question.metadata["romaji"], "eki");
    }

    #[test]
    fn test_enrichment_replaces_template() {
        let vocab = sample_vocab();
        let (provider, calls) = StubProvider::replying(Some("  Humble form for business.  "));
        let mut generator = QuestionGenerator::new(&vocab).with_provider(Box::new(provider));
        let card = item(&vocab, Mode::Keigo, Variant::PlainToKeigo, "見る");
        let req = request(StudyMode::Only(Mode::Keigo), None);

        let enriched = generator.synthesize(&card, &req, &mut StdRng::seed_from_u64(0), true).unwrap();
        assert_eq!(enriched.explanation, "Humble form for business.");
        assert_eq!(calls.get(), 1);

        let plain = generator.synthesize(&card, &req, &mut StdRng::seed_from_u64(0), false).unwrap();
        assert!(plain.explanation.starts_with("拝見する is the kenjogo form of 見る."));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_enrichment_failure_or_empty_falls_back() {
        let vocab = sample_vocab();
        let card = item(&vocab, Mode::Keigo, Variant::PlainToKeigo, "見る");
        let req = request(StudyMode::Only(Mode::Keigo), None);

        for reply in [None, Some("   ")] {
            let (provider, calls) = StubProvider::replying(reply);
            let mut generator = QuestionGenerator::new(&vocab).with_provider(Box::new(provider));
            let question = generator.synthesize(&card, &req, &mut StdRng::seed_from_u64(0), true).unwrap();
            assert_eq!(question.explanation, template_explanation(vocab.find_keigo("見る").unwrap()));
            assert_eq!(calls.get(), 1);
        }
    }

    #[test]
    fn test_provider_calls_are_paced() {
        let vocab = sample_vocab();
        let (provider, _) = StubProvider::replying(Some("ok"));
        let stamps = Rc::clone(&provider.stamps);
        let mut generator = QuestionGenerator::new(&vocab)
            .with_provider(Box::new(provider))
            .with_pacer(Pacer::new(Duration::from_millis(40)));
        let card = item(&vocab, Mode::Keigo, Variant::PlainToKeigo, "言う");
        let req = request(StudyMode::Only(Mode::Keigo), None);

        for seed in 0..3 {
            generator.synthesize(&card, &req, &mut StdRng::seed_from_u64(seed), true).unwrap();
        }
        let stamps = stamps.borrow();
        assert_eq!(stamps.len(), 3);
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(40));
        }
    }
}
