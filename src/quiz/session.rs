//! The interactive review loop
//!
//! For each planned item the session builds a question, checks it, asks it through
//! a [`Frontend`], schedules the next review and commits the result before moving
//! on. Only store and terminal errors end a session early.

use std::io;
use std::time::Instant;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::flashcards::{advance, ItemSpec, ReviewStore, ReviewUpdate, StoreError};
use crate::vocab::VocabStore;

use super::generator::QuestionGenerator;
use super::models::{GeneratedQuestion, Issue, QuestionError, SessionRequest};
use super::planner;
use super::verifier::Verifier;

/// Questions built per item before giving up on it
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Why an item was not asked
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Scheduling row disappeared after planning
    Missing,
    Synthesis(QuestionError),
    /// Still failing verification after the last attempt
    Invalid { attempts: usize, issues: Vec<Issue> },
}

/// What happened when a question was answered
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub chosen: usize,
    pub correct: bool,
    pub response_ms: u64,
    pub interval_after: u32,
    pub due_date: NaiveDate,
}

/// Presentation seam between the session loop and whatever shows questions
pub trait Frontend {
    /// Show a question; `position` counts from 1
    fn present(&mut self, position: usize, question: &GeneratedQuestion) -> io::Result<()>;

    /// Block until a valid zero-based choice index is entered
    fn read_answer(&mut self, choice_count: usize) -> io::Result<usize>;

    fn feedback(&mut self, item: &ItemSpec, question: &GeneratedQuestion, outcome: &ReviewOutcome) -> io::Result<()>;

    fn skipped(&mut self, item: &ItemSpec, reason: &SkipReason) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub planned: usize,
    pub answered: usize,
    pub correct: usize,
    pub skipped: usize,
}

impl SessionReport {
    pub fn nothing_due(&self) -> bool {
        self.planned == 0
    }
}

/// Per-item question preparation states
enum Attempt {
    Synthesizing,
    Verifying(GeneratedQuestion),
    /// Leak found; enrichment is switched off for the rest of this item
    Degrading,
    Accepted(GeneratedQuestion),
    Rejected(SkipReason),
}

pub struct Session<'a, F: Frontend> {
    store: &'a mut ReviewStore,
    vocab: &'a VocabStore,
    generator: QuestionGenerator<'a>,
    verifier: Verifier,
    frontend: F,
}

impl<'a, F: Frontend> Session<'a, F> {
    pub fn new(store: &'a mut ReviewStore, generator: QuestionGenerator<'a>, frontend: F) -> Self {
        Self {
            store,
            vocab: generator.vocab(),
            generator,
            verifier: Verifier::new(),
            frontend,
        }
    }

    pub fn into_frontend(self) -> F {
        self.frontend
    }

    pub fn run(&mut self, request: &SessionRequest, today: NaiveDate) -> Result<SessionReport> {
        let items = planner::plan(&*self.store, request, today)?;
        let mut report = SessionReport {
            planned: items.len(),
            ..SessionReport::default()
        };
        if items.is_empty() {
            log::info!("Nothing to review for {}", request.mode);
            return Ok(report);
        }

        let mut rng = StdRng::seed_from_u64(request.seed);
        for (index, item) in items.iter().enumerate() {
            match self.review(index + 1, item, request, today, &mut rng)? {
                Some(outcome) => {
                    report.answered += 1;
                    if outcome.correct {
                        report.correct += 1;
                    }
                }
                None => report.skipped += 1,
            }
        }

        log::info!(
            "Session finished: {} answered, {} correct, {} skipped",
            report.answered,
            report.correct,
            report.skipped
        );
        Ok(report)
    }

    fn review(
        &mut self,
        position: usize,
        item: &ItemSpec,
        request: &SessionRequest,
        today: NaiveDate,
        rng: &mut StdRng,
    ) -> Result<Option<ReviewOutcome>> {
        let Some(row) = self.store.fetch_item(&item.id)? else {
            return self.skip(item, SkipReason::Missing);
        };

        let question = match self.prepare(item, request, rng) {
            Ok(question) => question,
            Err(reason) => return self.skip(item, reason),
        };

        self.frontend.present(position, &question)?;
        let started = Instant::now();
        let chosen = self.frontend.read_answer(question.choices.len())?;
        let response_ms = started.elapsed().as_millis() as u64;

        let correct = chosen == question.correct_index;
        let next = advance(row.ease, row.interval, correct, today);
        let update = ReviewUpdate {
            item_id: item.id.clone(),
            correct,
            response_ms,
            ease_before: row.ease,
            ease_after: next.ease,
            interval_before: row.interval,
            interval_after: next.interval,
            due_date: next.due_date,
        };
        match self.store.apply_review(&update) {
            Ok(()) => {}
            Err(StoreError::ItemNotFound(_)) => return self.skip(item, SkipReason::Missing),
            Err(e) => return Err(e.into()),
        }

        let outcome = ReviewOutcome {
            chosen,
            correct,
            response_ms,
            interval_after: next.interval,
            due_date: next.due_date,
        };
        self.frontend.feedback(item, &question, &outcome)?;
        Ok(Some(outcome))
    }

    /// Build and verify a question, retrying up to `MAX_ATTEMPTS` times
    fn prepare(
        &mut self,
        item: &ItemSpec,
        request: &SessionRequest,
        rng: &mut StdRng,
    ) -> std::result::Result<GeneratedQuestion, SkipReason> {
        let mut attempts = 0;
        let mut allow_enrichment = true;
        let mut state = Attempt::Synthesizing;

        loop {
            state = match state {
                Attempt::Synthesizing => {
                    attempts += 1;
                    match self.generator.synthesize(item, request, rng, allow_enrichment) {
                        Ok(question) => Attempt::Verifying(question),
                        Err(e) => Attempt::Rejected(SkipReason::Synthesis(e)),
                    }
                }
                Attempt::Verifying(question) => {
                    let result = self.verifier.verify(item, &question, self.vocab);
                    if result.valid {
                        Attempt::Accepted(result.question)
                    } else if attempts >= MAX_ATTEMPTS {
                        Attempt::Rejected(SkipReason::Invalid {
                            attempts,
                            issues: result.issues,
                        })
                    } else if result.has_leak() {
                        Attempt::Degrading
                    } else {
                        Attempt::Synthesizing
                    }
                }
                Attempt::Degrading => {
                    log::debug!("Disabling enrichment for {}", item.id);
                    allow_enrichment = false;
                    Attempt::Synthesizing
                }
                Attempt::Accepted(question) => return Ok(question),
                Attempt::Rejected(reason) => return Err(reason),
            };
        }
    }

    fn skip(&mut self, item: &ItemSpec, reason: SkipReason) -> Result<Option<ReviewOutcome>> {
        log::warn!("Skipping {}: {:?}", item.id, reason);
        self.frontend.skipped(item, &reason)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::flashcards::{build_all_items, ScheduledItem, Variant};
    use crate::quiz::enrichment::{self, ExplanationProvider, Pacer};
    use crate::testing::sample_vocab;
    use crate::vocab::{Mode, StudyMode};

    #[derive(Default)]
    struct ScriptedFrontend {
        answer_correctly: bool,
        current: Option<GeneratedQuestion>,
        presented: Vec<(usize, GeneratedQuestion)>,
        outcomes: Vec<(String, ReviewOutcome)>,
        skips: Vec<(String, SkipReason)>,
    }

    impl Frontend for ScriptedFrontend {
        fn present(&mut self, position: usize, question: &GeneratedQuestion) -> io::Result<()> {
            self.current = Some(question.clone());
            self.presented.push((position, question.clone()));
            Ok(())
        }

        fn read_answer(&mut self, choice_count: usize) -> io::Result<usize> {
            let correct = self.current.as_ref().map(|q| q.correct_index).unwrap_or(0);
            Ok(if self.answer_correctly {
                correct
            } else {
                (correct + 1) % choice_count
            })
        }

        fn feedback(&mut self, item: &ItemSpec, _question: &GeneratedQuestion, outcome: &ReviewOutcome) -> io::Result<()> {
            self.outcomes.push((item.id.clone(), outcome.clone()));
            Ok(())
        }

        fn skipped(&mut self, item: &ItemSpec, reason: &SkipReason) -> io::Result<()> {
            self.skips.push((item.id.clone(), reason.clone()));
            Ok(())
        }
    }

    struct LeakyProvider {
        calls: Rc<Cell<usize>>,
    }

    impl ExplanationProvider for LeakyProvider {
        fn complete(&self, _system: &str, _user: &str) -> enrichment::Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok("Humble speech, similar to おっしゃる in tone.".to_string())
        }
    }

    /// Removes rows through a second connection while the session is running
    enum Removal {
        /// Every row, as soon as the first question is shown
        AllOnFirstPresent,
        /// Every row but the answered one, after the first feedback
        OthersAfterFirstFeedback,
    }

    struct RemovingFrontend {
        inner: ScriptedFrontend,
        other: ReviewStore,
        removal: Removal,
        fired: bool,
    }

    impl RemovingFrontend {
        fn new(other: ReviewStore, removal: Removal) -> Self {
            Self {
                inner: frontend(true),
                other,
                removal,
                fired: false,
            }
        }

        fn keep_only(&mut self, keep: &[ItemSpec]) {
            self.other.sync_items(keep, today()).unwrap();
            self.fired = true;
        }
    }

    impl Frontend for RemovingFrontend {
        fn present(&mut self, position: usize, question: &GeneratedQuestion) -> io::Result<()> {
            if matches!(self.removal, Removal::AllOnFirstPresent) && !self.fired {
                self.keep_only(&[]);
            }
            self.inner.present(position, question)
        }

        fn read_answer(&mut self, choice_count: usize) -> io::Result<usize> {
            self.inner.read_answer(choice_count)
        }

        fn feedback(&mut self, item: &ItemSpec, question: &GeneratedQuestion, outcome: &ReviewOutcome) -> io::Result<()> {
            if matches!(self.removal, Removal::OthersAfterFirstFeedback) && !self.fired {
                self.keep_only(std::slice::from_ref(item));
            }
            self.inner.feedback(item, question, outcome)
        }

        fn skipped(&mut self, item: &ItemSpec, reason: &SkipReason) -> io::Result<()> {
            self.inner.skipped(item, reason)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    /// Two connections to one on-disk database, holding every hiragana item
    fn shared_stores(vocab: &VocabStore, temp: &TempDir) -> (ReviewStore, ReviewStore, Vec<ItemSpec>) {
        let db_path = temp.path().join("reviews.db");
        let mut store = ReviewStore::open(&db_path).unwrap();
        let items: Vec<ItemSpec> = build_all_items(vocab)
            .into_iter()
            .filter(|i| i.mode == Mode::Hiragana)
            .collect();
        store.sync_items(&items, today()).unwrap();
        let other = ReviewStore::open(&db_path).unwrap();
        (store, other, items)
    }

    fn request(mode: StudyMode, count: usize) -> SessionRequest {
        SessionRequest {
            mode,
            level: None,
            context: None,
            count,
            seed: 42,
        }
    }

    fn store_with(vocab: &VocabStore, mode: Mode) -> ReviewStore {
        let mut store = ReviewStore::open_in_memory().unwrap();
        let items: Vec<ItemSpec> = build_all_items(vocab).into_iter().filter(|i| i.mode == mode).collect();
        store.sync_items(&items, today()).unwrap();
        store
    }

    fn frontend(answer_correctly: bool) -> ScriptedFrontend {
        ScriptedFrontend {
            answer_correctly,
            ..ScriptedFrontend::default()
        }
    }

    #[test]
    fn test_correct_answers_grow_interval() {
        let vocab = sample_vocab();
        let mut store = store_with(&vocab, Mode::Hiragana);

        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), frontend(true));
        let report = session.run(&request(StudyMode::Only(Mode::Hiragana), 6), today()).unwrap();
        let frontend = session.into_frontend();

        assert_eq!(report.planned, 6);
        assert_eq!(report.answered, 6);
        assert_eq!(report.correct, 6);
        assert_eq!(frontend.presented.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);

        for (item_id, outcome) in &frontend.outcomes {
            assert!(outcome.correct);
            assert_eq!(outcome.interval_after, 2);
            let row = store.fetch_item(item_id).unwrap().unwrap();
            assert!((row.ease - 2.1).abs() < 1e-9);
            assert_eq!(row.due_date, today() + chrono::Duration::days(2));
            assert_eq!(row.last_outcome, Some(true));
            assert_eq!(store.review_log(item_id).unwrap().len(), 1);
        }
        assert_eq!(store.count_due(today()).unwrap(), 0);
    }

    #[test]
    fn test_wrong_answers_reset_interval() {
        let vocab = sample_vocab();
        let mut store = store_with(&vocab, Mode::Katakana);

        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), frontend(false));
        let report = session.run(&request(StudyMode::Only(Mode::Katakana), 2), today()).unwrap();
        let frontend = session.into_frontend();

        assert_eq!(report.answered, 2);
        assert_eq!(report.correct, 0);
        for (item_id, outcome) in &frontend.outcomes {
            assert_eq!(outcome.interval_after, 1);
            let row = store.fetch_item(item_id).unwrap().unwrap();
            assert!((row.ease - 1.8).abs() < 1e-9);
            assert_eq!(row.last_outcome, Some(false));
        }
    }

    #[test]
    fn test_nothing_due() {
        let vocab = sample_vocab();
        let mut store = ReviewStore::open_in_memory().unwrap();

        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), frontend(true));
        let report = session.run(&request(StudyMode::Kana, 5), today()).unwrap();
        assert!(report.nothing_due());
        assert!(session.into_frontend().presented.is_empty());
    }

    #[test]
    fn test_leak_degrades_to_template() {
        let vocab = sample_vocab();
        let mut store = ReviewStore::open_in_memory().unwrap();
        let item = build_all_items(&vocab)
            .into_iter()
            .find(|i| i.mode == Mode::Keigo && i.variant == Variant::PlainToKeigo && i.vocab_key == "言う")
            .unwrap();
        store.sync_items(&[item], today()).unwrap();

        let calls = Rc::new(Cell::new(0));
        let generator = QuestionGenerator::new(&vocab)
            .with_provider(Box::new(LeakyProvider { calls: Rc::clone(&calls) }))
            .with_pacer(Pacer::new(Duration::ZERO));
        let mut session = Session::new(&mut store, generator, frontend(true));
        let report = session.run(&request(StudyMode::Only(Mode::Keigo), 1), today()).unwrap();
        let frontend = session.into_frontend();

        assert_eq!(report.answered, 1);
        assert_eq!(calls.get(), 1);
        let (_, question) = &frontend.presented[0];
        assert!(question.explanation.starts_with("申し上げる is the kenjogo form of 言う."));
    }

    #[test]
    fn test_unknown_entry_is_skipped_and_session_continues() {
        let vocab = sample_vocab();
        let mut store = store_with(&vocab, Mode::Hiragana);
        store
            .put_item(&ScheduledItem {
                item_id: "hiragana:ん:kana_to_romaji".to_string(),
                mode: Mode::Hiragana,
                level: None,
                variant: Variant::KanaToRomaji,
                ease: 2.0,
                interval: 1,
                due_date: today(),
                last_outcome: None,
                last_reviewed_at: None,
            })
            .unwrap();

        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), frontend(true));
        let report = session.run(&request(StudyMode::Only(Mode::Hiragana), 7), today()).unwrap();
        let frontend = session.into_frontend();

        assert_eq!(report.planned, 7);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.answered, 6);
        assert_eq!(frontend.skips.len(), 1);
        assert_eq!(frontend.skips[0].0, "hiragana:ん:kana_to_romaji");
        assert!(matches!(
            frontend.skips[0].1,
            SkipReason::Synthesis(QuestionError::UnknownEntry { .. })
        ));
        assert!(store.review_log("hiragana:ん:kana_to_romaji").unwrap().is_empty());
    }

    #[test]
    fn test_five_successes_keep_growing() {
        let vocab = sample_vocab();
        let mut store = ReviewStore::open_in_memory().unwrap();
        let item = build_all_items(&vocab)
            .into_iter()
            .find(|i| i.mode == Mode::Hiragana)
            .unwrap();
        let item_id = item.id.clone();
        store.sync_items(&[item], today()).unwrap();

        let mut day = today();
        let mut last_interval = 1;
        for _ in 0..5 {
            let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), frontend(true));
            let report = session.run(&request(StudyMode::Only(Mode::Hiragana), 1), day).unwrap();
            drop(session);
            assert_eq!(report.correct, 1);

            let row = store.fetch_item(&item_id).unwrap().unwrap();
            assert!(row.interval > last_interval);
            assert!(row.ease <= 2.5);
            last_interval = row.interval;
            day = row.due_date;
        }
        let row = store.fetch_item(&item_id).unwrap().unwrap();
        assert!((row.ease - 2.5).abs() < 1e-9);
        assert_eq!(store.review_log(&item_id).unwrap().len(), 5);
    }

    #[test]
    fn test_persistent_leak_hits_attempt_cap_and_session_continues() {
        let mut vocab = sample_vocab();
        let entry = vocab.keigo.iter_mut().find(|e| e.base == "言う").unwrap();
        entry.usage = "会議 with clients".to_string();
        let mut store = ReviewStore::open_in_memory().unwrap();
        let items: Vec<ItemSpec> = build_all_items(&vocab)
            .into_iter()
            .filter(|i| i.mode == Mode::Keigo && i.variant == Variant::PlainToKeigo)
            .filter(|i| i.vocab_key == "言う" || i.vocab_key == "見る")
            .collect();
        store.sync_items(&items, today()).unwrap();

        let calls = Rc::new(Cell::new(0));
        let generator = QuestionGenerator::new(&vocab)
            .with_provider(Box::new(LeakyProvider { calls: Rc::clone(&calls) }))
            .with_pacer(Pacer::new(Duration::ZERO));
        let mut session = Session::new(&mut store, generator, frontend(true));
        let report = session.run(&request(StudyMode::Only(Mode::Keigo), 2), today()).unwrap();
        let frontend = session.into_frontend();

        assert_eq!(report.planned, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.answered, 1);
        // One enriched attempt per item; 言う degrades once, 見る degrades and then passes
        assert_eq!(calls.get(), 2);

        assert_eq!(frontend.skips.len(), 1);
        assert_eq!(frontend.skips[0].0, "keigo:言う:plain_to_keigo");
        assert_eq!(
            frontend.skips[0].1,
            SkipReason::Invalid {
                attempts: MAX_ATTEMPTS,
                issues: vec![Issue::ExplanationLeak],
            }
        );
        assert_eq!(frontend.outcomes.len(), 1);
        assert_eq!(frontend.outcomes[0].0, "keigo:見る:plain_to_keigo");
        assert!(store.review_log("keigo:言う:plain_to_keigo").unwrap().is_empty());
    }

    #[test]
    fn test_rows_removed_after_planning_are_skipped() {
        let vocab = sample_vocab();
        let temp = TempDir::new().unwrap();
        let (mut store, other, items) = shared_stores(&vocab, &temp);

        let removing = RemovingFrontend::new(other, Removal::OthersAfterFirstFeedback);
        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), removing);
        let report = session.run(&request(StudyMode::Only(Mode::Hiragana), items.len()), today()).unwrap();
        let frontend = session.into_frontend().inner;

        assert_eq!(report.planned, items.len());
        assert_eq!(report.answered, 1);
        assert_eq!(report.skipped, items.len() - 1);
        assert_eq!(frontend.presented.len(), 1);
        assert!(frontend.skips.iter().all(|(_, reason)| *reason == SkipReason::Missing));

        let answered = &frontend.outcomes[0].0;
        for item in &items {
            let logged = store.review_log(&item.id).unwrap().len();
            assert_eq!(logged, usize::from(&item.id == answered), "{}", item.id);
        }
    }

    #[test]
    fn test_row_removed_before_commit_is_skipped() {
        let vocab = sample_vocab();
        let temp = TempDir::new().unwrap();
        let (mut store, other, items) = shared_stores(&vocab, &temp);

        let removing = RemovingFrontend::new(other, Removal::AllOnFirstPresent);
        let mut session = Session::new(&mut store, QuestionGenerator::new(&vocab), removing);
        let report = session.run(&request(StudyMode::Only(Mode::Hiragana), items.len()), today()).unwrap();
        let frontend = session.into_frontend().inner;

        // The first item was asked but its row was gone when the answer was committed
        assert_eq!(frontend.presented.len(), 1);
        assert_eq!(report.answered, 0);
        assert_eq!(report.skipped, items.len());
        assert!(frontend.outcomes.is_empty());
        assert!(frontend.skips.iter().all(|(_, reason)| *reason == SkipReason::Missing));
        for item in &items {
            assert!(store.review_log(&item.id).unwrap().is_empty());
        }
        assert_eq!(store.count_items().unwrap(), 0);
    }
}
