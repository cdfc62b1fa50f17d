use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};

use nihongo_lib::quiz::{ChatCompletionsProvider, QuestionGenerator, Session, SessionRequest};
use nihongo_lib::vocab::{load_vocab_for_mode, validate_level, verify_vocab_hashes, Mode, StudyMode};

use crate::app::App;
use crate::render::terminal::{Color, ConsoleFrontend};

pub fn run(
    app: &mut App,
    mode: &str,
    level: Option<&str>,
    context: Option<String>,
    count: Option<usize>,
    seed: Option<u64>,
    use_color: bool,
) -> Result<()> {
    let Some(study) = StudyMode::parse(mode) else {
        bail!("Mode must be one of: kana, hiragana, katakana, kanji, keigo, vocab, survival");
    };
    let level = match study {
        StudyMode::Only(Mode::Kanji) => Some(validate_level(level)?),
        _ => None,
    };

    verify_vocab_hashes(&app.store, &app.paths.data_dir, study, level.as_deref())?;
    let vocab = load_vocab_for_mode(&app.paths.data_dir, study, level.as_deref())
        .context("Failed to load vocab files")?;

    let request = SessionRequest {
        mode: study,
        level,
        context,
        count: count.unwrap_or(app.settings.study.default_count),
        seed: seed.unwrap_or_else(unix_seed),
    };
    log::debug!("Session request: {:?}", request);

    let mut generator = QuestionGenerator::new(&vocab);
    if study == StudyMode::Only(Mode::Keigo) {
        if let Some(provider) = ChatCompletionsProvider::from_settings(&app.settings.enrichment) {
            generator = generator.with_provider(Box::new(provider));
        }
    }

    let stdin = io::stdin();
    let frontend = ConsoleFrontend::new(stdin.lock(), io::stdout(), use_color);
    let mut session = Session::new(&mut app.store, generator, frontend);
    let report = session.run(&request, App::today())?;

    if report.nothing_due() {
        println!("No cards available for review.");
    } else if use_color {
        println!(
            "{}Done:{} {}/{} correct, {} skipped",
            Color::BOLD,
            Color::RESET,
            report.correct,
            report.answered,
            report.skipped
        );
    } else {
        println!("Done: {}/{} correct, {} skipped", report.correct, report.answered, report.skipped);
    }

    Ok(())
}

fn unix_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
