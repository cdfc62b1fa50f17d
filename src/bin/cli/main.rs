mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nihongo", about = "Spaced repetition drills for Japanese", version)]
struct Cli {
    /// Path to the SQLite database (default: $NIHONGO_DB or the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory holding the vocab JSON files (default: $NIHONGO_DATA or ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and record vocab file hashes
    Init {
        /// Build or update review items from the vocab files
        #[arg(long)]
        sync: bool,
    },

    /// Run a study session
    Study {
        /// Study mode: kana, hiragana, katakana, kanji, keigo, vocab, survival
        mode: String,
        /// Kanji level (N5, N4, N3, N2)
        #[arg(long)]
        level: Option<String>,
        /// Keigo context (email, meeting, ...)
        #[arg(long)]
        context: Option<String>,
        /// Number of questions (default from settings, 30 otherwise)
        #[arg(long)]
        count: Option<usize>,
        /// Seed for question order and choices (default: current UNIX time)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show review statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let mut app = app::App::new(cli.db.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Command::Init { sync } => {
            commands::init::run(&mut app, sync, &cli.format)?;
        }
        Command::Study { mode, level, context, count, seed } => {
            commands::study::run(
                &mut app,
                &mode,
                level.as_deref(),
                context,
                count,
                seed,
                use_color,
            )?;
        }
        Command::Stats => {
            commands::stats::run(&app, &cli.format, use_color)?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
