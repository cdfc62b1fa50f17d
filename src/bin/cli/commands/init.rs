use anyhow::{Context, Result};

use nihongo_lib::flashcards::build_all_items;
use nihongo_lib::vocab::{load_all_vocab, record_vocab_hashes};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &mut App, sync: bool, format: &OutputFormat) -> Result<()> {
    let hashed = record_vocab_hashes(&app.store, &app.paths.data_dir).context("Failed to record vocab hashes")?;

    let summary = if sync {
        let vocab = load_all_vocab(&app.paths.data_dir).context("Failed to load vocab files")?;
        let items = build_all_items(&vocab);
        Some(
            app.store
                .sync_items(&items, App::today())
                .context("Failed to sync review items")?,
        )
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "database": app.paths.db_path.to_string_lossy(),
                "hashedFiles": hashed,
                "inserted": summary.map(|s| s.inserted),
                "removed": summary.map(|s| s.removed),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if let Some(summary) = summary {
                println!(
                    "Synced cards from vocab files ({} added, {} removed).",
                    summary.inserted, summary.removed
                );
            }
            println!("Initialized database at {}", app.paths.db_path.display());
        }
    }

    Ok(())
}
