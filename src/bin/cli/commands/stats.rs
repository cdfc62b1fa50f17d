use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use nihongo_lib::flashcards::Accuracy;

use crate::app::App;
use crate::render::terminal::Color;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let today = App::today();
    let now = Utc::now();

    let total = app.store.count_items().context("Failed to count items")?;
    let due = app.store.count_due(today).context("Failed to count due items")?;
    let week = app.store.accuracy_since(now - Duration::days(7))?;
    let month = app.store.accuracy_since(now - Duration::days(30))?;
    let by_mode = app.store.stats_by_mode(today).context("Failed to load per-mode stats")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "total": total,
                "due": due,
                "accuracy7d": week,
                "accuracy30d": month,
                "byMode": by_mode,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Total cards: {}", total);
            println!("Due cards: {}", due);
            println!("Accuracy (7d): {}", accuracy_line(&week));
            println!("Accuracy (30d): {}", accuracy_line(&month));

            if !by_mode.is_empty() {
                println!();
                if use_color {
                    println!("{}By mode:{}", Color::BOLD, Color::RESET);
                } else {
                    println!("By mode:");
                }
                for row in &by_mode {
                    println!("- {}: total {}, due {}", row.mode, row.total, row.due);
                }
            }
        }
    }

    Ok(())
}

fn accuracy_line(accuracy: &Accuracy) -> String {
    match accuracy.percent() {
        Some(percent) => format!("{}/{} ({}%)", accuracy.correct, accuracy.total, percent),
        None => "no reviews".to_string(),
    }
}
