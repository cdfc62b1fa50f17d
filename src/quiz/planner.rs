//! Picks which items a session reviews, and in what order
//!
//! Due items come first; the remainder is backfilled with the soonest-upcoming
//! ones. Which items are picked comes from SQLite's `RANDOM()` (and an unseeded
//! shuffle for merged kana sessions), so it differs from run to run. The picked
//! items are put in id order and then shuffled with the session seed, so the same
//! set with the same seed always comes out in the same order.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::flashcards::storage::Result;
use crate::flashcards::{ItemSpec, ReviewStore, ScheduledItem, Scope};
use crate::vocab::{Mode, StudyMode};

use super::models::SessionRequest;

/// Ordered items for one session, at most `request.count` long
pub fn plan(store: &ReviewStore, request: &SessionRequest, today: NaiveDate) -> Result<Vec<ItemSpec>> {
    if request.count == 0 {
        return Ok(Vec::new());
    }

    let rows = match request.mode {
        StudyMode::Kana => select_mixed_kana(store, today, request.count)?,
        StudyMode::Only(mode) => {
            let scope = Scope::new(mode, request.level.clone());
            select_scope(store, &scope, today, request.count)?
        }
    };

    let mut items: Vec<ItemSpec> = rows
        .iter()
        .filter_map(|row| {
            let spec = ItemSpec::from_scheduled(row);
            if spec.is_none() {
                log::warn!("Skipping item with malformed id: {}", row.item_id);
            }
            spec
        })
        .collect();

    items.sort_by(|a, b| a.id.cmp(&b.id));
    let mut rng = StdRng::seed_from_u64(request.seed);
    items.shuffle(&mut rng);

    log::info!("Planned {} items for {} (requested {})", items.len(), request.mode, request.count);
    Ok(items)
}

fn select_scope(store: &ReviewStore, scope: &Scope, today: NaiveDate, count: usize) -> Result<Vec<ScheduledItem>> {
    let mut rows = store.select_due(scope, today, count, true)?;
    let remaining = count.saturating_sub(rows.len());
    if remaining > 0 {
        rows.extend(store.select_upcoming(scope, today, remaining, true)?);
    }
    Ok(rows)
}

/// Both scripts drawn independently, then mixed
fn select_mixed_kana(store: &ReviewStore, today: NaiveDate, count: usize) -> Result<Vec<ScheduledItem>> {
    let scopes = [Scope::new(Mode::Hiragana, None), Scope::new(Mode::Katakana, None)];
    let mut rng = rand::thread_rng();

    let mut rows = Vec::new();
    for scope in &scopes {
        rows.extend(store.select_due(scope, today, count, true)?);
    }
    rows.shuffle(&mut rng);
    if rows.len() >= count {
        rows.truncate(count);
        return Ok(rows);
    }

    let remaining = count - rows.len();
    let mut backfill = Vec::new();
    for scope in &scopes {
        backfill.extend(store.select_upcoming(scope, today, remaining, true)?);
    }
    backfill.shuffle(&mut rng);
    rows.extend(backfill.into_iter().take(remaining));
    Ok(rows)
}
