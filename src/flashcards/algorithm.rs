//! Spaced repetition update
//!
//! A fixed SM-2 style rule on a binary outcome:
//! - correct: interval grows by the ease factor, ease rises by 0.1
//! - incorrect: interval resets to one day, ease drops by 0.2
//!
//! Ease always stays within [1.3, 2.5] and the interval never exceeds
//! [`MAX_INTERVAL`] days.

use chrono::{Days, NaiveDate};

/// Minimum ease factor allowed
pub const MIN_EASE: f64 = 1.3;

/// Maximum ease factor allowed
pub const MAX_EASE: f64 = 2.5;

/// Ease given to a freshly synced item
pub const DEFAULT_EASE: f64 = 2.0;

/// Interval (days) given to a freshly synced item
pub const DEFAULT_INTERVAL: u32 = 1;

/// Longest interval (days) an item can be pushed out to
pub const MAX_INTERVAL: u32 = 36_500;

const EASE_BONUS: f64 = 0.1;
const EASE_PENALTY: f64 = 0.2;

/// New scheduling state after a review
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrsUpdate {
    pub ease: f64,
    pub interval: u32,
    pub due_date: NaiveDate,
}

/// Compute the next scheduling state for an item
///
/// Inputs outside the valid range are clamped rather than rejected.
/// `today` is the caller's local calendar date.
pub fn advance(ease: f64, interval: u32, correct: bool, today: NaiveDate) -> SrsUpdate {
    let ease = if ease.is_nan() { DEFAULT_EASE } else { ease.clamp(MIN_EASE, MAX_EASE) };
    let interval = interval.clamp(1, MAX_INTERVAL);

    let (ease, interval) = if correct {
        let grown = (interval as f64 * ease).round().min(MAX_INTERVAL as f64) as u32;
        ((ease + EASE_BONUS).min(MAX_EASE), grown.max(1))
    } else {
        ((ease - EASE_PENALTY).max(MIN_EASE), 1)
    };

    SrsUpdate {
        ease,
        interval,
        due_date: today
            .checked_add_days(Days::new(interval as u64))
            .unwrap_or(NaiveDate::MAX),
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1 => "1 day".to_string(),
        2..=6 => format!("{} days", days),
        7..=29 => plural(days / 7, "week"),
        30..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}

fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}
