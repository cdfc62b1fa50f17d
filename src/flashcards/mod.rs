//! Review items and spaced repetition state
//!
//! This module provides:
//! - The item catalog derived from the corpus (stable ids per entry and variant)
//! - The spaced repetition update rule
//! - SQLite persistence for scheduling state and the review log

pub mod algorithm;
pub mod catalog;
pub mod models;
pub mod storage;

pub use algorithm::{advance, format_interval, SrsUpdate};
pub use catalog::{build_all_items, item_id, parse_vocab_key};
pub use models::*;
pub use storage::{ReviewStore, StoreError};
