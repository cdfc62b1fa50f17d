//! Corpus file fingerprints recorded in the review store
//!
//! `init` records a SHA-256 per corpus file; `study` refuses to run against files
//! that changed since, because item ids would no longer match the corpus.

use std::path::Path;

use crate::flashcards::ReviewStore;

use super::loader::{compute_sha256, expected_files, required_files, resolve_vocab_path, Result, VocabError};
use super::models::StudyMode;

/// Record the current hash of every corpus file
pub fn record_vocab_hashes(store: &ReviewStore, data_dir: &Path) -> Result<usize> {
    let files = expected_files();
    for filename in &files {
        let path = resolve_vocab_path(data_dir, filename)?;
        let sha = compute_sha256(&path)?;
        store.upsert_vocab_hash(filename, &sha)?;
    }
    log::info!("Recorded hashes for {} vocab files", files.len());
    Ok(files.len())
}

/// Check that the files a session needs are unchanged since the last sync
pub fn verify_vocab_hashes(store: &ReviewStore, data_dir: &Path, study: StudyMode, level: Option<&str>) -> Result<()> {
    for filename in required_files(study, level)? {
        let path = resolve_vocab_path(data_dir, &filename)?;
        let current = compute_sha256(&path)?;
        match store.vocab_hash(&filename)? {
            None => return Err(VocabError::HashesNotInitialized),
            Some(stored) if stored != current => return Err(VocabError::HashMismatch(filename)),
            Some(_) => {}
        }
    }
    Ok(())
}
