use std::path::Path;

use anyhow::{Context, Result};

use nihongo_lib::config::{Paths, Settings};
use nihongo_lib::flashcards::ReviewStore;

/// Shared application state for CLI commands
pub struct App {
    pub paths: Paths,
    pub settings: Settings,
    pub store: ReviewStore,
}

impl App {
    /// Resolve paths, load settings and open the review store
    pub fn new(db_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let paths = Paths::resolve(db_path, data_dir).context("Failed to resolve paths")?;

        let settings = match Settings::default_path() {
            Some(path) => Settings::load(&path).context("Failed to load settings")?,
            None => Settings::default(),
        };

        let store = ReviewStore::open(&paths.db_path)
            .with_context(|| format!("Failed to open database at {}", paths.db_path.display()))?;
        log::debug!("Using database {:?}, vocab dir {:?}", paths.db_path, paths.data_dir);

        Ok(Self { paths, settings, store })
    }

    pub fn today() -> chrono::NaiveDate {
        chrono::Local::now().date_naive()
    }
}
