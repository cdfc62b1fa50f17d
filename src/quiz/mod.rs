//! Study sessions: planning, question building, verification and the review loop

pub mod enrichment;
pub mod generator;
pub mod models;
pub mod planner;
pub mod session;
pub mod verifier;

pub use enrichment::{ChatCompletionsProvider, EnrichmentError, ExplanationProvider, Pacer};
pub use generator::QuestionGenerator;
pub use models::*;
pub use planner::plan;
pub use session::{Frontend, ReviewOutcome, Session, SessionError, SessionReport, SkipReason, MAX_ATTEMPTS};
pub use verifier::Verifier;
