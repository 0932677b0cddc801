pub mod matcher;
pub mod orchestrator;
pub mod upsert;

pub use matcher::{CatalogIndex, MatchMethod, ProjectIndex, UNKNOWN_SUPPLY};
pub use orchestrator::{IntakeOrchestrator, IntakeOutcome, IntakeRequest};
pub use upsert::{DocumentUpsertEngine, UpsertMode, UpsertOutcome};
