pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod payload;
pub mod service;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::IntakeError;
pub use service::{DocumentUpsertEngine, IntakeOrchestrator};
