pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod extract;
pub mod intent;
pub mod table;

pub use config::EngineConfig;
pub use engine::{AnswerResult, Provenance, QaEngine};
pub use error::{QaError, Result};
