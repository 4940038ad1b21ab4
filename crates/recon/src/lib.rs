//! `conciliar-recon` — bank statement ↔ ledger reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns classified results.
//! No CLI or process dependencies; [`load`] turns canonical CSV text into
//! typed records for callers that need it.

pub mod amount;
pub mod classify;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod identity;
pub mod load;
pub mod model;
pub mod movement;
pub mod normalize;
pub mod pool;
pub mod similarity;
pub mod summary;
pub mod taxid;

pub use config::{Pipeline, ReconConfig, ThresholdPreset};
pub use engine::run;
pub use error::ReconError;
pub use model::{MatchLevel, ReconInput, ReconResult, ReconciledTransaction};
