//! `provjera-recon`: three-way attendance reconciliation engine.
//!
//! Pure engine crate: receives raw sheets, returns tidy fact sets, the
//! reconciled join and the discrepancy reports as tables.
//! No CLI or file IO dependencies.

pub mod config;
pub mod dates;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod roster;
pub mod summary;
pub mod tables;
pub mod timeclock;
pub mod travel;

pub use config::ReconConfig;
pub use dates::Period;
pub use error::ReconError;
pub use model::{AttendanceValue, DiscrepancyKind, ReconciledRow, SourceKind};
pub use pipeline::{Artifact, OutputRequest, Pipeline, PipelineOutput, Sources};
pub use summary::ReconSummary;
