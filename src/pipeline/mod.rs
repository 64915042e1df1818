//! Pipeline Run Chain
//!
//! The stage chain shared by the ingestion and de-identification orchestrators. A service only
//! supplies its [`RunSteps`]; publishing, pool hand-off, failure capture and the terminal event
//! live in [`RunDriver`].

pub mod context;
pub mod driver;

pub use context::{validate_record_count, RunContext, RunOutcome};
pub use driver::{PipelineResources, RunDriver, RunSteps};
