//! Generation Engine
//!
//! The edition orchestrator and the edition-number supply it draws from.

pub mod orchestrator;
pub mod supply;

pub use orchestrator::{
    load_waves, Edition, EditionPhase, EditionSink, Orchestrator, Rejection, RunSettings,
    RunSummary, Wave,
};
pub use supply::EditionSupply;
