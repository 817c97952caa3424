//! Strata - Layered Generative Art Engine
//!
//! Strata composes a collection of unique images ("editions") from layered
//! trait assets. For each edition it picks one trait per layer with
//! probability proportional to the trait's rarity weight, keeps later layers
//! consistent with attributes established by earlier ones, and rejects any
//! combination (DNA) that was already produced.
//!
//! # Architecture
//!
//! - [`catalog`]: trait elements and layers scanned from disk
//! - [`rules`]: compatibility state and the declarative rule table
//! - [`selector`]: weighted constrained selection and DNA generation
//! - [`dna`]: DNA encoding and the uniqueness tracker
//! - [`engine`]: the edition orchestrator
//! - [`render`], [`metadata`], [`output`]: per-edition artifacts

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dna;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod output;
pub mod render;
pub mod rules;
pub mod selector;

pub use catalog::{BlendMode, Layer, TraitElement};
pub use config::GeneratorConfig;
pub use dna::{DnaStrand, UniquenessTracker};
pub use engine::{Edition, EditionSink, Orchestrator, RunSummary};
pub use error::{Result, StrataError};
pub use rules::{CompatibilityState, RuleTable};
pub use selector::{create_dna, WeightedSelector};
