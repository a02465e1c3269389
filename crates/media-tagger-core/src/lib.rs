//! Core functionality for automatic media tagging.
//!
//! This library provides the components of the tagging pipeline:
//! - Library scanning with sidecar metadata records
//! - Image classification and video scene segmentation
//! - Tag normalization, exclusion, and translation
//! - Idempotent commits with a durable completion ledger

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{AnalyzeError, Error, Result};
pub use pipeline::{MediaTagger, PassSummary};
pub use types::*;

// -- Public Modules --
pub mod analyze;
pub mod catalog;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod manifest;
pub mod normalize;
pub mod pipeline;
pub mod types;
