//! High-level API for xgroup.
//!
//! Ties the stages together: parse the input, merge by a [`RegroupConfig`],
//! optionally prune empty elements, and serialize the result. This is the
//! entry point for applications embedding xgroup.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{OutputConfig, RegroupConfig};
pub use error::{SdkError, SdkResult};
pub use pipeline::{RegroupOutput, Regrouper};

// Re-export key types
pub use xgroup_analyze::{KeyCandidate, RepeatSite};
pub use xgroup_merge::{KeyMatch, MergePolicy, MergeReport};
pub use xgroup_tree::{Document, TreeError, WriteOptions};
