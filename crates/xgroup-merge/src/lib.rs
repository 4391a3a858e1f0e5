//! Group-merge engine for xgroup.
//!
//! Finds sibling elements of one tag that describe the same logical record
//! (same derived key under the same parent) and folds them into a single
//! survivor, migrating the donors' children according to a [`MergePolicy`].
//!
//! # Key Types
//!
//! - [`merge`] / [`MergeOptions`] -- Targeted merge of one tag
//! - [`merge_all`] / [`GenericMergeOptions`] -- Every repeating tag, heuristic keys
//! - [`MergePolicy`] -- `merge-append-all` vs `merge-first-wins`
//! - [`KeyMatch`] / [`GroupKey`] -- Key normalization and grouping identity
//! - [`MergeReport`] -- Counters describing what a merge did

pub mod engine;
pub mod key;
pub mod options;
pub mod report;

pub use engine::{merge, merge_all};
pub use key::{derive_key, GroupKey, KeyMatch};
pub use options::{GenericMergeOptions, MergeOptions, MergePolicy};
pub use report::MergeReport;
