//! Analysis stage for xgroup.
//!
//! Answers the questions a caller asks before merging: which tags repeat
//! under a common parent, which child fields could act as a grouping key,
//! and which child tags appear under a given record tag.
//!
//! # Key Types
//!
//! - [`candidate_tags`] / [`RepeatSite`] -- Tag-frequency analysis
//! - [`child_field_names`] / [`KeyCandidate`] -- Key-field derivation
//! - [`child_tags`] -- Child-tag enumeration for selective merges

pub mod frequency;
pub mod keys;

pub use frequency::{candidate_tags, repeat_sites, repeating_child_tags, RepeatSite};
pub use keys::{child_field_names, child_tags, key_candidates, KeyCandidate};
