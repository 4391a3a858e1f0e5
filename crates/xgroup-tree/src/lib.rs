//! Document model for xgroup.
//!
//! An XML document is held as an arena of [`Element`]s addressed by
//! [`ElementId`]. Children are ordered id lists owned by their parent, and
//! parent links live in a separate back-reference table, so detaching or
//! reparenting an element never involves shared ownership.
//!
//! # Key Types
//!
//! - [`Document`] -- The arena, its root, and the optional XML declaration
//! - [`Element`] -- Tag, optional text, attributes, ordered child ids
//! - [`ElementId`] -- Stable index of an element inside one document
//! - [`WriteOptions`] -- Compact or pretty serialization, declaration header
//!
//! Parsing and serialization are backed by `quick-xml`.

pub mod document;
pub mod error;
pub mod parse;
pub mod prune;
pub mod write;

pub use document::{Ancestors, Declaration, Descendants, Document, Element, ElementId};
pub use error::{TreeError, TreeResult};
pub use prune::prune_empty;
pub use write::WriteOptions;
