//! Error types for the document model.

use crate::document::ElementId;

/// Errors raised while parsing, mutating or serializing a document.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The input is not well-formed XML.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// The input bytes are not valid UTF-8.
    #[error("input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The input ended while elements were still open.
    #[error("unexpected end of input: element <{0}> is not closed")]
    UnclosedElement(String),

    /// A second top-level element was found.
    #[error("document has more than one root element (found <{0}>)")]
    MultipleRoots(String),

    /// Non-whitespace text appeared before or after the root element.
    #[error("text outside the root element at byte {0}")]
    TextOutsideRoot(u64),

    /// The input contains no element at all.
    #[error("document has no root element")]
    EmptyDocument,

    /// An id that does not (or no longer) refers to a live element.
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    /// The root element cannot be detached or removed.
    #[error("the root element cannot be detached")]
    RootMutation,

    /// The element already has a parent; detach it first.
    #[error("element {0} is already attached")]
    AlreadyAttached(ElementId),

    /// Attaching would make an element its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },

    /// The element is not a direct child of the given parent.
    #[error("element {child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },

    /// Writing the serialized output failed.
    #[error("serialization error: {0}")]
    Write(String),
}

/// Convenience alias for document results.
pub type TreeResult<T> = Result<T, TreeError>;
