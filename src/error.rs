//! Error types.
//!
//! Every error here is a construction-time or usage-contract violation. None
//! are retried internally; they propagate synchronously to the caller.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by node lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A live node already uses this identifier.
    #[error("id is already in use: {id}")]
    DuplicateIdentifier { id: String },

    /// A root node is already attached to the host surface.
    #[error("root node already created (attempted to attach {id})")]
    RootAlreadyAttached { id: String },

    /// Markup references a child node that was never constructed.
    #[error("placeholder refers to an unknown node (parent: {parent}, missing: {id})")]
    DanglingPlaceholder { parent: String, id: String },

    /// `update_text` was called on a node that was not created with text.
    #[error("node {id} is not a text node; use update() with `text` to convert it")]
    NotATextNode { id: String },

    /// Literal string markup embeds child placeholders.
    #[error(
        "node {id}: markup embedding child placeholders must be a render function, \
         e.g. Props::html_fn(move |_| format!(\"Icon {{icon}}\")), so every \
         render mints fresh children"
    )]
    MixedMarkupChildDeclaration { id: String },

    /// Markup could not be turned into an element.
    #[error("invalid markup: {reason}")]
    InvalidMarkup { reason: String },

    /// A host element handle that does not exist in the document arena.
    #[error("unknown host element")]
    UnknownElement,

    /// Layout computation failed.
    #[error("layout failed: {reason}")]
    Layout { reason: String },
}
