//! Error types for portlet-grid
//!
//! Only failures that abort an operation are represented here. Stale
//! references inside configuration documents are expected drift and are
//! recovered by dropping the entry (see [`crate::reconciler`]).

use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A widget with this id is already active on the grid
    #[error("Widget already placed on the dashboard: {id}")]
    DuplicateWidget {
        /// The widget id
        id: String,
    },

    /// The registry has no definition for this id
    #[error("Unknown widget: {id}")]
    UnknownWidget {
        /// The widget id
        id: String,
    },

    /// The widget is registered but not active on the grid
    #[error("Widget is not on the dashboard: {id}")]
    NotPlaced {
        /// The widget id
        id: String,
    },

    /// A widget span was zero along one axis
    #[error("Widget {id} cannot span {width}x{height} grid units")]
    InvalidSpan {
        /// The widget id
        id: String,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A stored or supplied document could not be parsed
    #[error("Malformed configuration: {0}")]
    MalformedConfiguration(String),
}

/// Result type alias for portlet-grid operations
pub type Result<T> = std::result::Result<T, Error>;
