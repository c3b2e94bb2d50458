//! Configuration codec and reconciler for draggable portlet dashboards
//!
//! A dashboard is a grid of widgets ("portlets") that users add, remove,
//! reorder, resize and recolor. This crate turns the live grid into a
//! canonical configuration document (a minimal diff against each widget's
//! defaults), compares documents against a baseline, and applies stored
//! documents back onto the grid when the dashboard loads.
//!
//! The crate is synchronous and does no I/O. Persistence and presentation
//! live in the `monitoring-dashboard` crate.
//!
//! # Examples
//!
//! ```
//! use portlet_grid::{codec, DefaultsPolicy, GridLayout, Reconciler, WidgetDefinition, WidgetRegistry};
//!
//! let registry = WidgetRegistry::new(vec![
//!     WidgetDefinition::new("A", 1, 1, "blue"),
//!     WidgetDefinition::new("B", 2, 1, "red"),
//! ]);
//! let mut grid = Reconciler::new(registry, GridLayout::new());
//!
//! let stored = codec::parse_document(r#"[{"id":"A","color":"green"},{"id":"B"}]"#).unwrap();
//! grid.apply(&stored);
//!
//! assert_eq!(grid.current_document(DefaultsPolicy::Omit), stored);
//! ```

#![warn(missing_docs)]

pub mod codec;
mod error;
pub mod layout;
pub mod reconciler;
mod registry;
mod types;

pub use error::{Error, Result};
pub use layout::{GridLayout, LayoutEngine, LayoutEvent, WidgetInstance};
pub use reconciler::Reconciler;
pub use registry::WidgetRegistry;
pub use types::{
    ConfigurationDocument, ConfigurationEntry, DefaultsPolicy, WidgetDefinition, DEFAULT_COLOR,
    DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
