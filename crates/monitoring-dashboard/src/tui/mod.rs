//! Terminal user interface for `pmd tui`.
//!
//! A grid list with selection beside the configuration panel, built on
//! ratatui and crossterm. Every layout change is persisted through the
//! dashboard session as soon as its key is handled.

pub mod app;
pub mod event;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_utils;
