//! Shared test utilities for TUI testing with ratatui TestBackend.

#![cfg(test)]

use portlet_grid::{
    ConfigurationDocument, ConfigurationEntry, DefaultsPolicy, GridLayout, Reconciler,
    WidgetDefinition, WidgetRegistry,
};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

use crate::presenter::{ClipboardError, ClipboardSink};
use crate::project::ProjectId;
use crate::session::DashboardSession;
use crate::store::{ConfigStore, LocalStore};
use crate::tui::app::App;
use crate::tui::ui::render_dashboard;

/// Creates a Terminal with TestBackend at the specified dimensions.
pub fn test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("failed to create test terminal")
}

/// Extracts all text from a specific row in the buffer as a single String.
pub fn row_text(buffer: &Buffer, row: u16) -> String {
    let area = buffer.area();
    if row >= area.height {
        return String::new();
    }
    (0..area.width)
        .map(|col| {
            buffer
                .cell((col, row))
                .map(|cell| cell.symbol())
                .unwrap_or(" ")
        })
        .collect()
}

/// Checks if a specific row contains the given substring.
pub fn row_contains(buffer: &Buffer, row: u16, text: &str) -> bool {
    row_text(buffer, row).contains(text)
}

/// Finds the first row index that contains the given text.
pub fn find_row_with_text(buffer: &Buffer, text: &str) -> Option<u16> {
    (0..buffer.area().height).find(|&row| row_contains(buffer, row, text))
}

/// Renders the whole dashboard and returns the buffer.
pub fn render_app_to_buffer(app: &App, width: u16, height: u16) -> Buffer {
    let mut terminal = test_terminal(width, height);
    terminal
        .draw(|frame| render_dashboard(frame, app))
        .expect("failed to draw dashboard");
    terminal.backend().buffer().clone()
}

/// Registry `A` (1x1 blue), `B` (2x1 red), `C` (1x2 white) with baseline
/// `A, B`.
pub fn test_session(dir: &tempfile::TempDir) -> DashboardSession {
    let registry = WidgetRegistry::new(vec![
        WidgetDefinition::new("A", 1, 1, "blue"),
        WidgetDefinition::new("B", 2, 1, "red"),
        WidgetDefinition::new("C", 1, 2, "white"),
    ]);
    let baseline =
        ConfigurationDocument::new(vec![ConfigurationEntry::new("A"), ConfigurationEntry::new("B")]);
    let store = LocalStore::new(dir.path().join("local-storage.json"), "tui.monitoring-grid-order");
    DashboardSession::new(
        Reconciler::new(registry, GridLayout::new()),
        ConfigStore::local(store, baseline),
        DefaultsPolicy::Omit,
        ProjectId::from_name("Demo"),
    )
}

/// An [`App`] over an initialized [`test_session`].
pub async fn test_app(dir: &tempfile::TempDir) -> App {
    let mut session = test_session(dir);
    session.init().await;
    App::new(session)
}

/// Clipboard that remembers what was copied.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub text: Option<String>,
    pub fail: bool,
}

impl ClipboardSink for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError("no display".to_string()));
        }
        self.text = Some(text.to_string());
        Ok(())
    }
}
