//! Application state and main event loop for the TUI.
//!
//! Manages terminal setup/teardown, the panic hook and the render loop.
//! Grid changes go through the [`DashboardSession`], so every key that
//! changes the layout is persisted before the next frame is drawn.

use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::{CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::time::{Duration, Instant};

use crate::presenter::{ClipboardSink, SystemClipboard};
use crate::session::DashboardSession;
use crate::tui::event::{handle_key_event, Action, Event, EventHandler};
use crate::tui::ui::render_dashboard;

/// How long a footer status message stays up.
pub const STATUS_MESSAGE_DURATION: Duration = Duration::from_secs(2);

/// One line of the grid list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// A visible widget
    Placed(String),
    /// A widget that can be added
    Hidden(String),
}

/// TUI state.
pub struct App {
    /// The dashboard being edited.
    pub session: DashboardSession,
    /// Index into [`App::rows`], `None` when the list is empty.
    pub selected_index: Option<usize>,
    /// Footer message and its expiry.
    pub status_message: Option<(String, Instant)>,
    /// Set once `q` was pressed.
    pub should_quit: bool,
}

impl App {
    /// Wraps an initialized session and selects the first row.
    pub fn new(session: DashboardSession) -> Self {
        let mut app = Self {
            session,
            selected_index: None,
            status_message: None,
            should_quit: false,
        };
        app.clamp_selection();
        app
    }

    /// Placed widgets in grid order, then the hidden ones.
    pub fn rows(&self) -> Vec<Row> {
        let placed = self.session.visible().into_iter().map(|w| Row::Placed(w.id.clone()));
        let hidden = self.session.selectable().into_iter().map(|d| Row::Hidden(d.id.clone()));
        placed.chain(hidden).collect()
    }

    /// The row under the cursor.
    pub fn selected_row(&self) -> Option<Row> {
        self.selected_index.and_then(|i| self.rows().into_iter().nth(i))
    }

    /// Moves the cursor down, stopping at the last row.
    pub fn select_next(&mut self) {
        let count = self.rows().len();
        self.selected_index = match self.selected_index {
            _ if count == 0 => None,
            Some(i) => Some((i + 1).min(count - 1)),
            None => Some(0),
        };
    }

    /// Moves the cursor up, stopping at the first row.
    pub fn select_previous(&mut self) {
        let count = self.rows().len();
        self.selected_index = match self.selected_index {
            _ if count == 0 => None,
            Some(i) => Some(i.saturating_sub(1)),
            None => Some(0),
        };
    }

    /// Keeps the cursor on an existing row.
    fn clamp_selection(&mut self) {
        let count = self.rows().len();
        self.selected_index = match self.selected_index {
            _ if count == 0 => None,
            Some(i) => Some(i.min(count - 1)),
            None => Some(0),
        };
    }

    fn select_row(&mut self, row: &Row) {
        if let Some(i) = self.rows().iter().position(|r| r == row) {
            self.selected_index = Some(i);
        }
    }

    /// Shows `message` in the footer for [`STATUS_MESSAGE_DURATION`].
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now() + STATUS_MESSAGE_DURATION));
    }

    /// Clears the status message once it has expired.
    pub fn expire_status_message(&mut self) {
        if let Some((_, expiry)) = &self.status_message {
            if Instant::now() >= *expiry {
                self.status_message = None;
            }
        }
    }

    /// Runs `action` against the session. Failures end up in the footer;
    /// the session has already put them on the panel.
    pub async fn perform(&mut self, action: Action, clipboard: &mut dyn ClipboardSink) {
        let result = match action {
            Action::None => return,
            Action::Quit => {
                self.should_quit = true;
                return;
            }
            Action::Add(id) => self
                .session
                .add(&id, None, None, None)
                .await
                .map(|_| (format!("Added {id}"), Some(Row::Placed(id)))),
            Action::Remove(id) => self
                .session
                .remove(&id)
                .await
                .map(|()| (format!("Removed {id}"), None)),
            Action::Move(id, index) => self
                .session
                .move_to(&id, index)
                .await
                .map(|()| (format!("Moved {id} to {index}"), Some(Row::Placed(id)))),
            Action::Resize(id, width, height) => self
                .session
                .resize(&id, width, height)
                .await
                .map(|()| (format!("Resized {id} to {width}x{height}"), None)),
            Action::Recolor(id, color) => self
                .session
                .recolor(&id, &color)
                .await
                .map(|()| (format!("{id} is now {color}"), None)),
            Action::Reset => self
                .session
                .reset()
                .await
                .map(|()| ("Layout reset to the baseline".to_string(), None)),
            Action::Copy => {
                match self.session.copy(clipboard) {
                    Ok(_) => {
                        tracing::debug!("copied configuration to clipboard");
                        self.set_status("Copied configuration");
                    }
                    Err(e) => {
                        tracing::warn!("failed to copy to clipboard: {}", e);
                        self.set_status(format!("Copy failed: {e}"));
                    }
                }
                return;
            }
        };

        match result {
            Ok((message, select)) => {
                if let Some(row) = select {
                    self.select_row(&row);
                }
                self.set_status(message);
            }
            Err(e) => self.set_status(format!("Error: {e}")),
        }
        self.clamp_selection();
    }

    /// Runs the TUI until `q`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be set up or drawn to.
    pub async fn run(&mut self) -> io::Result<()> {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = restore_terminal();
            original_hook(panic_info);
        }));

        setup_terminal()?;

        let result = self.event_loop().await;

        restore_terminal()?;
        result
    }

    async fn event_loop(&mut self) -> io::Result<()> {
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        let event_handler = EventHandler::new(Duration::from_millis(250));
        let mut reader = EventStream::new();
        let mut clipboard = SystemClipboard;

        terminal.draw(|frame| render_dashboard(frame, self))?;
        loop {
            match event_handler.next(&mut reader).await? {
                Event::Key(key) => {
                    let action = handle_key_event(self, key);
                    self.perform(action, &mut clipboard).await;
                    if self.should_quit {
                        return Ok(());
                    }
                }
                Event::Tick => self.expire_status_message(),
                Event::Resize(_, _) => {}
            }
            terminal.draw(|frame| render_dashboard(frame, self))?;
        }
    }
}

/// Enables raw mode and switches to the alternate screen.
fn setup_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    Ok(())
}

/// Restores the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}
