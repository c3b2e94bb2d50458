//! Event handling for the TUI.
//!
//! Wraps crossterm events and adds a tick variant used to expire status
//! messages.

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::interval;

use crate::tui::app::{App, Row};

/// Smallest and largest span a widget can take along either axis.
pub const SPAN_RANGE: std::ops::RangeInclusive<u32> = 1..=5;

/// Colors the `c` key cycles through.
pub const COLOR_PALETTE: [&str; 6] = ["white", "blue", "green", "yellow", "red", "purple"];

/// Application-level event variants.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// Terminal was resized.
    Resize(u16, u16),
    /// Periodic tick.
    Tick,
}

/// Merges terminal input with periodic ticks.
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    /// Creates a handler ticking every `tick_rate`.
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Waits for the next key, resize or tick.
    pub async fn next(&self, reader: &mut EventStream) -> std::io::Result<Event> {
        let mut tick = interval(self.tick_rate);
        // The first tick completes immediately.
        tick.tick().await;

        loop {
            tokio::select! {
                maybe_event = reader.next() => {
                    match maybe_event {
                        Some(Ok(CrosstermEvent::Key(key))) => return Ok(Event::Key(key)),
                        Some(Ok(CrosstermEvent::Resize(w, h))) => return Ok(Event::Resize(w, h)),
                        Some(Err(e)) => return Err(e),
                        Some(Ok(_)) => continue,
                        None => return Err(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "event stream ended",
                        )),
                    }
                }
                _ = tick.tick() => {
                    return Ok(Event::Tick);
                }
            }
        }
    }
}

/// Grid change requested by a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Leave the TUI.
    Quit,
    /// Place a hidden widget with its defaults.
    Add(String),
    /// Hide a placed widget.
    Remove(String),
    /// Move a placed widget to a new index.
    Move(String, usize),
    /// Change the span of a placed widget.
    Resize(String, u32, u32),
    /// Change the color of a placed widget.
    Recolor(String, String),
    /// Copy the displayed configuration.
    Copy,
    /// Delete the stored override.
    Reset,
}

/// Maps a key to an [`Action`]. Selection keys are applied to `app`
/// directly.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            return Action::None;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            return Action::None;
        }
        KeyCode::Char('a') => {
            // A selected hidden widget wins over the first available one.
            return match app.selected_row() {
                Some(Row::Hidden(id)) => Action::Add(id),
                _ => app
                    .session
                    .selectable()
                    .first()
                    .map(|def| Action::Add(def.id.clone()))
                    .unwrap_or(Action::None),
            };
        }
        KeyCode::Char('y') => return Action::Copy,
        KeyCode::Char('R') => return Action::Reset,
        _ => {}
    }

    let Some(Row::Placed(id)) = app.selected_row() else {
        return Action::None;
    };
    let Some(widget) = app.session.visible().into_iter().find(|w| w.id == id).cloned() else {
        return Action::None;
    };
    let index = app.selected_index.unwrap_or(0);

    match key.code {
        KeyCode::Char('J') => {
            if index + 1 < app.session.visible().len() {
                Action::Move(id, index + 1)
            } else {
                Action::None
            }
        }
        KeyCode::Char('K') => {
            if index > 0 {
                Action::Move(id, index - 1)
            } else {
                Action::None
            }
        }
        KeyCode::Char('d') => Action::Remove(id),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            step_span(id, widget.width, 1, widget.height, 0)
        }
        KeyCode::Char('-') => step_span(id, widget.width, -1, widget.height, 0),
        KeyCode::Char(']') => step_span(id, widget.width, 0, widget.height, 1),
        KeyCode::Char('[') => step_span(id, widget.width, 0, widget.height, -1),
        KeyCode::Char('c') => Action::Recolor(id, next_color(&widget.color).to_string()),
        _ => Action::None,
    }
}

/// Resize action, or `None` if the step would leave [`SPAN_RANGE`].
fn step_span(id: String, width: u32, dw: i32, height: u32, dh: i32) -> Action {
    let step = |value: u32, delta: i32| value.checked_add_signed(delta).filter(|v| SPAN_RANGE.contains(v));
    match (step(width, dw), step(height, dh)) {
        (Some(w), Some(h)) if (w, h) != (width, height) => Action::Resize(id, w, h),
        _ => Action::None,
    }
}

/// Palette color after `current`; unknown colors restart the cycle.
pub fn next_color(current: &str) -> &'static str {
    match COLOR_PALETTE.iter().position(|c| *c == current) {
        Some(i) => COLOR_PALETTE[(i + 1) % COLOR_PALETTE.len()],
        None => COLOR_PALETTE[0],
    }
}
