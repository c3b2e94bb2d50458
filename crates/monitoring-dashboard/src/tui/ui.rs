//! Rendering for the TUI.
//!
//! `render_dashboard` composes the header, the grid list, the configuration
//! panel and the footer.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

use crate::presenter::{tokenize, PanelStatus, PanelView, TokenKind, TypeBadge};
use crate::tui::app::{App, Row};

/// Header text displayed at the top of the dashboard.
const HEADER_TEXT: &str = "Portlet Dashboard";

/// Footer text showing available keybindings.
pub const FOOTER_TEXT: &str =
    "[j/k] Select  [J/K] Move  [a] Add  [d] Remove  [+/-] Width  []/[] Height  [c] Color  [y] Copy  [R] Reset  [q] Quit";

/// Version string shown in the header (right-aligned).
const VERSION_TEXT: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Renders the full dashboard.
pub fn render_dashboard(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    frame.render_widget(Paragraph::new(header_line(app, chunks[0].width as usize)), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_grid_list(frame, app, body[0]);
    render_config_panel(frame, app.session.view(), body[1]);

    frame.render_widget(Paragraph::new(footer_line(app)), chunks[2]);
}

fn header_line(app: &App, width: usize) -> Line<'static> {
    let title = format!("{} - {}", HEADER_TEXT, app.session.project().name());
    let padding = width
        .saturating_sub(title.chars().count())
        .saturating_sub(VERSION_TEXT.len());
    Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Cyan)),
        Span::raw(" ".repeat(padding)),
        Span::styled(VERSION_TEXT, Style::default().fg(Color::DarkGray)),
    ])
}

fn footer_line(app: &App) -> Line<'static> {
    match &app.status_message {
        Some((message, expiry)) if Instant::now() < *expiry => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )),
        _ => Line::from(Span::styled(FOOTER_TEXT, Style::default().fg(Color::DarkGray))),
    }
}

/// Terminal color for a widget color name.
pub fn widget_color(name: &str) -> Color {
    match name {
        "white" => Color::White,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "purple" => Color::Magenta,
        _ => Color::Gray,
    }
}

fn render_grid_list(frame: &mut Frame, app: &App, area: Rect) {
    let visible = app.session.visible();
    let items: Vec<ListItem> = app
        .rows()
        .into_iter()
        .map(|row| match row {
            Row::Placed(id) => {
                let Some(widget) = visible.iter().find(|w| w.id == id) else {
                    return ListItem::new(id);
                };
                ListItem::new(Line::from(vec![
                    Span::styled("■ ", Style::default().fg(widget_color(&widget.color))),
                    Span::raw(format!("{:<16}", widget.id)),
                    Span::styled(
                        format!("{}x{} {}", widget.width, widget.height, widget.color),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            }
            Row::Hidden(id) => ListItem::new(Line::from(vec![
                Span::styled("· ", Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{id:<16}"), Style::default().fg(Color::DarkGray)),
                Span::styled("hidden", Style::default().fg(Color::DarkGray)),
            ])),
        })
        .collect();

    let title = format!(" Portlets ({}/{}) ", visible.len(), visible.len() + app.session.selectable().len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(app.selected_index);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_config_panel(frame: &mut Frame, view: &PanelView, area: Rect) {
    let mut lines = vec![badge_line(view), Line::from(view.description)];
    if !view.unavailable.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Unavailable portlets: {}", view.unavailable.join(", ")),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::default());
    lines.extend(highlight_lines(&view.json));
    match &view.status {
        Some(PanelStatus::Info(message)) => {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(message.clone(), Style::default().fg(Color::Green))));
        }
        Some(PanelStatus::Error(message)) => {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                format!("Error: {message}"),
                Style::default().fg(Color::Red),
            )));
        }
        None => {}
    }

    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Configuration "))
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn badge_line(view: &PanelView) -> Line<'static> {
    let badge = |label: &'static str, good: bool| {
        let bg = if good { Color::Green } else { Color::Red };
        Span::styled(format!(" {label} "), Style::default().fg(Color::Black).bg(bg))
    };
    Line::from(vec![
        badge(view.source.label(), view.synced),
        Span::raw(" "),
        badge(view.kind.label(), view.kind == TypeBadge::Custom),
    ])
}

fn token_style(kind: TokenKind) -> Style {
    match kind {
        TokenKind::Key => Style::default().fg(Color::Cyan),
        TokenKind::String => Style::default().fg(Color::Green),
        TokenKind::Number => Style::default().fg(Color::Magenta),
        TokenKind::Boolean => Style::default().fg(Color::Blue),
        TokenKind::Null => Style::default().fg(Color::Red),
        TokenKind::Plain => Style::default(),
    }
}

/// Splits highlighted JSON into terminal lines.
pub fn highlight_lines(json: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    for (kind, text) in tokenize(json) {
        let mut parts = text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                current.push(Span::styled(part.to_string(), token_style(kind)));
            }
            if parts.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::test_utils::{find_row_with_text, render_app_to_buffer, row_contains, test_app};

    #[test]
    fn highlight_lines_keeps_line_structure() {
        let lines = highlight_lines("[\n   {\n      \"id\": \"A\"\n   }\n]");
        assert_eq!(lines.len(), 5);
        let third: String = lines[2].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(third, "      \"id\": \"A\"");
        let key = lines[2]
            .spans
            .iter()
            .find(|s| s.content.contains("\"id\""))
            .expect("key span");
        assert_eq!(key.style.fg, Some(Color::Cyan));
    }

    #[test]
    fn widget_colors_fall_back_to_gray() {
        assert_eq!(widget_color("purple"), Color::Magenta);
        assert_eq!(widget_color("chartreuse"), Color::Gray);
    }

    #[tokio::test]
    async fn dashboard_shows_list_panel_and_footer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = test_app(&dir).await;
        let buffer = render_app_to_buffer(&app, 120, 24);

        assert!(row_contains(&buffer, 0, HEADER_TEXT));
        assert!(find_row_with_text(&buffer, "Portlets (2/3)").is_some());
        assert!(find_row_with_text(&buffer, "hidden").is_some());
        assert!(find_row_with_text(&buffer, " Jenkinsfile ").is_some());
        assert!(find_row_with_text(&buffer, "\"id\": \"A\"").is_some());
        assert!(row_contains(&buffer, 23, "[q] Quit"));
    }

    #[tokio::test]
    async fn status_message_replaces_key_hints() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = test_app(&dir).await;
        app.set_status("Copied configuration");
        let buffer = render_app_to_buffer(&app, 120, 24);
        assert!(row_contains(&buffer, 23, "Copied configuration"));
        assert!(!row_contains(&buffer, 23, "[q] Quit"));
    }
}
