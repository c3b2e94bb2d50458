//! Panel presenter: the read-only configuration preview.
//!
//! After every mutation the session hands the presenter the current
//! document and whether it matches the baseline. The presenter keeps a
//! [`PanelView`] with the badges, a description, the pretty-printed JSON and
//! any status message; the CLI prints it, the TUI draws it and `--html`
//! renders it with syntax highlighting. Copying always copies the JSON text
//! that is displayed.

use std::fmt::Write as _;

use portlet_grid::ConfigurationDocument;

use crate::store::StorageVariant;

/// Shown when the layout matches the baseline.
pub const SYNCED_DESCRIPTION: &str =
    "The configuration setting in your Jenkinsfile is up to date with local changes!";

/// Shown when a stored override replaces the baseline.
pub const OVERRIDDEN_DESCRIPTION: &str = "The configuration setting in your Jenkinsfile will be \
     overwritten by your local changes. To save this permanently, copy the json below and replace \
     the configuration in the Jenkinsfile with it.";

/// Where the displayed layout comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBadge {
    /// The baseline declared by the project
    Jenkinsfile,
    /// A local-storage override
    LocalStorage,
    /// A user-property override held by the daemon
    UserProperty,
}

impl SourceBadge {
    /// Badge text.
    pub fn label(self) -> &'static str {
        match self {
            SourceBadge::Jenkinsfile => "Jenkinsfile",
            SourceBadge::LocalStorage => "Local Storage",
            SourceBadge::UserProperty => "User Property",
        }
    }

    fn for_state(synced: bool, variant: StorageVariant) -> Self {
        match (synced, variant) {
            (true, _) => SourceBadge::Jenkinsfile,
            (false, StorageVariant::Local) => SourceBadge::LocalStorage,
            (false, StorageVariant::Remote) => SourceBadge::UserProperty,
        }
    }
}

/// Whether the project declares a baseline layout at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeBadge {
    /// Empty baseline
    Default,
    /// Non-empty baseline
    Custom,
}

impl TypeBadge {
    /// Badge text.
    pub fn label(self) -> &'static str {
        match self {
            TypeBadge::Default => "default",
            TypeBadge::Custom => "custom",
        }
    }
}

/// Transient message under the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    /// Something worked (copy, reset)
    Info(String),
    /// Persisting failed; the preview shows the unsaved layout
    Error(String),
}

/// Everything the panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    /// Source badge
    pub source: SourceBadge,
    /// Type badge
    pub kind: TypeBadge,
    /// `true` if the layout matches the baseline
    pub synced: bool,
    /// Explanation paragraph
    pub description: &'static str,
    /// Pretty JSON (three-space indent) of the displayed document
    pub json: String,
    /// Ids the stored document names that are no longer installed
    pub unavailable: Vec<String>,
    /// Last status message
    pub status: Option<PanelStatus>,
}

impl PanelView {
    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = format!("[{}] [{}]\n{}\n", self.source.label(), self.kind.label(), self.description);
        if !self.unavailable.is_empty() {
            let _ = writeln!(out, "Unavailable portlets: {}", self.unavailable.join(", "));
        }
        out.push('\n');
        out.push_str(&self.json);
        out.push('\n');
        match &self.status {
            Some(PanelStatus::Info(message)) => {
                let _ = writeln!(out, "\n{message}");
            }
            Some(PanelStatus::Error(message)) => {
                let _ = writeln!(out, "\nError: {message}");
            }
            None => {}
        }
        out
    }

    /// HTML fragment with badges, description and highlighted JSON.
    pub fn to_html(&self) -> String {
        let (source_class, type_class) = (
            if self.synced { "badge-success" } else { "badge-danger" },
            match self.kind {
                TypeBadge::Default => "badge-danger",
                TypeBadge::Custom => "badge-success",
            },
        );
        let mut out = String::new();
        let _ = writeln!(
            out,
            "<span id=\"badge-config\" class=\"badge {source_class}\">{}</span>",
            self.source.label()
        );
        let _ = writeln!(
            out,
            "<span id=\"badge-config-type\" class=\"badge {type_class}\">{}</span>",
            self.kind.label()
        );
        let _ = writeln!(out, "<p id=\"config-text\">{}</p>", escape_html(self.description));
        if !self.unavailable.is_empty() {
            let _ = writeln!(
                out,
                "<p class=\"unavailable\">Unavailable portlets: {}</p>",
                escape_html(&self.unavailable.join(", "))
            );
        }
        let _ = writeln!(out, "<pre id=\"config\">{}</pre>", highlight_html(&self.json));
        out
    }
}

/// Error from a clipboard backend.
#[derive(Debug, thiserror::Error)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Destination of the copy action.
pub trait ClipboardSink {
    /// Replaces the clipboard content.
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError(e.to_string()))
    }
}

/// Keeps the panel in step with the grid.
#[derive(Debug, Clone)]
pub struct PanelPresenter {
    variant: StorageVariant,
    view: PanelView,
}

impl PanelPresenter {
    /// Presenter for a store of `variant`. Shows an empty baseline until
    /// the first render.
    pub fn new(variant: StorageVariant) -> Self {
        Self {
            variant,
            view: PanelView {
                source: SourceBadge::Jenkinsfile,
                kind: TypeBadge::Default,
                synced: true,
                description: SYNCED_DESCRIPTION,
                json: ConfigurationDocument::default().to_pretty_json(),
                unavailable: Vec::new(),
                status: None,
            },
        }
    }

    /// Re-renders from the current layout. Clears the status message.
    ///
    /// When `synced`, the baseline is displayed, otherwise `current`.
    pub fn render(
        &mut self,
        current: &ConfigurationDocument,
        baseline: &ConfigurationDocument,
        synced: bool,
        unavailable: &[String],
    ) -> &PanelView {
        let displayed = if synced { baseline } else { current };
        self.view = PanelView {
            source: SourceBadge::for_state(synced, self.variant),
            kind: if baseline.is_empty() {
                TypeBadge::Default
            } else {
                TypeBadge::Custom
            },
            synced,
            description: if synced {
                SYNCED_DESCRIPTION
            } else {
                OVERRIDDEN_DESCRIPTION
            },
            json: displayed.to_pretty_json(),
            unavailable: unavailable.to_vec(),
            status: None,
        };
        &self.view
    }

    /// Current view.
    pub fn view(&self) -> &PanelView {
        &self.view
    }

    /// Shows an error under the preview.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.view.status = Some(PanelStatus::Error(message.into()));
    }

    /// Shows an informational message under the preview.
    pub fn set_info(&mut self, message: impl Into<String>) {
        self.view.status = Some(PanelStatus::Info(message.into()));
    }

    /// Copies the displayed JSON to `sink` and returns it.
    pub fn copy(&mut self, sink: &mut dyn ClipboardSink) -> Result<String, ClipboardError> {
        let text = self.view.json.clone();
        match sink.set_text(&text) {
            Ok(()) => {
                self.set_info("Configuration copied to clipboard");
                Ok(text)
            }
            Err(e) => {
                self.set_error(e.to_string());
                Err(e)
            }
        }
    }
}

/// Lexical class of a JSON fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Object key, including the trailing colon
    Key,
    /// String value
    String,
    /// Number
    Number,
    /// `true` or `false`
    Boolean,
    /// `null`
    Null,
    /// Punctuation and whitespace
    Plain,
}

impl TokenKind {
    /// CSS class used by [`highlight_html`].
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            TokenKind::Key => Some("key"),
            TokenKind::String => Some("string"),
            TokenKind::Number => Some("number"),
            TokenKind::Boolean => Some("boolean"),
            TokenKind::Null => Some("null"),
            TokenKind::Plain => None,
        }
    }
}

/// Splits JSON text into highlighted fragments. Concatenating the fragment
/// texts gives back the input.
pub fn tokenize(json: &str) -> Vec<(TokenKind, &str)> {
    let bytes = json.as_bytes();
    let mut tokens = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let matched = match bytes[i] {
            b'"' => scan_string(bytes, i).map(|end| {
                let key_end = scan_key_suffix(bytes, end);
                if key_end > end {
                    (key_end, TokenKind::Key)
                } else {
                    (end, TokenKind::String)
                }
            }),
            b't' | b'f' | b'n' => scan_keyword(bytes, i),
            b'-' | b'0'..=b'9' => scan_number(bytes, i).map(|end| (end, TokenKind::Number)),
            _ => None,
        };

        match matched {
            Some((end, kind)) => {
                if plain_start < i {
                    tokens.push((TokenKind::Plain, &json[plain_start..i]));
                }
                tokens.push((kind, &json[i..end]));
                i = end;
                plain_start = end;
            }
            None => i += 1,
        }
    }
    if plain_start < bytes.len() {
        tokens.push((TokenKind::Plain, &json[plain_start..]));
    }
    tokens
}

/// Escapes `json` for HTML and wraps tokens in
/// `<span class="key|string|number|boolean|null">`.
pub fn highlight_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    for (kind, text) in tokenize(json) {
        match kind.css_class() {
            Some(class) => {
                let _ = write!(out, "<span class=\"{class}\">{}</span>", escape_html(text));
            }
            None => out.push_str(&escape_html(text)),
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// End of the string literal starting at `start`, or `None` if it is not
/// closed or holds a bad `\u` escape.
fn scan_string(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'"' => return Some(j + 1),
            b'\\' => match bytes.get(j + 1) {
                Some(b'u') => {
                    let hex = bytes.get(j + 2..j + 6)?;
                    if !hex.iter().all(u8::is_ascii_alphanumeric) {
                        return None;
                    }
                    j += 6;
                }
                Some(_) => j += 2,
                None => return None,
            },
            _ => j += 1,
        }
    }
    None
}

/// End of `\s*:` after a string, or `end` itself if there is none.
fn scan_key_suffix(bytes: &[u8], end: usize) -> usize {
    let mut j = end;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if bytes.get(j) == Some(&b':') {
        j + 1
    } else {
        end
    }
}

fn scan_keyword(bytes: &[u8], start: usize) -> Option<(usize, TokenKind)> {
    let is_word = |b: &u8| b.is_ascii_alphanumeric() || *b == b'_';
    if start > 0 && is_word(&bytes[start - 1]) {
        return None;
    }
    let rest = &bytes[start..];
    let (len, kind) = if rest.starts_with(b"true") {
        (4, TokenKind::Boolean)
    } else if rest.starts_with(b"false") {
        (5, TokenKind::Boolean)
    } else if rest.starts_with(b"null") {
        (4, TokenKind::Null)
    } else {
        return None;
    };
    if bytes.get(start + len).is_some_and(is_word) {
        return None;
    }
    Some((start + len, kind))
}

/// `-?\d+(\.\d*)?([eE][+-]?\d+)?`
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let digits_from = |mut j: usize| {
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        j
    };

    let mut j = start;
    if bytes[j] == b'-' {
        j += 1;
    }
    let int_end = digits_from(j);
    if int_end == j {
        return None;
    }
    j = int_end;

    if bytes.get(j) == Some(&b'.') {
        j = digits_from(j + 1);
    }
    if matches!(bytes.get(j), Some(b'e' | b'E')) {
        let mut k = j + 1;
        if matches!(bytes.get(k), Some(b'+' | b'-')) {
            k += 1;
        }
        let exp_end = digits_from(k);
        if exp_end > k {
            j = exp_end;
        }
    }
    Some(j)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portlet_grid::ConfigurationEntry;

    struct RecordingClipboard(Vec<String>);

    impl ClipboardSink for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl ClipboardSink for BrokenClipboard {
        fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError("no display".to_string()))
        }
    }

    fn doc(ids: &[&str]) -> ConfigurationDocument {
        ids.iter().map(|id| ConfigurationEntry::new(*id)).collect()
    }

    #[test]
    fn highlight_matches_panel_markup() {
        let html = highlight_html(r#"{"id": "A&B", "n": -1.5e3, "ok": true, "x": null}"#);
        assert_eq!(
            html,
            "{<span class=\"key\">\"id\":</span> <span class=\"string\">\"A&amp;B\"</span>, \
             <span class=\"key\">\"n\":</span> <span class=\"number\">-1.5e3</span>, \
             <span class=\"key\">\"ok\":</span> <span class=\"boolean\">true</span>, \
             <span class=\"key\">\"x\":</span> <span class=\"null\">null</span>}"
        );
    }

    #[test]
    fn tokens_cover_the_input() {
        let json = doc(&["A", "B"]).to_pretty_json();
        let rebuilt: String = tokenize(&json).iter().map(|(_, text)| *text).collect();
        assert_eq!(rebuilt, json);
    }

    #[test]
    fn keywords_need_word_boundaries() {
        let kinds: Vec<_> = tokenize("nullable truex").iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![TokenKind::Plain]);
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        let tokens = tokenize(r#""a\"b" "é""#);
        assert_eq!(tokens[0], (TokenKind::String, r#""a\"b""#));
        assert_eq!(tokens[2], (TokenKind::String, r#""é""#));
    }

    #[test]
    fn key_absorbs_whitespace_before_colon() {
        let tokens = tokenize("{\"id\"  : 1}");
        assert_eq!(tokens[1], (TokenKind::Key, "\"id\"  :"));
    }

    #[test]
    fn synced_view_shows_baseline() {
        let mut presenter = PanelPresenter::new(StorageVariant::Local);
        let baseline = doc(&["A", "B"]);
        let view = presenter.render(&baseline, &baseline, true, &[]);

        assert_eq!(view.source, SourceBadge::Jenkinsfile);
        assert_eq!(view.kind, TypeBadge::Custom);
        assert_eq!(view.description, SYNCED_DESCRIPTION);
        assert_eq!(view.json, baseline.to_pretty_json());
    }

    #[test]
    fn overridden_view_shows_current_and_variant_badge() {
        let mut local = PanelPresenter::new(StorageVariant::Local);
        let current = doc(&["B"]);
        let view = local.render(&current, &doc(&[]), false, &["Gone".to_string()]);
        assert_eq!(view.source, SourceBadge::LocalStorage);
        assert_eq!(view.kind, TypeBadge::Default);
        assert_eq!(view.description, OVERRIDDEN_DESCRIPTION);
        assert_eq!(view.json, current.to_pretty_json());
        assert!(view.to_text().contains("Unavailable portlets: Gone"));

        let mut remote = PanelPresenter::new(StorageVariant::Remote);
        assert_eq!(
            remote.render(&current, &doc(&["A"]), false, &[]).source,
            SourceBadge::UserProperty
        );
    }

    #[test]
    fn copy_copies_displayed_json() {
        let mut presenter = PanelPresenter::new(StorageVariant::Local);
        let current = doc(&["B", "A"]);
        presenter.render(&current, &doc(&["A", "B"]), false, &[]);

        let mut clipboard = RecordingClipboard(Vec::new());
        let copied = presenter.copy(&mut clipboard).expect("copy");
        assert_eq!(copied, current.to_pretty_json());
        assert_eq!(clipboard.0, vec![current.to_pretty_json()]);
        assert!(matches!(presenter.view().status, Some(PanelStatus::Info(_))));
    }

    #[test]
    fn failed_copy_is_surfaced() {
        let mut presenter = PanelPresenter::new(StorageVariant::Local);
        assert!(presenter.copy(&mut BrokenClipboard).is_err());
        assert_eq!(
            presenter.view().status,
            Some(PanelStatus::Error("clipboard unavailable: no display".to_string()))
        );
    }

    #[test]
    fn render_clears_previous_error() {
        let mut presenter = PanelPresenter::new(StorageVariant::Remote);
        presenter.set_error("daemon unreachable");
        assert!(presenter.view().to_text().contains("Error: daemon unreachable"));
        presenter.render(&doc(&[]), &doc(&[]), true, &[]);
        assert_eq!(presenter.view().status, None);
    }

    #[test]
    fn html_has_badges_and_highlighting() {
        let mut presenter = PanelPresenter::new(StorageVariant::Local);
        presenter.render(&doc(&["A"]), &doc(&[]), false, &[]);
        let html = presenter.view().to_html();
        assert!(html.contains("<span id=\"badge-config\" class=\"badge badge-danger\">Local Storage</span>"));
        assert!(html.contains("<span class=\"key\">\"id\":</span>"));
    }
}
