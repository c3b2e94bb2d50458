//! Core domain types for portlet-grid
//!
//! This module defines the value types shared by the codec, the registry and
//! the reconciler: WidgetDefinition, ConfigurationEntry, ConfigurationDocument
//! and DefaultsPolicy.

use serde::{Deserialize, Serialize};

/// Width used when a definition does not declare one.
pub const DEFAULT_WIDTH: u32 = 1;

/// Height used when a definition does not declare one.
pub const DEFAULT_HEIGHT: u32 = 1;

/// Color used when a definition does not declare one.
pub const DEFAULT_COLOR: &str = "white";

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// A registered dashboard widget (portlet) and its default presentation.
///
/// Serialized with the same field names as a configuration entry so the
/// server-supplied definition list reads like a document:
/// `{"id": "...", "width": 2, "height": 1, "color": "red", "icon": "...", "link": "...", "default": true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetDefinition {
    /// Unique widget id
    pub id: String,
    /// Width in grid units when the configuration does not override it
    #[serde(rename = "width", default = "default_width")]
    pub default_width: u32,
    /// Height in grid units when the configuration does not override it
    #[serde(rename = "height", default = "default_height")]
    pub default_height: u32,
    /// Color name when the configuration does not override it
    #[serde(rename = "color", default = "default_color")]
    pub default_color: String,
    /// Icon shown in the widget selection control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Link to a detail view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Whether the widget belongs to the derived baseline
    #[serde(rename = "default", default, skip_serializing_if = "is_false")]
    pub in_baseline: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl WidgetDefinition {
    /// Creates a definition with the given defaults and no icon or link.
    pub fn new(id: impl Into<String>, width: u32, height: u32, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_width: width,
            default_height: height,
            default_color: color.into(),
            icon: None,
            link: None,
            in_baseline: false,
        }
    }

    /// Sets the icon url.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the detail view link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Marks the widget as part of the derived baseline.
    pub fn in_baseline(mut self) -> Self {
        self.in_baseline = true;
        self
    }
}

/// One widget in a configuration document.
///
/// Attributes equal to the widget's default are omitted, so an entry is a
/// minimal diff against its definition. Field order is fixed (`id` first),
/// which keeps the serialized form canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    /// Widget id
    pub id: String,
    /// Width override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Color override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ConfigurationEntry {
    /// Creates an entry with no overrides.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: None,
            height: None,
            color: None,
        }
    }

    /// Sets the width override.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the height override.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Sets the color override.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Ordered list of configuration entries.
///
/// Order is the on-screen order of active widgets. Documents are values:
/// they are replaced wholesale, never edited in place by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationDocument {
    entries: Vec<ConfigurationEntry>,
}

impl ConfigurationDocument {
    /// Creates a document from entries in display order.
    pub fn new(entries: Vec<ConfigurationEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entries in display order.
    pub fn entries(&self) -> &[ConfigurationEntry] {
        &self.entries
    }

    /// Consumes the document and returns its entries.
    pub fn into_entries(self) -> Vec<ConfigurationEntry> {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the document names no widget.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, ConfigurationEntry> {
        self.entries.iter()
    }

    /// Widget ids in display order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Finds the first entry for `id`.
    pub fn get(&self, id: &str) -> Option<&ConfigurationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Canonical compact JSON (`[{"id":"A","color":"green"},{"id":"B"}]`).
    ///
    /// Two documents are equal exactly when their canonical JSON is
    /// byte-identical.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).expect("configuration entries always serialize")
    }

    /// Human-readable JSON with a three-space indent, as shown in the panel.
    pub fn to_pretty_json(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut ser)
            .expect("configuration entries always serialize");
        String::from_utf8(buf).expect("serde_json emits UTF-8")
    }
}

impl FromIterator<ConfigurationEntry> for ConfigurationDocument {
    fn from_iter<I: IntoIterator<Item = ConfigurationEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ConfigurationDocument {
    type Item = &'a ConfigurationEntry;
    type IntoIter = std::slice::Iter<'a, ConfigurationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for ConfigurationDocument {
    type Item = ConfigurationEntry;
    type IntoIter = std::vec::IntoIter<ConfigurationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// How `serialize` treats attributes that equal the widget default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultsPolicy {
    /// Omit attributes equal to the default (minimal diff)
    #[default]
    Omit,
    /// Always write width, height and color
    Explicit,
}
