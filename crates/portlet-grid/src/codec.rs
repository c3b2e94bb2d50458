//! Configuration codec
//!
//! Pure conversions between live grid state and configuration documents:
//! minimal-diff serialization, canonical comparison, and parsing of every
//! stored format the dashboard has ever written.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::layout::WidgetInstance;
use crate::registry::WidgetRegistry;
use crate::types::{ConfigurationDocument, ConfigurationEntry, DefaultsPolicy};

/// Stored values may be JSON strings wrapping the real document; older
/// writers encoded twice at most.
const MAX_ENCODING_DEPTH: usize = 2;

/// Derives a configuration document from grid items in visual order.
///
/// Inactive items are skipped. Items whose id the registry does not know are
/// dropped. Under [`DefaultsPolicy::Omit`] an attribute is written only if
/// it differs from the definition's default.
pub fn serialize<'a, I>(
    instances: I,
    registry: &WidgetRegistry,
    policy: DefaultsPolicy,
) -> ConfigurationDocument
where
    I: IntoIterator<Item = &'a WidgetInstance>,
{
    instances
        .into_iter()
        .filter(|instance| instance.active)
        .filter_map(|instance| {
            let Some(def) = registry.get(&instance.id) else {
                log::debug!("Dropping unregistered widget from configuration: {}", instance.id);
                return None;
            };

            let explicit = policy == DefaultsPolicy::Explicit;
            let mut entry = ConfigurationEntry::new(instance.id.clone());
            if explicit || instance.width != def.default_width {
                entry.width = Some(instance.width);
            }
            if explicit || instance.height != def.default_height {
                entry.height = Some(instance.height);
            }
            if explicit || instance.color != def.default_color {
                entry.color = Some(instance.color.clone());
            }
            Some(entry)
        })
        .collect()
}

/// Order-sensitive equality of the canonical serializations.
pub fn diff_equals(a: &ConfigurationDocument, b: &ConfigurationDocument) -> bool {
    a.to_json() == b.to_json()
}

/// Rewrites a document into minimal-diff form.
///
/// Attributes equal to the registered default are removed. Entries for
/// unknown ids are kept unchanged, so a stale baseline still compares as
/// written.
pub fn normalize(document: &ConfigurationDocument, registry: &WidgetRegistry) -> ConfigurationDocument {
    document
        .iter()
        .map(|entry| {
            let Some(def) = registry.get(&entry.id) else {
                return entry.clone();
            };
            ConfigurationEntry {
                id: entry.id.clone(),
                width: entry.width.filter(|w| *w != def.default_width),
                height: entry.height.filter(|h| *h != def.default_height),
                color: entry.color.clone().filter(|c| *c != def.default_color),
            }
        })
        .collect()
}

/// Ids named by `document` that `registry` does not know, in document order.
pub fn unavailable_ids(document: &ConfigurationDocument, registry: &WidgetRegistry) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .ids()
        .filter(|id| !registry.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// The document without entries `registry` does not know.
///
/// Applying the result gives the same grid as applying `document`, so
/// comparisons against a baseline should use this form.
pub fn retain_registered(document: &ConfigurationDocument, registry: &WidgetRegistry) -> ConfigurationDocument {
    document.iter().filter(|entry| registry.contains(&entry.id)).cloned().collect()
}

/// Removes later entries that repeat an id. Returns the cleaned document and
/// the ids that were repeated.
pub fn dedup_document(document: ConfigurationDocument) -> (ConfigurationDocument, Vec<String>) {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut kept = Vec::with_capacity(document.len());

    for entry in document {
        if seen.insert(entry.id.clone()) {
            kept.push(entry);
        } else if !duplicates.contains(&entry.id) {
            duplicates.push(entry.id);
        }
    }

    (ConfigurationDocument::new(kept), duplicates)
}

/// Parses a stored configuration.
///
/// Accepted forms:
/// - `[{"id": "A", "color": "green"}, {"id": "B"}]`
/// - `["A", "B"]` (ids only)
/// - `{"plugins": {"A": {"width": 2, "height": 1, "color": "red"}}}` (key order is display order)
/// - a JSON string containing any of the above
///
/// Comments are stripped first.
///
/// # Errors
///
/// Returns `Error::MalformedConfiguration` for anything else.
pub fn parse_document(text: &str) -> Result<ConfigurationDocument> {
    let stripped = crate::registry::strip_comments(text)?;
    let value: Value = serde_json::from_str(&stripped).map_err(|e| Error::MalformedConfiguration(e.to_string()))?;
    document_from_value(value, 0)
}

/// Like [`parse_document`] for an already parsed value.
///
/// # Errors
///
/// Returns `Error::MalformedConfiguration` if the value is not a document.
pub fn parse_value(value: Value) -> Result<ConfigurationDocument> {
    document_from_value(value, 0)
}

fn document_from_value(value: Value, depth: usize) -> Result<ConfigurationDocument> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(id) => Ok(ConfigurationEntry::new(id)),
                Value::Object(map) => {
                    let id = match map.get("id") {
                        Some(Value::String(id)) => id.clone(),
                        _ => {
                            return Err(Error::MalformedConfiguration(format!(
                                "entry {} has no string id",
                                index
                            )))
                        }
                    };
                    entry_from_map(id, &map)
                }
                other => Err(Error::MalformedConfiguration(format!(
                    "entry {} is not an object or id: {}",
                    index, other
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(ConfigurationDocument::new),
        Value::Object(mut map) => match map.remove("plugins") {
            Some(Value::Object(plugins)) => plugins
                .into_iter()
                .map(|(id, attrs)| match attrs {
                    Value::Object(attrs) => entry_from_map(id, &attrs),
                    Value::Null => Ok(ConfigurationEntry::new(id)),
                    other => Err(Error::MalformedConfiguration(format!(
                        "plugin {} has attributes {}",
                        id, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(ConfigurationDocument::new),
            _ => Err(Error::MalformedConfiguration(
                "expected an array of entries or a \"plugins\" object".to_string(),
            )),
        },
        Value::String(inner) if depth < MAX_ENCODING_DEPTH => {
            let nested: Value = serde_json::from_str(&inner)
                .map_err(|e| Error::MalformedConfiguration(format!("encoded document: {}", e)))?;
            document_from_value(nested, depth + 1)
        }
        other => Err(Error::MalformedConfiguration(format!(
            "unexpected configuration value: {}",
            other
        ))),
    }
}

fn entry_from_map(id: String, map: &Map<String, Value>) -> Result<ConfigurationEntry> {
    let color = match map.get("color") {
        None | Some(Value::Null) => None,
        Some(Value::String(color)) => Some(color.clone()),
        Some(other) => {
            return Err(Error::MalformedConfiguration(format!(
                "{}: color must be a string, got {}",
                id, other
            )))
        }
    };

    Ok(ConfigurationEntry {
        width: dimension(&id, "width", map.get("width"))?,
        height: dimension(&id, "height", map.get("height"))?,
        color,
        id,
    })
}

/// Grid spans are positive integers. Older writers stored pixel ratios, so
/// whole-valued floats are accepted too.
fn dimension(id: &str, field: &str, value: Option<&Value>) -> Result<Option<u32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    let parsed = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0);

    match parsed {
        Some(n) => Ok(Some(n)),
        None => Err(Error::MalformedConfiguration(format!(
            "{}: {} must be a positive integer, got {}",
            id, field, value
        ))),
    }
}
