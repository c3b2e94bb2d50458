//! Widget registry
//!
//! The registry is the set of widget definitions known to the dashboard. It
//! is supplied once at start (usually from a JSON definition file that may
//! carry comments) and is the only source of truth for whether an id is
//! valid: documents are checked against it, never the other way round.

use crate::error::{Error, Result};
use crate::types::{ConfigurationDocument, ConfigurationEntry, WidgetDefinition};
use std::collections::HashSet;

/// Ordered, de-duplicated set of widget definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetRegistry {
    definitions: Vec<WidgetDefinition>,
}

impl WidgetRegistry {
    /// Builds a registry, keeping the first definition for each id.
    ///
    /// Later definitions with an already-seen id are logged and dropped.
    pub fn new(definitions: Vec<WidgetDefinition>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(definitions.len());

        for def in definitions {
            if seen.insert(def.id.clone()) {
                kept.push(def);
            } else {
                log::warn!("Dropping duplicate widget definition: {}", def.id);
            }
        }

        Self { definitions: kept }
    }

    /// Parses a JSON array of definitions. Comments are allowed.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedConfiguration` if the text is not a JSON
    /// array of definition objects.
    pub fn from_json(text: &str) -> Result<Self> {
        let stripped = strip_comments(text)?;
        let definitions: Vec<WidgetDefinition> = serde_json::from_str(&stripped)
            .map_err(|e| Error::MalformedConfiguration(format!("widget definitions: {}", e)))?;
        Ok(Self::new(definitions))
    }

    /// Looks up a definition by id.
    pub fn get(&self, id: &str) -> Option<&WidgetDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Registered ids in registry order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.id.as_str())
    }

    /// Iterates over definitions in registry order.
    pub fn iter(&self) -> std::slice::Iter<'_, WidgetDefinition> {
        self.definitions.iter()
    }

    /// Number of registered widgets.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no widget is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The derived baseline: one bare entry per definition flagged as
    /// default, in registry order.
    pub fn default_document(&self) -> ConfigurationDocument {
        self.definitions
            .iter()
            .filter(|d| d.in_baseline)
            .map(|d| ConfigurationEntry::new(d.id.clone()))
            .collect()
    }
}

/// Strips `//` and `/* */` comments from JSON text.
pub(crate) fn strip_comments(text: &str) -> Result<String> {
    let stripped = json_comments::StripComments::new(text.as_bytes());
    let bytes: Vec<u8> = std::io::Read::bytes(stripped)
        .collect::<std::io::Result<Vec<u8>>>()
        .map_err(|e| Error::MalformedConfiguration(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| Error::MalformedConfiguration(format!("Invalid UTF-8: {}", e)))
}
