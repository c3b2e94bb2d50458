//! Project identity and the storage keys derived from it.
//!
//! A project is named either by its display name (`My Project`) or by a
//! dashboard URL path (`/jenkins/job/My%20Project/`), in which case the fourth
//! path segment is the name. Both stores key overrides by the slug: the
//! name lower-cased with spaces replaced by hyphens.

use std::fmt;

/// Suffix of local-storage keys.
pub const LOCAL_KEY_SUFFIX: &str = ".monitoring-grid-order";

/// A resolved project name and its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId {
    name: String,
    slug: String,
}

impl ProjectId {
    /// Project from a display name.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slug: slugify(name),
        }
    }

    /// Project from a dashboard URL path.
    ///
    /// The segment after `/<context>/job/` names the project; it is
    /// percent-decoded. A path without that segment yields an empty name.
    pub fn from_url_path(path: &str) -> Self {
        let segment = path.split('/').nth(3).unwrap_or("");
        Self::from_name(&percent_decode(segment))
    }

    /// Resolves the configured `dashboard.project` value.
    ///
    /// Values starting with `/` are URL paths; empty values fall back to the
    /// current directory name.
    pub fn resolve(configured: &str) -> Self {
        let configured = configured.trim();
        if configured.starts_with('/') {
            return Self::from_url_path(configured);
        }
        if !configured.is_empty() {
            return Self::from_name(configured);
        }
        let name = std::env::current_dir()
            .ok()
            .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();
        Self::from_name(&name)
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased, hyphenated name. Also the remote configuration id.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Key of this project's entry in local storage.
    pub fn local_key(&self) -> String {
        format!("{}{}", self.slug, LOCAL_KEY_SUFFIX)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Decodes `%XX` escapes. Malformed escapes are kept verbatim and invalid
/// UTF-8 is replaced.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
