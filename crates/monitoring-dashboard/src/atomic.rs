//! Atomic JSON file writes shared by the local store and the daemon.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;

/// Writes `value` to `path` with temp-file-then-rename.
///
/// 1. Write to a sibling temp file with a timestamp suffix
/// 2. Fsync it
/// 3. Rename over the target
///
/// A failure before the rename leaves the target untouched.
pub fn write_json_atomic(path: &Path, value: &Value) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, json)?;

    let file = fs::File::open(&temp_path)?;
    file.sync_all()?;

    fs::rename(&temp_path, path).map_err(|e| {
        tracing::warn!("atomic rename of {:?} failed, temp file kept at {:?}: {}", path, temp_path, e);
        e
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S%.6f");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data.json".to_string());
    path.with_file_name(format!("{name}.tmp.{}.{timestamp}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json_and_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("deep/store.json");

        write_json_atomic(&path, &json!({"a": "[]"})).expect("write");

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(written, json!({"a": "[]"}));
        let leftovers: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        write_json_atomic(&path, &json!([1])).expect("first write");
        write_json_atomic(&path, &json!([2])).expect("second write");
        let written: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(written, json!([2]));
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let temp = temp_path_for(Path::new("/data/users/alice.json"));
        assert_eq!(temp.parent(), Some(Path::new("/data/users")));
        assert!(temp
            .file_name()
            .expect("file name")
            .to_string_lossy()
            .starts_with("alice.json.tmp."));
    }
}
