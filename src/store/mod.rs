use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "info.json";

/// Where a post's metadata and media live: `<dst>/<first-2-of-id>/<id>/`.
pub fn post_dir(dst: &Path, post_id: &str) -> PathBuf {
    let shard: String = post_id.chars().take(2).collect();
    dst.join(shard).join(post_id)
}

/// Persist one post record exactly as the API returned it.
pub fn save_post_metadata(dst: &Path, post: &Value) -> Result<PathBuf> {
    let id = post_id_of(post).context("post record has no id")?;
    let dir = post_dir(dst, &id);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = dir.join(METADATA_FILE);
    let json = serde_json::to_string(post).context("failed to serialize post record")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

fn post_id_of(post: &Value) -> Option<String> {
    match &post["id"] {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Every saved `info.json` under `root`, one per post.
pub fn find_metadata_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == METADATA_FILE)
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn saves_into_sharded_layout() {
        let dst = tempdir().unwrap();
        let path = save_post_metadata(dst.path(), &json!({"id": 123456, "type": "text"})).unwrap();

        assert_eq!(path, dst.path().join("12").join("123456").join("info.json"));
        let written = fs::read_to_string(&path).unwrap();
        // Compact form, exact wire content.
        assert_eq!(written, r#"{"id":123456,"type":"text"}"#);
    }

    #[test]
    fn string_ids_shard_the_same_way() {
        let dst = tempdir().unwrap();
        let path = save_post_metadata(dst.path(), &json!({"id": "98765"})).unwrap();
        assert_eq!(path, dst.path().join("98").join("98765").join("info.json"));
    }

    #[test]
    fn record_without_id_is_rejected() {
        let dst = tempdir().unwrap();
        assert!(save_post_metadata(dst.path(), &json!({"type": "text"})).is_err());
    }

    #[test]
    fn finds_every_saved_record() {
        let dst = tempdir().unwrap();
        save_post_metadata(dst.path(), &json!({"id": 123456})).unwrap();
        save_post_metadata(dst.path(), &json!({"id": 789012})).unwrap();
        // Media files next to a record must not be picked up.
        fs::write(dst.path().join("12").join("123456").join("a.jpg"), b"x").unwrap();

        let mut found: Vec<_> = find_metadata_files(dst.path()).collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                dst.path().join("12").join("123456").join("info.json"),
                dst.path().join("78").join("789012").join("info.json"),
            ]
        );
    }
}
