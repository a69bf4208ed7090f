//! Write-temp-then-rename persistence (spec §5 "Persistence discipline",
//! §9 "Persistence atomicity"): the previous on-disk version is the
//! atomic fallback on crash, so a writer must never observe a partially
//! written file — `rename` within the same filesystem is atomic, a bare
//! `fs::write` is not.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::errors::LatticeMemoryError;

pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), LatticeMemoryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(value)?;

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parent_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        write_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let read: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(read["a"], 1);
    }

    #[test]
    fn write_atomic_overwrites_a_prior_version_in_one_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        write_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_atomic(&path, &serde_json::json!({"v": 2})).unwrap();

        let read: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(read["v"], 2);
    }
}
