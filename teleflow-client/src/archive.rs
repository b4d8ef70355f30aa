//! Directory archive packing and extraction
//!
//! Directories travel over the wire as gzip-compressed tar archives with
//! relative entry paths. Extraction is strict: absolute paths, parent
//! traversal, and link entries are rejected outright.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType, Header};

use crate::error::{ClientError, Result};

/// Packs a directory into a tar.gz archive
///
/// Entry paths are relative to `dir` and emitted in sorted order, so two
/// packs of identical trees produce identical archives.
pub fn pack_dir(dir: &Path) -> Result<Vec<u8>> {
    if !dir.is_dir() {
        return Err(ClientError::InvalidRequest(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = BTreeMap::new();
    collect_files(dir, dir, &mut files)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    {
        let mut builder = Builder::new(&mut encoder);
        for (path, bytes) in &files {
            let mut header = Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, Cursor::new(bytes))
                .map_err(|e| ClientError::Archive(e.to_string()))?;
        }
        builder
            .finish()
            .map_err(|e| ClientError::Archive(e.to_string()))?;
    }
    encoder
        .finish()
        .map_err(|e| ClientError::Archive(e.to_string()))
}

/// Extracts a tar.gz archive under `out_dir`
///
/// Creates parent directories as needed. Returns the first unsafe entry as
/// an error without writing anything further.
pub fn unpack_archive(bytes: &[u8], out_dir: &Path) -> Result<()> {
    let reader = GzDecoder::new(Cursor::new(bytes));
    let mut archive = Archive::new(reader);

    let entries = archive
        .entries()
        .map_err(|e| ClientError::Archive(e.to_string()))?;
    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| ClientError::Archive(e.to_string()))?;
        let entry_type = entry.header().entry_type();
        let raw_path = entry
            .path()
            .map_err(|e| ClientError::Archive(e.to_string()))?
            .to_string_lossy()
            .to_string();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            return Err(ClientError::Archive(format!(
                "unsafe archive entry {raw_path}: link entries are not allowed"
            )));
        }
        if entry_type.is_dir() {
            continue;
        }
        if !entry_type.is_file() {
            return Err(ClientError::Archive(format!(
                "unsafe archive entry {raw_path}: unsupported entry type"
            )));
        }

        let relative = normalize_entry_path(&raw_path)?;
        let target = out_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        std::fs::write(&target, contents)?;
    }

    Ok(())
}

/// Normalizes an archive entry path to a safe relative path
///
/// Rejects absolute paths (unix and windows) and `..` segments; collapses
/// empty and `.` segments.
pub(crate) fn normalize_entry_path(path: &str) -> Result<String> {
    let replaced = path.replace('\\', "/");
    if replaced.starts_with('/') || looks_like_windows_absolute(&replaced) {
        return Err(ClientError::Archive(format!(
            "unsafe archive entry {path}: absolute paths are not allowed"
        )));
    }

    let mut parts = Vec::new();
    for segment in replaced.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(ClientError::Archive(format!(
                "unsafe archive entry {path}: path traversal is not allowed"
            )));
        }
        parts.push(segment);
    }

    if parts.is_empty() {
        return Err(ClientError::Archive(
            "empty archive entry paths are not allowed".to_string(),
        ));
    }

    Ok(parts.join("/"))
}

fn looks_like_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut BTreeMap<String, Vec<u8>>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|e| ClientError::Archive(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            files.insert(relative, std::fs::read(&path)?);
        }
        // Symlinks are skipped; they cannot be represented safely.
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_round_trip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("scripts")).unwrap();
        std::fs::write(src.path().join("readme.txt"), b"Welcome!").unwrap();
        std::fs::write(src.path().join("config.json"), br#"{"debug": true}"#).unwrap();
        std::fs::write(src.path().join("scripts/hello.sh"), b"#!/bin/bash\necho hi\n").unwrap();

        let archive = pack_dir(src.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        unpack_archive(&archive, out.path()).unwrap();

        for relative in ["readme.txt", "config.json", "scripts/hello.sh"] {
            assert_eq!(
                std::fs::read(out.path().join(relative)).unwrap(),
                std::fs::read(src.path().join(relative)).unwrap(),
                "mismatch for {relative}"
            );
        }
    }

    #[test]
    fn test_pack_is_deterministic() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("b.txt"), b"b").unwrap();
        std::fs::write(src.path().join("a.txt"), b"a").unwrap();

        assert_eq!(pack_dir(src.path()).unwrap(), pack_dir(src.path()).unwrap());
    }

    #[test]
    fn test_pack_rejects_non_directory() {
        let src = tempfile::tempdir().unwrap();
        let file = src.path().join("just-a-file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            pack_dir(&file).unwrap_err(),
            ClientError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        assert!(normalize_entry_path("../evil.txt").is_err());
        assert!(normalize_entry_path("docs/../../evil.txt").is_err());
    }

    #[test]
    fn test_normalize_rejects_absolute_paths() {
        assert!(normalize_entry_path("/etc/passwd").is_err());
        assert!(normalize_entry_path("C:\\windows\\system32").is_err());
    }

    #[test]
    fn test_normalize_collapses_dot_segments() {
        assert_eq!(
            normalize_entry_path("./docs//note.md").unwrap(),
            "docs/note.md"
        );
        assert!(normalize_entry_path(".").is_err());
    }
}
