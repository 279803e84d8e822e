use crate::loader::SourceFormat;
use bytes::Bytes;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use table_lens_common::{Result, TableLensError};

/// Raw bytes of an input file plus the extension used as the format hint.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub extension: String,
    pub bytes: Bytes,
}

pub fn read_source(path: &Path) -> Result<SourceFile> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| TableLensError::UnsupportedFormat {
            extension: String::new(),
        })?;
    let file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    let bytes = if len == 0 {
        Bytes::new() // zero-length maps are rejected on some platforms
    } else {
        // SAFETY: the map is copied out before the file handle is dropped
        let mmap: Mmap = unsafe { Mmap::map(&file)? };
        Bytes::copy_from_slice(&mmap)
    };
    Ok(SourceFile {
        path: path.to_path_buf(),
        extension,
        bytes,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePath {
    pub path: PathBuf,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SourceFormat::from_extension(e).is_ok())
}

pub fn scan_directory(base: &Path) -> Result<Vec<SourcePath>> {
    let mut results = Vec::new();
    scan_recursive(base, &mut results)?;
    results.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(results)
}

fn scan_recursive(dir: &Path, out: &mut Vec<SourcePath>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_recursive(&path, out)?;
        } else if is_supported(&path) {
            out.push(SourcePath { path });
        }
    }
    Ok(())
}

/// A single file, a directory (recursive) or a glob pattern.
pub fn resolve_paths(input: &str) -> Result<Vec<SourcePath>> {
    let path = Path::new(input);
    if path.is_file() {
        return Ok(vec![SourcePath {
            path: path.to_path_buf(),
        }]);
    }
    if path.is_dir() {
        return scan_directory(path);
    }
    let entries = glob::glob(input).map_err(|e| TableLensError::Other(format!("bad pattern '{input}': {e}")))?;
    Ok(entries
        .flatten()
        .filter(|p| p.is_file() && is_supported(p))
        .map(|path| SourcePath { path })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bytes_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("Data.CSV");
        std::fs::write(&p, "a,b\n1,2\n").unwrap();
        let src = read_source(&p).unwrap();
        assert_eq!(src.extension, "csv");
        assert_eq!(&src.bytes[..], b"a,b\n1,2\n");
    }

    #[test]
    fn empty_file_reads_as_no_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("empty.csv");
        std::fs::write(&p, "").unwrap();
        assert!(read_source(&p).unwrap().bytes.is_empty());
    }

    #[test]
    fn directory_scan_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("nested/b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.md"), "#").unwrap();
        let found = resolve_paths(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn glob_pattern() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.csv"), "x\n1\n").unwrap();
        std::fs::write(dir.path().join("two.csv"), "x\n2\n").unwrap();
        let pattern = format!("{}/*.csv", dir.path().display());
        assert_eq!(resolve_paths(&pattern).unwrap().len(), 2);
    }
}
