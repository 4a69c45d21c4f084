//! Tarball creation functionality
//!
//! Builds reproducible npm-compatible tarballs with the package/ prefix.
//! Every entry gets the same metadata, so identical inputs always produce
//! identical bytes.

use flate2::write::GzEncoder;
use flate2::Compression;
use relay_core::error::RelayError;
use tar::{Builder, EntryType, Header};

use super::PACKAGE_ROOT;
use crate::CacheResult;

/// Modification time written into every entry
const FIXED_MTIME: u64 = 0;

/// Permissions written into every entry
const FILE_MODE: u32 = 0o644;

/// One file to place under `package/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Path relative to the package root
    pub path: String,
    pub contents: Vec<u8>,
}

impl ArchiveFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Create a gzipped tarball holding `files` in the given order
pub fn create_tarball(package: &str, files: &[ArchiveFile]) -> CacheResult<Vec<u8>> {
    let gz_encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar_builder = Builder::new(gz_encoder);

    for file in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(file.contents.len() as u64);
        header.set_mode(FILE_MODE);
        header.set_mtime(FIXED_MTIME);
        header.set_uid(0);
        header.set_gid(0);

        let npm_path = format!("{}/{}", PACKAGE_ROOT, file.path);
        tar_builder
            .append_data(&mut header, &npm_path, file.contents.as_slice())
            .map_err(|e| RelayError::archive(package, &format!("Failed to append {}", npm_path), e))?;
    }

    let gz_encoder = tar_builder
        .into_inner()
        .map_err(|e| RelayError::archive(package, "Failed to finish tar archive", e))?;

    gz_encoder
        .finish()
        .map_err(|e| RelayError::archive(package, "Failed to compress tarball", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tar::Archive;

    fn entries(bytes: &[u8]) -> Vec<(String, u64, u32, String)> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = entry.path().unwrap().to_string_lossy().to_string();
                let mtime = entry.header().mtime().unwrap();
                let mode = entry.header().mode().unwrap();
                let mut contents = String::new();
                entry.read_to_string(&mut contents).unwrap();
                (path, mtime, mode, contents)
            })
            .collect()
    }

    #[test]
    fn test_create_tarball_layout() {
        let files = vec![
            ArchiveFile::new("package.json", "{}"),
            ArchiveFile::new("entry/index.js", "export * from \"@std/path\";"),
        ];

        let bytes = create_tarball("@std/path", &files).unwrap();
        let entries = entries(&bytes);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "package/package.json");
        assert_eq!(entries[1].0, "package/entry/index.js");
        assert_eq!(entries[1].3, "export * from \"@std/path\";");
        assert!(entries.iter().all(|(_, mtime, mode, _)| *mtime == 0 && *mode == 0o644));
    }

    #[test]
    fn test_create_tarball_is_reproducible() {
        let files = vec![ArchiveFile::new("package.json", "{\"name\":\"x\"}")];

        let first = create_tarball("x", &files).unwrap();
        let second = create_tarball("x", &files).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_paths_are_supported() {
        let long_name = format!("entry/{}.d.ts", "a".repeat(150));
        let files = vec![ArchiveFile::new(long_name.clone(), "x")];

        let bytes = create_tarball("x", &files).unwrap();
        assert_eq!(entries(&bytes)[0].0, format!("package/{}", long_name));
    }

    #[test]
    fn test_empty_tarball_is_valid() {
        let bytes = create_tarball("x", &[]).unwrap();
        assert!(!bytes.is_empty());
        assert!(entries(&bytes).is_empty());
    }
}
