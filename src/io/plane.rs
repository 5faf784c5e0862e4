//! Deferred extraction of single planes from tile archives
//!
//! Nothing here keeps an archive open. Every evaluation opens the zip fresh,
//! so deferred planes can be evaluated concurrently and repeatedly.

use crate::core::lazy::Deferred;
use crate::io::decode::decode_tiff_plane;
use crate::types::{ArchiveRef, DType, Plane, SzError, SzResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest up-front buffer taken from an entry header (64 MiB)
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;

fn open_archive(archive_path: &Path) -> SzResult<ZipArchive<File>> {
    let file = File::open(archive_path)?;
    ZipArchive::new(file).map_err(|e| SzError::Archive {
        archive: archive_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// List all entry names in an archive
pub fn list_entries(archive_path: &Path) -> SzResult<Vec<String>> {
    let archive = open_archive(archive_path)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Read one archive entry fully into memory
pub fn read_entry(archive_path: &Path, entry: &str) -> SzResult<Vec<u8>> {
    let mut archive = open_archive(archive_path)?;
    let mut file = archive.by_name(entry).map_err(|e| match e {
        ZipError::FileNotFound => SzError::EntryNotFound {
            archive: archive_path.to_path_buf(),
            entry: entry.to_string(),
        },
        other => SzError::Archive {
            archive: archive_path.to_path_buf(),
            reason: format!("Failed to access {}: {}", entry, other),
        },
    })?;

    let declared = file.size();
    let bytes = read_sized(&mut file, declared, MAX_PREALLOC_BYTES)?;
    log::debug!("Read {} bytes from {}", bytes.len(), entry);
    Ok(bytes)
}

/// Drain `reader`, reserving at most `cap` bytes up front.
///
/// `declared` comes from the zip header and is untrusted; the buffer grows
/// past the reservation as needed.
fn read_sized<R: Read>(reader: &mut R, declared: u64, cap: u64) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(declared.min(cap) as usize);
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Open, extract and decode one raster plane
pub fn decode_entry(archive_path: &Path, entry: &str) -> SzResult<Plane> {
    let lower = entry.to_ascii_lowercase();
    if !(lower.ends_with(".tif") || lower.ends_with(".tiff")) {
        return Err(SzError::Decode {
            entry: entry.to_string(),
            reason: "no single-plane codec for this entry type".to_string(),
        });
    }

    let bytes = read_entry(archive_path, entry)?;
    decode_tiff_plane(entry, &bytes)
}

/// Build a deferred plane for `entry` inside `archive`.
///
/// No I/O happens until the returned value is evaluated.
pub fn load_plane(archive: &ArchiveRef, entry: &str, shape: (usize, usize), dtype: DType) -> Deferred {
    let archive_path = archive.path().to_path_buf();
    let entry_name = entry.to_string();
    Deferred::new(entry, shape, dtype, move || decode_entry(&archive_path, &entry_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AcquisitionKey;
    use std::io::{Cursor, Write};
    use tiff::encoder::{colortype, TiffEncoder};
    use zip::write::FileOptions;

    fn write_archive(dir: &Path, entries: &[(&str, Vec<u8>)]) -> ArchiveRef {
        let path = dir.join("SENTINEL2A_20200101-101010-123_L2A_T31TCJ_C_V1-0.zip");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        for (name, bytes) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        ArchiveRef::new(path, AcquisitionKey::new("20200101-101010-123"))
    }

    fn gray16(width: u32, height: u32) -> Vec<u8> {
        let data: Vec<i16> = (0..(width * height) as i16).collect();
        let mut buffer = Cursor::new(Vec::new());
        TiffEncoder::new(&mut buffer)
            .unwrap()
            .write_image::<colortype::GrayI16>(width, height, &data)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_load_plane_roundtrip_and_idempotence() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[("x/x_B2.tif", gray16(5, 3))]);

        let deferred = load_plane(&archive, "x/x_B2.tif", (3, 5), DType::I16);
        let first = deferred.compute().unwrap();
        let second = deferred.compute().unwrap();
        assert_eq!(first.shape(), (3, 5));
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_entry_surfaces_on_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[("x/x_B2.tif", gray16(2, 2))]);

        // construction succeeds even though the entry is absent
        let deferred = load_plane(&archive, "x/x_B3.tif", (2, 2), DType::I16);
        match deferred.compute() {
            Err(SzError::EntryNotFound { entry, .. }) => assert_eq!(entry, "x/x_B3.tif"),
            other => panic!("expected EntryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_shape_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[("x/x_B2.tif", gray16(4, 4))]);

        let deferred = load_plane(&archive, "x/x_B2.tif", (8, 8), DType::I16);
        assert!(matches!(deferred.compute(), Err(SzError::ShapeMismatch { .. })));

        let deferred = load_plane(&archive, "x/x_B2.tif", (4, 4), DType::U8);
        assert!(matches!(deferred.compute(), Err(SzError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_corrupt_entry_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[("x/x_B2.tif", b"garbage".to_vec())]);

        let deferred = load_plane(&archive, "x/x_B2.tif", (4, 4), DType::I16);
        assert!(matches!(deferred.compute(), Err(SzError::Decode { .. })));
    }

    #[test]
    fn test_unreadable_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SENTINEL2A_20200101-101010-123_bad.zip");
        std::fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(list_entries(&path), Err(SzError::Archive { .. })));
        assert!(matches!(list_entries(&dir.path().join("missing.zip")), Err(SzError::Io(_))));
    }

    #[test]
    fn test_read_sized_ignores_declared_size() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        // absurd header size only reserves the cap
        let bytes = read_sized(&mut Cursor::new(payload.clone()), u64::MAX, 64).unwrap();
        assert_eq!(bytes, payload);

        // header smaller than the data still yields everything
        let bytes = read_sized(&mut Cursor::new(payload.clone()), 16, 64).unwrap();
        assert_eq!(bytes.len(), 10_000);
    }

    #[test]
    fn test_read_entry_larger_than_reservation() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let archive = write_archive(dir.path(), &[("x/big.bin", payload.clone())]);

        assert_eq!(read_entry(archive.path(), "x/big.bin").unwrap(), payload);
    }

    #[test]
    fn test_list_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = write_archive(dir.path(), &[("a.tif", vec![1]), ("b/c.tif", vec![2])]);

        let mut names = list_entries(archive.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.tif".to_string(), "b/c.tif".to_string()]);
    }
}
