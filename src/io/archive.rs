//! Locating and ordering Sentinel tile archives

use crate::types::{AcquisitionKey, ArchiveRef, SzError, SzResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Accepted archive file names: `*SENTINEL*_<YYYYMMDD>*.zip`
const ARCHIVE_NAME_PATTERN: &str = r"SENTINEL.*_[0-9]{8}.*\.zip$";

/// Acquisition token: `YYYYMMDD-HHMMSS-mmm`
const ACQUISITION_TOKEN_PATTERN: &str = r"[0-9]{8}-[0-9]{6}-[0-9]{3}";

fn archive_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ARCHIVE_NAME_PATTERN).expect("archive name pattern is valid"))
}

fn acquisition_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ACQUISITION_TOKEN_PATTERN).expect("acquisition token pattern is valid"))
}

/// What a caller handed us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathInput {
    Single(PathBuf),
    List(Vec<PathBuf>),
    Directory(PathBuf),
}

impl PathInput {
    /// Existing directories become [`PathInput::Directory`], anything else [`PathInput::Single`]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.is_dir() {
            PathInput::Directory(path.to_path_buf())
        } else {
            PathInput::Single(path.to_path_buf())
        }
    }
}

impl From<PathBuf> for PathInput {
    fn from(path: PathBuf) -> Self {
        PathInput::from_path(path)
    }
}

impl From<&Path> for PathInput {
    fn from(path: &Path) -> Self {
        PathInput::from_path(path)
    }
}

impl From<&str> for PathInput {
    fn from(path: &str) -> Self {
        PathInput::from_path(path)
    }
}

impl From<Vec<PathBuf>> for PathInput {
    fn from(paths: Vec<PathBuf>) -> Self {
        PathInput::List(paths)
    }
}

impl From<Vec<&str>> for PathInput {
    fn from(paths: Vec<&str>) -> Self {
        PathInput::List(paths.into_iter().map(PathBuf::from).collect())
    }
}

/// Whether a file name follows the Sentinel archive naming convention
pub fn is_sentinel_archive<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .map(|name| archive_name_regex().is_match(name))
        .unwrap_or(false)
}

/// First acquisition token in a file name, if any
pub fn acquisition_key<P: AsRef<Path>>(path: P) -> Option<AcquisitionKey> {
    let name = path.as_ref().file_name()?.to_str()?;
    acquisition_token_regex()
        .find(name)
        .map(|m| AcquisitionKey::new(m.as_str()))
}

/// Decide whether `input` denotes Sentinel archives and list them.
///
/// Returns [`SzError::InputNotApplicable`] when it does not. No archive is opened.
pub fn classify(input: &PathInput) -> SzResult<Vec<PathBuf>> {
    match input {
        PathInput::Single(path) => {
            if is_sentinel_archive(path) {
                Ok(vec![path.clone()])
            } else {
                Err(SzError::InputNotApplicable(format!(
                    "{} is not a Sentinel archive",
                    path.display()
                )))
            }
        }
        PathInput::List(paths) => {
            if paths.is_empty() {
                return Err(SzError::InputNotApplicable("empty path list".to_string()));
            }
            if let Some(bad) = paths.iter().find(|p| !is_sentinel_archive(p)) {
                return Err(SzError::InputNotApplicable(format!(
                    "{} is not a Sentinel archive",
                    bad.display()
                )));
            }
            Ok(paths.clone())
        }
        PathInput::Directory(dir) => {
            let mut archives = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_file() && is_sentinel_archive(&path) {
                    archives.push(path);
                }
            }
            log::debug!("Found {} Sentinel archives in {}", archives.len(), dir.display());

            if archives.is_empty() {
                return Err(SzError::InputNotApplicable(format!(
                    "no Sentinel archives in {}",
                    dir.display()
                )));
            }
            Ok(archives)
        }
    }
}

/// Resolve `input` into archives ordered by acquisition time.
///
/// Archives without an acquisition token are dropped.
pub fn resolve_archives(input: &PathInput) -> SzResult<Vec<ArchiveRef>> {
    let paths = classify(input)?;

    let mut archives: Vec<ArchiveRef> = paths
        .into_iter()
        .filter_map(|path| match acquisition_key(&path) {
            Some(key) => Some(ArchiveRef::new(path, key)),
            None => {
                log::debug!("Skipping {}: no acquisition token", path.display());
                None
            }
        })
        .collect();

    archives.sort();
    archives.dedup_by(|a, b| a.path() == b.path());

    log::info!("Resolved {} acquisitions", archives.len());
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const NAME_A: &str = "SENTINEL2A_20171008-002414-496_L2A_T55HBU_C_V1-0.zip";
    const NAME_B: &str = "SENTINEL2B_20171103-002631-102_L2A_T55HBU_C_V1-0.zip";
    const NAME_C: &str = "SENTINEL2A_20180122-002717-461_L2A_T55HBU_C_V1-0.zip";

    #[test]
    fn test_archive_name_pattern() {
        assert!(is_sentinel_archive(NAME_A));
        assert!(is_sentinel_archive(format!("/data/tiles/{}", NAME_A)));
        assert!(!is_sentinel_archive("fake.zip"));
        assert!(!is_sentinel_archive("fake.file"));
        assert!(!is_sentinel_archive("sentinel2a_20171008-002414-496.zip"));
        assert!(!is_sentinel_archive("SENTINEL2A_2017.zip"));
        assert!(!is_sentinel_archive("SENTINEL2A_20171008-002414-496.tar"));
        // directory part does not count
        assert!(!is_sentinel_archive("/SENTINEL_20171008/fake.zip"));
    }

    #[test]
    fn test_acquisition_key_extraction() {
        let key = acquisition_key(NAME_A).unwrap();
        assert_eq!(key.token, "20171008-002414-496");
        assert!(acquisition_key("SENTINEL2A_20171008_L2A.zip").is_none());
    }

    #[test]
    fn test_list_rejects_partial_matches() {
        let input = PathInput::from(vec![NAME_A, "fake.zip"]);
        assert!(matches!(classify(&input), Err(SzError::InputNotApplicable(_))));

        let input = PathInput::from(vec!["fake.zip", "fake2.zip"]);
        assert!(matches!(classify(&input), Err(SzError::InputNotApplicable(_))));

        let input = PathInput::List(Vec::new());
        assert!(matches!(classify(&input), Err(SzError::InputNotApplicable(_))));
    }

    #[test]
    fn test_list_is_ordered_by_token() {
        let input = PathInput::from(vec![NAME_C, NAME_A, NAME_B]);
        let archives = resolve_archives(&input).unwrap();
        let tokens: Vec<_> = archives.iter().map(|a| a.key().token.as_str()).collect();
        assert_eq!(
            tokens,
            vec!["20171008-002414-496", "20171103-002631-102", "20180122-002717-461"]
        );
    }

    #[test]
    fn test_tokenless_entries_are_dropped() {
        let input = PathInput::from(vec![NAME_B, "SENTINEL2A_20171008_L2A.zip"]);
        let archives = resolve_archives(&input).unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].path(), Path::new(NAME_B));
    }

    #[test]
    fn test_duplicates_collapse() {
        let input = PathInput::from(vec![NAME_A, NAME_A]);
        assert_eq!(resolve_archives(&input).unwrap().len(), 1);
    }

    #[test]
    fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in [NAME_B, NAME_A, "notes.txt", "fake.zip"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("SENTINEL2A_20190101-000000-000_nested.zip")).unwrap();

        let input = PathInput::from_path(dir.path());
        assert!(matches!(input, PathInput::Directory(_)));

        let archives = resolve_archives(&input).unwrap();
        let names: Vec<_> = archives
            .iter()
            .map(|a| a.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![NAME_A.to_string(), NAME_B.to_string()]);
    }

    #[test]
    fn test_directory_without_archives() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fake.zip"), b"").unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();

        let input = PathInput::from_path(dir.path());
        assert!(matches!(classify(&input), Err(SzError::InputNotApplicable(_))));
    }
}
