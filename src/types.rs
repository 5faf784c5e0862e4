//! Core data types for Sentinel-2 tile stacks

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Pixel data type of a decoded plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    U8,
    U16,
    I16,
    F32,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::U8 => write!(f, "uint8"),
            DType::U16 => write!(f, "uint16"),
            DType::I16 => write!(f, "int16"),
            DType::F32 => write!(f, "float32"),
        }
    }
}

/// One decoded 2-D raster (rows x cols)
#[derive(Debug, Clone, PartialEq)]
pub enum Plane {
    U8(Array2<u8>),
    U16(Array2<u16>),
    I16(Array2<i16>),
    F32(Array2<f32>),
}

impl Plane {
    pub fn dtype(&self) -> DType {
        match self {
            Plane::U8(_) => DType::U8,
            Plane::U16(_) => DType::U16,
            Plane::I16(_) => DType::I16,
            Plane::F32(_) => DType::F32,
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Plane::U8(a) => a.dim(),
            Plane::U16(a) => a.dim(),
            Plane::I16(a) => a.dim(),
            Plane::F32(a) => a.dim(),
        }
    }
}

/// An evaluated time stack (time x rows x cols)
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    U8(Array3<u8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    F32(Array3<f32>),
}

impl Volume {
    pub fn dtype(&self) -> DType {
        match self {
            Volume::U8(_) => DType::U8,
            Volume::U16(_) => DType::U16,
            Volume::I16(_) => DType::I16,
            Volume::F32(_) => DType::F32,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        let (t, h, w) = match self {
            Volume::U8(a) => a.dim(),
            Volume::U16(a) => a.dim(),
            Volume::I16(a) => a.dim(),
            Volume::F32(a) => a.dim(),
        };
        [t, h, w]
    }
}

/// Sortable acquisition timestamp taken from an archive name.
///
/// Ordering uses the raw `YYYYMMDD-HHMMSS-mmm` token, which is fixed-width and
/// therefore chronological under lexicographic comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcquisitionKey {
    pub token: String,
    /// Parsed timestamp, `None` when the token is not a valid calendar date-time
    pub datetime: Option<NaiveDateTime>,
}

impl AcquisitionKey {
    pub fn new(token: &str) -> Self {
        let datetime = Self::parse_token(token);
        if datetime.is_none() {
            log::debug!("Acquisition token '{}' is not a valid date-time", token);
        }
        Self {
            token: token.to_string(),
            datetime,
        }
    }

    fn parse_token(token: &str) -> Option<NaiveDateTime> {
        let mut parts = token.splitn(3, '-');
        let date = NaiveDate::parse_from_str(parts.next()?, "%Y%m%d").ok()?;
        let time = NaiveTime::parse_from_str(parts.next()?, "%H%M%S").ok()?;
        let millis: u32 = parts.next()?.parse().ok()?;
        let time = time.with_nanosecond(millis * 1_000_000)?;
        Some(date.and_time(time))
    }
}

impl PartialOrd for AcquisitionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AcquisitionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token.cmp(&other.token)
    }
}

/// Handle to one source archive plus its acquisition key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveRef {
    path: PathBuf,
    key: AcquisitionKey,
}

impl ArchiveRef {
    pub fn new<P: AsRef<Path>>(path: P, key: AcquisitionKey) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &AcquisitionKey {
        &self.key
    }

    /// File name without the `.zip` extension; also the top-level folder inside the archive
    pub fn basename(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl PartialOrd for ArchiveRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArchiveRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Error types for tile stacking
#[derive(Debug, thiserror::Error)]
pub enum SzError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input is not a Sentinel archive set: {0}")]
    InputNotApplicable(String),

    #[error("Failed to open archive {}: {reason}", archive.display())]
    Archive { archive: PathBuf, reason: String },

    #[error("Entry '{entry}' not found in {}", archive.display())]
    EntryNotFound { archive: PathBuf, entry: String },

    #[error("Failed to decode '{entry}': {reason}")]
    Decode { entry: String, reason: String },

    #[error(
        "Plane '{label}' declared {expected_shape:?} {expected_dtype}, decoded {actual_shape:?} {actual_dtype}"
    )]
    ShapeMismatch {
        label: String,
        expected_shape: (usize, usize),
        actual_shape: (usize, usize),
        expected_dtype: DType,
        actual_dtype: DType,
    },

    #[error("No acquisitions resolved from input")]
    EmptyArchiveSet,

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for tile stacking operations
pub type SzResult<T> = Result<T, SzError>;
