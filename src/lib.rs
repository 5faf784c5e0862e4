//! sentinel-zip: lazy multi-temporal stacks for zipped Sentinel-2 L2A tiles
//!
//! Each archive is one acquisition of one tile. This library turns a set of
//! archives into an ordered list of viewer layers: an eagerly decoded RGB
//! preview, then edge masks and spectral bands as lazy `(T, H, W)` stacks
//! whose shapes are known before any pixel is decoded.
//!
//! ```no_run
//! use sentinel_zip::{get_reader, PathInput, Sequential};
//!
//! let input = PathInput::from_path("/data/T55HBU");
//! if let Some(reader) = get_reader(&input) {
//!     let layers = reader.read(&input)?;
//!     for layer in &layers {
//!         println!("{} {:?} {}", layer.name(), layer.shape(), layer.kind);
//!     }
//!     if let sentinel_zip::LayerData::Lazy(stack) = &layers[3].data {
//!         let volume = stack.compute(&Sequential)?;
//!         println!("{:?}", volume.shape());
//!     }
//! }
//! # Ok::<(), sentinel_zip::SzError>(())
//! ```

pub mod types;
pub mod io;
pub mod core;
pub mod reader;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionKey, ArchiveRef, DType, Plane, SzError, SzResult, Volume
};

pub use crate::io::PathInput;
pub use crate::core::{
    BandSpec, CalibrationRegistry, Deferred, Executor, LayerData, LayerDescriptor,
    LayerKind, LayerMetadata, LazyStack, PreviewSpec, Sequential,
};
#[cfg(feature = "parallel")]
pub use crate::core::RayonExecutor;
pub use reader::{get_reader, get_reader_with, read_layers, Reader, ReaderConfig};
