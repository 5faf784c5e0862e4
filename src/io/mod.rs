//! I/O modules for locating archives and decoding their rasters

pub mod archive;
pub mod decode;
pub mod plane;

pub use archive::{classify, resolve_archives, PathInput};
pub use plane::{list_entries, load_plane, read_entry};
