//! Lazy stacking engine

pub mod registry;
pub mod lazy;
pub mod stack;
pub mod layers;

// Re-export main types
pub use registry::{BandSpec, Blending, CalibrationRegistry, ChannelDisplay, Colormap, PlaneKind, PreviewSpec};
pub use lazy::{Deferred, Executor, LazyStack, Sequential};
#[cfg(feature = "parallel")]
pub use lazy::RayonExecutor;
pub use stack::{stack_all, stack_band, stack_preview};
pub use layers::{assemble, LayerData, LayerDescriptor, LayerKind, LayerMetadata};
