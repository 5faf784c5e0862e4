//! Per-band time stacks
//!
//! Band and mask stacks are lazy: one deferred plane per archive, shaped from
//! the registry. The RGB preview is small and decoded eagerly.

use crate::core::lazy::LazyStack;
use crate::core::registry::{BandSpec, PreviewSpec};
use crate::io::decode::decode_jpeg_rgb;
use crate::io::plane::{load_plane, read_entry};
use crate::types::{ArchiveRef, DType, SzError, SzResult};
use ndarray::{Array3, Array4, ArrayView3, Axis};

/// Build the lazy `(T, H, W)` stack of one band or mask across `archives`
pub fn stack_band(band: &BandSpec, archives: &[ArchiveRef]) -> SzResult<LazyStack> {
    let frames = archives
        .iter()
        .map(|archive| {
            let entry = band.entry_path(&archive.basename());
            load_plane(archive, &entry, band.plane_shape, band.dtype)
        })
        .collect();

    let stack = LazyStack::stack(band.name.clone(), band.plane_shape, band.dtype, frames)?;
    log::debug!("Stacked {} with shape {:?}", band.name, stack.shape());
    Ok(stack)
}

/// Build lazy stacks for every spec, in order
pub fn stack_all(specs: &[BandSpec], archives: &[ArchiveRef]) -> SzResult<Vec<LazyStack>> {
    specs.iter().map(|spec| stack_band(spec, archives)).collect()
}

/// Decode the RGB preview of every archive into a `(T, H, W, 3)` array
pub fn stack_preview(preview: &PreviewSpec, archives: &[ArchiveRef]) -> SzResult<Array4<u8>> {
    let (rows, cols) = preview.plane_shape;
    log::info!("Decoding {} previews", archives.len());

    let mut frames: Vec<Array3<u8>> = Vec::with_capacity(archives.len());
    for archive in archives {
        let entry = preview.entry_path(&archive.basename());
        let bytes = read_entry(archive.path(), &entry)?;
        let rgb = decode_jpeg_rgb(&entry, &bytes)?;

        let (h, w, _) = rgb.dim();
        if (h, w) != preview.plane_shape {
            return Err(SzError::ShapeMismatch {
                label: entry,
                expected_shape: preview.plane_shape,
                actual_shape: (h, w),
                expected_dtype: DType::U8,
                actual_dtype: DType::U8,
            });
        }
        frames.push(rgb);
    }

    if frames.is_empty() {
        return Ok(Array4::zeros((0, rows, cols, 3)));
    }

    let views: Vec<ArrayView3<'_, u8>> = frames.iter().map(|f| f.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| SzError::Decode {
        entry: preview.name.clone(),
        reason: e.to_string(),
    })
}
