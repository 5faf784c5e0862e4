//! Codecs for the rasters bundled in a tile archive

use crate::types::{Plane, SzError, SzResult};
use image::ImageFormat;
use ndarray::{Array2, Array3};
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;

/// Decode a single-sample TIFF into a plane of its native dtype
pub fn decode_tiff_plane(entry: &str, bytes: &[u8]) -> SzResult<Plane> {
    let decode_err = |reason: String| SzError::Decode {
        entry: entry.to_string(),
        reason,
    };

    let mut decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|e| decode_err(e.to_string()))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(|e| decode_err(e.to_string()))?;
    let colortype = decoder.colortype().map_err(|e| decode_err(e.to_string()))?;
    if !matches!(colortype, ColorType::Gray(_)) {
        return Err(decode_err(format!("expected a single-sample raster, found {:?}", colortype)));
    }

    let shape = (height as usize, width as usize);
    log::debug!("TIFF {} dimensions: {} x {} ({:?})", entry, height, width, colortype);

    let image = decoder.read_image().map_err(|e| decode_err(e.to_string()))?;
    let plane = match image {
        DecodingResult::U8(data) => Plane::U8(to_array(shape, data).map_err(decode_err)?),
        DecodingResult::U16(data) => Plane::U16(to_array(shape, data).map_err(decode_err)?),
        DecodingResult::I16(data) => Plane::I16(to_array(shape, data).map_err(decode_err)?),
        DecodingResult::F32(data) => Plane::F32(to_array(shape, data).map_err(decode_err)?),
        _ => return Err(decode_err("unsupported sample format".to_string())),
    };

    Ok(plane)
}

/// Decode a JPEG into an `(H, W, 3)` RGB array
pub fn decode_jpeg_rgb(entry: &str, bytes: &[u8]) -> SzResult<Array3<u8>> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| SzError::Decode {
            entry: entry.to_string(),
            reason: e.to_string(),
        })?
        .to_rgb8();

    let (width, height) = image.dimensions();
    log::debug!("JPEG {} dimensions: {} x {}", entry, height, width);

    Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw()).map_err(|e| {
        SzError::Decode {
            entry: entry.to_string(),
            reason: e.to_string(),
        }
    })
}

fn to_array<T>(shape: (usize, usize), data: Vec<T>) -> Result<Array2<T>, String> {
    let expected = shape.0 * shape.1;
    if data.len() != expected {
        return Err(format!(
            "data length mismatch: got {}, expected {} for shape {:?}",
            data.len(),
            expected,
            shape
        ));
    }
    Array2::from_shape_vec(shape, data).map_err(|e| e.to_string())
}
