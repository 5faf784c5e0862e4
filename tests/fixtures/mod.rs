//! Builders for small on-disk Sentinel tile archives

#![allow(dead_code)]

use sentinel_zip::core::registry::{BandSpec, CalibrationRegistry, PreviewSpec};
use sentinel_zip::DType;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};
use zip::write::FileOptions;

pub const TOKENS: [&str; 3] = [
    "20171008-002414-496",
    "20171103-002631-102",
    "20180122-002717-461",
];

pub fn archive_name(token: &str) -> String {
    format!("SENTINEL2A_{}_L2A_T55HBU_C_V1-0.zip", token)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 8x8 reference grid with one 10 m and one 20 m plane of each kind
pub fn tiny_registry() -> CalibrationRegistry {
    let reference = (8, 8);
    CalibrationRegistry::new(
        reference,
        PreviewSpec::new("QKL_ALL", (4, 4), reference),
        vec![
            BandSpec::mask("EDG_R1", reference, 1),
            BandSpec::mask("EDG_R2", reference, 2),
        ],
        vec![
            BandSpec::band("FRE_B2", reference, 1, DType::I16),
            BandSpec::band("FRE_B5", reference, 2, DType::I16),
            BandSpec::band("SRE_B4", reference, 1, DType::I16),
        ],
    )
}

pub fn tiff_i16(shape: (usize, usize), value: i16) -> Vec<u8> {
    let data = vec![value; shape.0 * shape.1];
    let mut buffer = Cursor::new(Vec::new());
    TiffEncoder::new(&mut buffer)
        .unwrap()
        .write_image::<colortype::GrayI16>(shape.1 as u32, shape.0 as u32, &data)
        .unwrap();
    buffer.into_inner()
}

pub fn tiff_u8(shape: (usize, usize), value: u8) -> Vec<u8> {
    let data = vec![value; shape.0 * shape.1];
    let mut buffer = Cursor::new(Vec::new());
    TiffEncoder::new(&mut buffer)
        .unwrap()
        .write_image::<colortype::Gray8>(shape.1 as u32, shape.0 as u32, &data)
        .unwrap();
    buffer.into_inner()
}

pub fn jpeg_rgb(shape: (usize, usize)) -> Vec<u8> {
    let raw = vec![200u8; shape.0 * shape.1 * 3];
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode(&raw, shape.1 as u32, shape.0 as u32, image::ColorType::Rgb8)
        .unwrap();
    bytes
}

pub fn write_zip(path: &Path, entries: &[(String, Vec<u8>)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

/// Write a complete archive for `registry`.
///
/// Every band plane is filled with `value_base + band index`, masks with the
/// archive-independent value 1.
pub fn write_archive(dir: &Path, token: &str, registry: &CalibrationRegistry, value_base: i16) -> PathBuf {
    let path = dir.join(archive_name(token));
    let basename = path.file_stem().unwrap().to_string_lossy().into_owned();

    let mut entries = vec![(
        registry.preview.entry_path(&basename),
        jpeg_rgb(registry.preview.plane_shape),
    )];
    for mask in &registry.masks {
        entries.push((mask.entry_path(&basename), tiff_u8(mask.plane_shape, 1)));
    }
    for (i, band) in registry.bands.iter().enumerate() {
        entries.push((
            band.entry_path(&basename),
            tiff_i16(band.plane_shape, value_base + i as i16),
        ));
    }

    write_zip(&path, &entries);
    path
}

/// Write one archive per token into `dir`, band values offset by 100 per token
pub fn write_tile_set(dir: &Path, registry: &CalibrationRegistry, tokens: &[&str]) -> Vec<PathBuf> {
    tokens
        .iter()
        .enumerate()
        .map(|(t, token)| write_archive(dir, token, registry, (t as i16 + 1) * 100))
        .collect()
}
