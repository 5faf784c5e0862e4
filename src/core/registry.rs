//! Band and mask calibration registry
//!
//! Static geometry and display defaults for every plane in a Sentinel-2 L2A
//! (MAJA) tile archive. Scales and offsets are expressed relative to the
//! 10 m reference grid so that a viewer can overlay 10 m, 20 m and preview
//! planes without resampling.

use crate::types::{DType, SzError, SzResult};
use serde::{Deserialize, Serialize};

/// Display colormap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colormap {
    Gray,
    Red,
    Green,
    Blue,
}

impl Colormap {
    pub fn as_str(&self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Red => "red",
            Colormap::Green => "green",
            Colormap::Blue => "blue",
        }
    }
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer blending mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blending {
    Additive,
    Translucent,
}

impl Blending {
    pub fn as_str(&self) -> &'static str {
        match self {
            Blending::Additive => "additive",
            Blending::Translucent => "translucent",
        }
    }
}

impl std::fmt::Display for Blending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colormap and blending derived from a band name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDisplay {
    pub colormap: Colormap,
    pub blending: Blending,
}

impl ChannelDisplay {
    /// Visible-light channels (`B2`, `B3`, `B4`) get their own color and
    /// additive blending so that they compose into true color. Everything else
    /// is gray and translucent.
    pub fn for_band(name: &str) -> Self {
        let colormap = if name.ends_with("B2") {
            Some(Colormap::Blue)
        } else if name.ends_with("B3") {
            Some(Colormap::Green)
        } else if name.ends_with("B4") {
            Some(Colormap::Red)
        } else {
            None
        };

        match colormap {
            Some(colormap) => Self {
                colormap,
                blending: Blending::Additive,
            },
            None => Self {
                colormap: Colormap::Gray,
                blending: Blending::Translucent,
            },
        }
    }
}

/// Whether a plane is a spectral band or a quality mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneKind {
    Band,
    Mask,
}

/// Geometry and display defaults for one band or mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    pub name: String,
    pub kind: PlaneKind,
    /// (rows, cols) of the decoded plane
    pub plane_shape: (usize, usize),
    pub dtype: DType,
    /// (time, y, x) scale relative to the reference grid
    pub scale: (f64, f64, f64),
    /// (y, x) offset in reference-grid pixels
    pub offset: (f64, f64),
    pub colormap: Colormap,
    pub blend_mode: Blending,
    pub contrast_limits: Option<(f64, f64)>,
    pub default_visible: bool,
}

impl BandSpec {
    /// Spectral band on a grid `factor` times coarser than the reference grid
    pub fn band(name: &str, reference: (usize, usize), factor: usize, dtype: DType) -> Self {
        let display = ChannelDisplay::for_band(name);
        Self {
            name: name.to_string(),
            kind: PlaneKind::Band,
            plane_shape: (reference.0 / factor, reference.1 / factor),
            dtype,
            scale: (1.0, factor as f64, factor as f64),
            offset: Self::center_offset(factor as f64),
            colormap: display.colormap,
            blend_mode: display.blending,
            contrast_limits: Some(REFLECTANCE_LIMITS),
            default_visible: false,
        }
    }

    /// Quality mask on a grid `factor` times coarser than the reference grid
    pub fn mask(name: &str, reference: (usize, usize), factor: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: PlaneKind::Mask,
            plane_shape: (reference.0 / factor, reference.1 / factor),
            dtype: DType::U8,
            scale: (1.0, factor as f64, factor as f64),
            offset: Self::center_offset(factor as f64),
            colormap: Colormap::Gray,
            blend_mode: Blending::Translucent,
            contrast_limits: None,
            default_visible: false,
        }
    }

    /// Offset that puts the center of a coarse pixel on the center of the
    /// reference pixels it covers
    fn center_offset(factor: f64) -> (f64, f64) {
        let o = (factor - 1.0) / 2.0;
        (o, o)
    }

    /// Path of this plane inside an archive whose top-level folder is `basename`
    pub fn entry_path(&self, basename: &str) -> String {
        match self.kind {
            PlaneKind::Band => format!("{0}/{0}_{1}.tif", basename, self.name),
            PlaneKind::Mask => format!("{0}/MASKS/{0}_{1}.tif", basename, self.name),
        }
    }
}

/// Geometry of the low-resolution RGB preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSpec {
    pub name: String,
    pub extension: String,
    pub plane_shape: (usize, usize),
    pub scale: (f64, f64, f64),
    pub offset: (f64, f64),
    pub default_visible: bool,
}

impl PreviewSpec {
    pub fn new(name: &str, plane_shape: (usize, usize), reference: (usize, usize)) -> Self {
        let sy = reference.0 as f64 / plane_shape.0 as f64;
        let sx = reference.1 as f64 / plane_shape.1 as f64;
        Self {
            name: name.to_string(),
            extension: "jpg".to_string(),
            plane_shape,
            scale: (1.0, sy, sx),
            offset: ((sy - 1.0) / 2.0, (sx - 1.0) / 2.0),
            default_visible: true,
        }
    }

    pub fn entry_path(&self, basename: &str) -> String {
        format!("{0}/{0}_{1}.{2}", basename, self.name, self.extension)
    }
}

/// Surface reflectance is stored as int16 scaled by 10000
pub const REFLECTANCE_LIMITS: (f64, f64) = (0.0, 10000.0);

/// Reference (10 m) grid of a Sentinel-2 tile
pub const S2_REFERENCE_SHAPE: (usize, usize) = (10980, 10980);

const S2_PREVIEW_SHAPE: (usize, usize) = (1000, 1000);

/// (band suffix, decimation factor relative to 10 m)
const S2_BANDS: [(&str, usize); 10] = [
    ("B11", 2),
    ("B12", 2),
    ("B2", 1),
    ("B3", 1),
    ("B4", 1),
    ("B5", 2),
    ("B6", 2),
    ("B7", 2),
    ("B8", 1),
    ("B8A", 2),
];

/// Flat-surface (FRE) and surface (SRE) reflectance products
const S2_PRODUCTS: [&str; 2] = ["FRE", "SRE"];

/// Immutable table of every plane a reader emits, in presentation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRegistry {
    pub reference_shape: (usize, usize),
    pub preview: PreviewSpec,
    pub masks: Vec<BandSpec>,
    pub bands: Vec<BandSpec>,
}

impl CalibrationRegistry {
    pub fn new(
        reference_shape: (usize, usize),
        preview: PreviewSpec,
        masks: Vec<BandSpec>,
        bands: Vec<BandSpec>,
    ) -> Self {
        Self {
            reference_shape,
            preview,
            masks,
            bands,
        }
    }

    /// Sentinel-2 L2A (MAJA) product layout
    pub fn sentinel2_l2a() -> Self {
        let reference = S2_REFERENCE_SHAPE;
        let masks = vec![
            BandSpec::mask("EDG_R1", reference, 1),
            BandSpec::mask("EDG_R2", reference, 2),
        ];
        let bands = S2_PRODUCTS
            .iter()
            .flat_map(|product| {
                S2_BANDS.iter().map(move |(band, factor)| {
                    BandSpec::band(&format!("{}_{}", product, band), reference, *factor, DType::I16)
                })
            })
            .collect();

        Self::new(
            reference,
            PreviewSpec::new("QKL_ALL", S2_PREVIEW_SHAPE, reference),
            masks,
            bands,
        )
    }

    /// Check that every plane, scaled back up, covers the reference grid
    pub fn validate(&self) -> SzResult<()> {
        let (ref_rows, ref_cols) = self.reference_shape;
        let planes = self
            .masks
            .iter()
            .chain(self.bands.iter())
            .map(|spec| (&spec.name, spec.plane_shape, spec.scale))
            .chain(std::iter::once((&self.preview.name, self.preview.plane_shape, self.preview.scale)));

        for (name, (rows, cols), (_, sy, sx)) in planes {
            let covered = (rows as f64 * sy, cols as f64 * sx);
            if (covered.0 - ref_rows as f64).abs() > 0.5 || (covered.1 - ref_cols as f64).abs() > 0.5 {
                return Err(SzError::Processing(format!(
                    "{} covers {:?} at scale ({}, {}), reference grid is {:?}",
                    name,
                    covered,
                    sy,
                    sx,
                    self.reference_shape
                )));
            }
        }

        log::debug!(
            "Registry consistent with {} x {} reference grid",
            ref_rows,
            ref_cols
        );
        Ok(())
    }

    pub fn band(&self, name: &str) -> Option<&BandSpec> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn mask(&self, name: &str) -> Option<&BandSpec> {
        self.masks.iter().find(|m| m.name == name)
    }
}

impl Default for CalibrationRegistry {
    fn default() -> Self {
        Self::sentinel2_l2a()
    }
}
