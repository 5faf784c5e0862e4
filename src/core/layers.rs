//! Final assembly of viewer layers
//!
//! Output order is fixed: preview, masks in registry order, bands in registry
//! order. Display defaults come from the registry; only the preview is
//! visible by default.

use crate::core::lazy::LazyStack;
use crate::core::registry::{BandSpec, CalibrationRegistry, PlaneKind};
use ndarray::Array4;
use serde::Serialize;
use std::collections::HashMap;

/// Layer type understood by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Image,
    Labels,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Image => "image",
            LayerKind::Labels => "labels",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display keyword arguments for one layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetadata {
    pub name: String,
    /// One entry per non-channel axis
    pub scale: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colormap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blending: Option<String>,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast_limits: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<bool>,
}

impl LayerMetadata {
    fn new(name: &str, scale: (f64, f64, f64), offset: (f64, f64), visible: bool) -> Self {
        Self {
            name: name.to_string(),
            scale: vec![scale.0, scale.1, scale.2],
            offset: Some(vec![0.0, offset.0, offset.1]),
            colormap: None,
            blending: None,
            visible,
            contrast_limits: None,
            multiscale: None,
            rgb: None,
        }
    }
}

/// Array payload of a layer
#[derive(Debug, Clone)]
pub enum LayerData {
    Lazy(LazyStack),
    Rgb(Array4<u8>),
}

impl LayerData {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            LayerData::Lazy(stack) => stack.shape().to_vec(),
            LayerData::Rgb(array) => array.shape().to_vec(),
        }
    }
}

/// (array, display metadata, kind)
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    pub data: LayerData,
    pub meta: LayerMetadata,
    pub kind: LayerKind,
}

impl LayerDescriptor {
    pub fn shape(&self) -> Vec<usize> {
        self.data.shape()
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

fn preview_layer(registry: &CalibrationRegistry, preview: Array4<u8>) -> LayerDescriptor {
    let spec = &registry.preview;
    let mut meta = LayerMetadata::new(&spec.name, spec.scale, spec.offset, spec.default_visible);
    meta.rgb = Some(true);

    LayerDescriptor {
        data: LayerData::Rgb(preview),
        meta,
        kind: LayerKind::Image,
    }
}

fn plane_layer(spec: &BandSpec, stack: LazyStack) -> LayerDescriptor {
    let mut meta = LayerMetadata::new(&spec.name, spec.scale, spec.offset, spec.default_visible);

    let kind = match spec.kind {
        PlaneKind::Mask => LayerKind::Labels,
        PlaneKind::Band => {
            meta.colormap = Some(spec.colormap.to_string());
            meta.blending = Some(spec.blend_mode.to_string());
            meta.contrast_limits = spec.contrast_limits;
            meta.multiscale = Some(false);
            LayerKind::Image
        }
    };

    LayerDescriptor {
        data: LayerData::Lazy(stack),
        meta,
        kind,
    }
}

/// Compose preview, masks and bands into the ordered layer list.
///
/// Stacks are matched to registry entries by name. Registry entries without a
/// stack are left out, as are stacks the registry does not know.
pub fn assemble(
    registry: &CalibrationRegistry,
    preview: Array4<u8>,
    masks: Vec<LazyStack>,
    bands: Vec<LazyStack>,
) -> Vec<LayerDescriptor> {
    let mut layers = Vec::with_capacity(1 + masks.len() + bands.len());
    layers.push(preview_layer(registry, preview));

    for (specs, stacks) in [(&registry.masks, masks), (&registry.bands, bands)] {
        let mut by_name: HashMap<String, LazyStack> = stacks
            .into_iter()
            .map(|s| (s.name().to_string(), s))
            .collect();

        for spec in specs.iter() {
            if let Some(stack) = by_name.remove(&spec.name) {
                layers.push(plane_layer(spec, stack));
            }
        }

        for name in by_name.keys() {
            log::warn!("Skipping stack {} unknown to the registry", name);
        }
    }

    log::info!("Assembled {} layers", layers.len());
    layers
}
