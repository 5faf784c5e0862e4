//! Reader entry point for viewer integrations
//!
//! [`get_reader`] decides whether a path, list of paths or directory denotes
//! Sentinel tile archives. The returned [`Reader`] turns the same input into
//! the ordered layer list.

use crate::core::layers::{assemble, LayerDescriptor};
use crate::core::registry::CalibrationRegistry;
use crate::core::stack::{stack_all, stack_preview};
use crate::io::archive::{classify, resolve_archives, PathInput};
use crate::types::{SzError, SzResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reader options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Emit edge-mask layers between the preview and the bands
    pub include_masks: bool,
    /// Return zero-length stacks instead of [`SzError::EmptyArchiveSet`]
    /// when no archive carries an acquisition token
    pub allow_empty: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            include_masks: true,
            allow_empty: false,
        }
    }
}

/// Builds layer lists from Sentinel tile archives
#[derive(Debug, Clone)]
pub struct Reader {
    registry: Arc<CalibrationRegistry>,
    config: ReaderConfig,
}

impl Reader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            registry: Arc::new(CalibrationRegistry::default()),
            config,
        }
    }

    pub fn with_registry(mut self, registry: impl Into<Arc<CalibrationRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn registry(&self) -> &CalibrationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Resolve `input` and build the ordered layer list.
    ///
    /// Only the previews are decoded here; band and mask layers stay lazy.
    pub fn read(&self, input: &PathInput) -> SzResult<Vec<LayerDescriptor>> {
        self.registry.validate()?;
        let archives = resolve_archives(input)?;
        if archives.is_empty() && !self.config.allow_empty {
            return Err(SzError::EmptyArchiveSet);
        }

        log::info!(
            "Reading {} acquisitions ({} bands, {} masks)",
            archives.len(),
            self.registry.bands.len(),
            if self.config.include_masks { self.registry.masks.len() } else { 0 }
        );

        let preview = stack_preview(&self.registry.preview, &archives)?;
        let masks = if self.config.include_masks {
            stack_all(&self.registry.masks, &archives)?
        } else {
            Vec::new()
        };
        let bands = stack_all(&self.registry.bands, &archives)?;

        Ok(assemble(&self.registry, preview, masks, bands))
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

/// Return a reader when `input` denotes Sentinel archives, `None` otherwise
pub fn get_reader(input: &PathInput) -> Option<Reader> {
    get_reader_with(input, ReaderConfig::default())
}

/// [`get_reader`] with custom options
pub fn get_reader_with(input: &PathInput, config: ReaderConfig) -> Option<Reader> {
    match classify(input) {
        Ok(_) => Some(Reader::new(config)),
        Err(SzError::InputNotApplicable(reason)) => {
            log::debug!("No reader: {}", reason);
            None
        }
        Err(e) => {
            log::warn!("No reader, failed to inspect input: {}", e);
            None
        }
    }
}

/// Read layers from `input` with the default configuration
pub fn read_layers<P: Into<PathInput>>(input: P) -> SzResult<Vec<LayerDescriptor>> {
    Reader::default().read(&input.into())
}
