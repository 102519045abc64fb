//! Object-detection capability.
//!
//! The frame loop only sees `DetectorBackend`; concrete backends are chosen
//! from configuration by `create_backend`.

mod backend;
mod backends;
mod labels;
pub mod postprocess;
mod result;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

pub use backend::{DetectParams, DetectorBackend};
pub use backends::{ScriptedBackend, StubBackend, SyntheticBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::{ClassNames, COCO_CLASSES};
pub use result::{BoundingBox, Detection};

/// Build the backend named in `settings.backend`.
pub fn create_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let names = match &settings.labels_path {
        Some(path) => ClassNames::from_file(path)?,
        None => ClassNames::coco(),
    };
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        "synthetic" => Ok(Box::new(SyntheticBackend::new(settings.seed, names))),
        "tract" => create_tract(settings, names),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn create_tract(settings: &DetectorSettings, names: ClassNames) -> Result<Box<dyn DetectorBackend>> {
    let path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
    Ok(Box::new(TractBackend::new(path, settings.resolution, names)?))
}

#[cfg(not(feature = "backend-tract"))]
fn create_tract(_settings: &DetectorSettings, _names: ClassNames) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}
