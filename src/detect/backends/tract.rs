#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::labels::ClassNames;
use crate::detect::postprocess::{self, FrameScale, OutputLayout};
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Tract-based backend for ONNX YOLO models.
///
/// Loads a local model file and runs inference on the frame stretched to a
/// square `resolution` input. Performs no network I/O.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    resolution: u32,
    names: ClassNames,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, resolution: u32, names: ClassNames) -> Result<Self> {
        let model_path = model_path.as_ref();
        if resolution == 0 {
            return Err(anyhow!("model resolution must be greater than zero"));
        }
        let side = resolution as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            resolution,
            names,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.resolution;
        let resized = imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        input.into_tensor()
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, params: &DetectParams) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let layout = OutputLayout::from_shape(view.shape())?;
        let data: Vec<f32> = view.iter().copied().collect();
        let scale = FrameScale::for_stretch(frame.width(), frame.height(), self.resolution);
        postprocess::decode(&data, layout, params, scale, &self.names)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::blank(self.resolution, self.resolution);
        self.detect(&blank, &DetectParams::default()).map(|_| ())
    }
}
