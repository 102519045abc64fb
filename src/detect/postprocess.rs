//! YOLO output decoding.
//!
//! Two output layouts are understood:
//! - end-to-end (`[1, N, 6]`): `x1, y1, x2, y2, score, class` per row, already
//!   suppressed by the model (YOLOv10 style);
//! - raw (`[1, 4 + C, N]`): `cx, cy, w, h` followed by one score per class,
//!   stored attribute-major (YOLOv8 style). Needs NMS.
//!
//! Coordinates come out in model-input space and are rescaled to the frame.

use std::cmp::Ordering;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectParams;
use crate::detect::labels::ClassNames;
use crate::detect::result::{BoundingBox, Detection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
    EndToEnd { rows: usize },
    Raw { classes: usize, anchors: usize },
}

impl OutputLayout {
    /// Infer the layout from an output tensor shape.
    pub fn from_shape(shape: &[usize]) -> Result<Self> {
        let dims: Vec<usize> = match shape {
            [1, a, b] => vec![*a, *b],
            [a, b] => vec![*a, *b],
            _ => return Err(anyhow!("unsupported detector output shape {:?}", shape)),
        };
        let (a, b) = (dims[0], dims[1]);
        if b == 6 {
            return Ok(OutputLayout::EndToEnd { rows: a });
        }
        if a > 4 {
            return Ok(OutputLayout::Raw {
                classes: a - 4,
                anchors: b,
            });
        }
        Err(anyhow!("unsupported detector output shape {:?}", shape))
    }

    fn len(&self) -> usize {
        match *self {
            OutputLayout::EndToEnd { rows } => rows * 6,
            OutputLayout::Raw { classes, anchors } => (classes + 4) * anchors,
        }
    }
}

/// Maps model-input coordinates back onto the frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameScale {
    pub sx: f32,
    pub sy: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl FrameScale {
    /// Scale for a frame stretched into a `resolution`-sided square input.
    pub fn for_stretch(frame_width: u32, frame_height: u32, resolution: u32) -> Self {
        let res = resolution.max(1) as f32;
        Self {
            sx: frame_width as f32 / res,
            sy: frame_height as f32 / res,
            frame_width,
            frame_height,
        }
    }

    fn to_frame(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> Option<BoundingBox> {
        let max_x = self.frame_width as f32;
        let max_y = self.frame_height as f32;
        let x1 = (x1 * self.sx).clamp(0.0, max_x).round() as i32;
        let y1 = (y1 * self.sy).clamp(0.0, max_y).round() as i32;
        let x2 = (x2 * self.sx).clamp(0.0, max_x).round() as i32;
        let y2 = (y2 * self.sy).clamp(0.0, max_y).round() as i32;
        BoundingBox::new(x1, y1, x2, y2).ok()
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: u32,
}

/// Decode a flat output tensor into frame-space detections.
pub fn decode(
    data: &[f32],
    layout: OutputLayout,
    params: &DetectParams,
    scale: FrameScale,
    names: &ClassNames,
) -> Result<Vec<Detection>> {
    if data.len() < layout.len() {
        return Err(anyhow!(
            "detector output has {} values, layout {:?} needs {}",
            data.len(),
            layout,
            layout.len()
        ));
    }

    let candidates = match layout {
        OutputLayout::EndToEnd { rows } => decode_end_to_end(data, rows, params),
        OutputLayout::Raw { classes, anchors } => {
            let raw = decode_raw(data, classes, anchors, params);
            non_max_suppression(raw, params.iou_threshold)
        }
    };

    Ok(candidates
        .into_iter()
        .filter_map(|c| {
            let bbox = scale.to_frame(c.x1, c.y1, c.x2, c.y2)?;
            Some(Detection::new(bbox, c.class_id, names.name(c.class_id), c.score))
        })
        .collect())
}

fn decode_end_to_end(data: &[f32], rows: usize, params: &DetectParams) -> Vec<Candidate> {
    data.chunks_exact(6)
        .take(rows)
        .filter(|row| row[4].is_finite() && row[4] >= params.confidence_threshold)
        .filter(|row| row[5] >= 0.0)
        .map(|row| Candidate {
            x1: row[0],
            y1: row[1],
            x2: row[2],
            y2: row[3],
            score: row[4],
            class_id: row[5].round() as u32,
        })
        .collect()
}

fn decode_raw(data: &[f32], classes: usize, anchors: usize, params: &DetectParams) -> Vec<Candidate> {
    let at = |attr: usize, anchor: usize| data[attr * anchors + anchor];
    let mut out = Vec::new();
    for anchor in 0..anchors {
        let mut best = (0usize, f32::NEG_INFINITY);
        for class in 0..classes {
            let score = at(4 + class, anchor);
            if score > best.1 {
                best = (class, score);
            }
        }
        if !best.1.is_finite() || best.1 < params.confidence_threshold {
            continue;
        }
        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        out.push(Candidate {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            score: best.1,
            class_id: best.0 as u32,
        });
    }
    out
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy per-class NMS. A box is dropped when it overlaps a kept box of the
/// same class by strictly more than `iou_threshold`.
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(k, &cand) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}
