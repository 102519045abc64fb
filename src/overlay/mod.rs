//! Frame annotation: detection boxes, labels and the FPS indicator.

mod palette;

use ab_glyph::{FontRef, PxScale};
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::detect::Detection;
use crate::frame::Frame;

pub use palette::{Palette, DEFAULT_PALETTE, FPS_COLOR};

/// Box outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;
/// Gap between the label baseline and the box top.
pub const LABEL_OFFSET: i32 = 8;
/// Label glyph height in pixels.
pub const LABEL_SCALE: f32 = 14.0;
/// Top-left corner of the FPS indicator.
pub const FPS_ORIGIN: (i32, i32) = (10, 10);
pub const FPS_SCALE: f32 = 22.0;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

fn put_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

/// Draw a rectangle outline growing inward from `(x1, y1)-(x2, y2)`.
/// Parts outside the image are clipped.
pub fn draw_rect(
    img: &mut RgbImage,
    (x1, y1, x2, y2): (i32, i32, i32, i32),
    color: Rgb<u8>,
    thickness: u32,
) {
    for t in 0..thickness as i32 {
        let (xx1, yy1, xx2, yy2) = (x1 + t, y1 + t, x2 - t, y2 - t);
        if xx1 > xx2 || yy1 > yy2 {
            break;
        }
        for x in xx1..=xx2 {
            put_clipped(img, x, yy1, color);
            put_clipped(img, x, yy2, color);
        }
        for y in yy1..=yy2 {
            put_clipped(img, xx1, y, color);
            put_clipped(img, xx2, y, color);
        }
    }
}

/// Draws detections and the FPS readout with the class palette and the
/// embedded label font.
#[derive(Clone, Debug)]
pub struct Overlay {
    palette: Palette,
    font: FontRef<'static>,
}

impl Overlay {
    pub fn new(palette: Palette) -> Result<Self> {
        let font = FontRef::try_from_slice(LABEL_FONT)
            .map_err(|e| anyhow!("invalid label font: {}", e))?;
        Ok(Self { palette, font })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Width and height of `text` rendered at `scale` pixels.
    pub fn text_size(&self, text: &str, scale: f32) -> (u32, u32) {
        text_size(PxScale::from(scale), &self.font, text)
    }

    /// Render `text` with its top-left corner at `(x, y)`. Glyphs are
    /// anti-aliased against the existing pixels and clipped at the border.
    pub fn draw_text(
        &self,
        img: &mut RgbImage,
        text: &str,
        (x, y): (i32, i32),
        color: Rgb<u8>,
        scale: f32,
    ) {
        draw_text_mut(img, color, x, y, PxScale::from(scale), &self.font, text);
    }

    /// Where a detection label goes: above the box, or just inside its top
    /// edge when there is no room above.
    fn label_origin(&self, det: &Detection) -> (i32, i32) {
        let (_, text_h) = self.text_size(&det.label(), LABEL_SCALE);
        let above = det.bbox.y1() - LABEL_OFFSET - text_h as i32;
        let y = if above >= 0 {
            above
        } else {
            det.bbox.y1() + BOX_THICKNESS as i32 + 1
        };
        (det.bbox.x1(), y)
    }

    /// Draw every detection's box and `name score` label in its class color.
    pub fn annotate_detections(&self, frame: &mut Frame, detections: &[Detection]) {
        for det in detections {
            let color = self.palette.color_for(i64::from(det.class_id));
            let b = det.bbox;
            let origin = self.label_origin(det);
            let img = frame.image_mut();
            draw_rect(img, (b.x1(), b.y1(), b.x2(), b.y2()), color, BOX_THICKNESS);
            self.draw_text(img, &det.label(), origin, color, LABEL_SCALE);
        }
    }

    /// Overlay `FPS: n.n` in the fixed indicator color.
    pub fn draw_fps(&self, frame: &mut Frame, fps: f64) {
        let text = format!("FPS: {:.1}", fps);
        self.draw_text(frame.image_mut(), &text, FPS_ORIGIN, FPS_COLOR, FPS_SCALE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn overlay() -> Overlay {
        Overlay::new(Palette::default()).expect("embedded font parses")
    }

    #[test]
    fn rect_corners_and_thickness() {
        let mut img = RgbImage::new(40, 40);
        draw_rect(&mut img, (5, 5, 10, 10), RED, 2);
        assert_eq!(img.get_pixel(5, 5), &RED);
        assert_eq!(img.get_pixel(10, 5), &RED);
        assert_eq!(img.get_pixel(5, 10), &RED);
        assert_eq!(img.get_pixel(10, 10), &RED);
        assert_eq!(img.get_pixel(6, 6), &RED);
        assert_eq!(img.get_pixel(7, 7), &BLACK);
    }

    #[test]
    fn rect_outside_image_is_clipped() {
        let mut img = RgbImage::new(10, 10);
        draw_rect(&mut img, (-5, -5, 20, 20), RED, 2);
        draw_rect(&mut img, (50, 50, 60, 60), RED, 2);
        assert!(img.pixels().all(|p| *p == BLACK));

        draw_rect(&mut img, (-5, 2, 5, 8), RED, 1);
        assert_eq!(img.get_pixel(0, 2), &RED);
        assert_eq!(img.get_pixel(5, 5), &RED);
    }

    #[test]
    fn text_stays_inside_its_measured_box() {
        let overlay = overlay();
        let mut img = RgbImage::new(120, 40);
        overlay.draw_text(&mut img, "FPS 12", (4, 4), RED, 16.0);
        let (w, h) = overlay.text_size("FPS 12", 16.0);
        assert!(w > 0 && h > 0);

        let lit: Vec<(u32, u32)> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        assert!(img.pixels().any(|p| p.0[0] > 200));
        // Glyphs hang from the ascent line, so they stay within one em below `y`.
        assert!(lit
            .iter()
            .all(|&(x, y)| x >= 4 && y >= 4 && x <= 4 + w + 1 && y <= 4 + 16 + 1));
        // Anti-aliasing only scales the text color.
        assert!(img.pixels().all(|p| p.0[1] == 0 && p.0[2] == 0));
    }

    #[test]
    fn text_past_the_border_is_clipped() {
        let overlay = overlay();
        let mut img = RgbImage::new(10, 10);
        overlay.draw_text(&mut img, "person 0.90", (-30, -5), RED, 14.0);
        overlay.draw_text(&mut img, "car", (50, 50), RED, 14.0);
        assert_eq!(img.dimensions(), (10, 10));
    }

    #[test]
    fn annotate_uses_class_color() -> anyhow::Result<()> {
        let overlay = overlay();
        let mut frame = Frame::blank(100, 100);
        let det = Detection::new(BoundingBox::new(20, 40, 60, 80)?, 1, "bicycle", 0.75);
        overlay.annotate_detections(&mut frame, &[det]);

        let green = overlay.palette().color_for(1);
        assert_eq!(frame.image().get_pixel(20, 40), &green);
        assert_eq!(frame.image().get_pixel(60, 80), &green);
        // Label sits above the box, drawn in shades of the class color.
        let label_pixels = frame
            .image()
            .enumerate_pixels()
            .filter(|(_, y, p)| *y < 40 && p.0[1] > 0)
            .count();
        assert!(label_pixels > 0);
        assert!(frame
            .image()
            .pixels()
            .all(|p| p.0[0] == 0 && p.0[2] == 0));
        Ok(())
    }

    #[test]
    fn label_moves_inside_box_near_top_edge() -> anyhow::Result<()> {
        let overlay = overlay();
        let det = Detection::new(BoundingBox::new(5, 2, 50, 50)?, 0, "person", 0.9);
        assert_eq!(overlay.label_origin(&det), (5, 5));

        let det = Detection::new(BoundingBox::new(5, 60, 50, 90)?, 0, "person", 0.9);
        let (_, h) = overlay.text_size(&det.label(), LABEL_SCALE);
        assert_eq!(overlay.label_origin(&det), (5, 60 - LABEL_OFFSET - h as i32));
        Ok(())
    }

    #[test]
    fn fps_indicator_is_red() {
        let overlay = overlay();
        let mut frame = Frame::blank(200, 60);
        overlay.draw_fps(&mut frame, 9.87);
        assert!(frame.image().pixels().any(|p| p.0[0] > 200));
        assert!(frame
            .image()
            .pixels()
            .all(|p| p.0[1] == 0 && p.0[2] == 0));
    }
}
