use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Nv12,
    Mjpeg,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Result<Self> {
        match fourcc {
            b"RGB3" => Ok(PixelFormat::Rgb24),
            b"YUYV" => Ok(PixelFormat::Yuyv),
            b"NV12" => Ok(PixelFormat::Nv12),
            b"MJPG" => Ok(PixelFormat::Mjpeg),
            other => Err(anyhow!(
                "unsupported camera pixel format {}",
                String::from_utf8_lossy(other)
            )),
        }
    }
}

/// Convert one device buffer into an RGB frame.
pub(crate) fn to_frame(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Frame> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = plane_len(width, height, 3)?;
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Frame::from_rgb(width, height, pixels[..expected].to_vec())
        }
        PixelFormat::Yuyv => Frame::from_rgb(width, height, yuyv_to_rgb(pixels, width, height)?),
        PixelFormat::Nv12 => Frame::from_rgb(width, height, nv12_to_rgb(pixels, width, height)?),
        PixelFormat::Mjpeg => {
            let image = image::load_from_memory_with_format(pixels, image::ImageFormat::Jpeg)
                .context("decode MJPEG frame")?
                .to_rgb8();
            Ok(Frame::new(image))
        }
    }
}

fn plane_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    let r = y + 1.402_f32 * v;
    let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
    let b = y + 1.772_f32 * u;
    [clamp_to_u8(r), clamp_to_u8(g), clamp_to_u8(b)]
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = plane_len(width, height, 2)?;
    if width % 2 != 0 || pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {} for {}x{}, got {}",
            expected,
            width,
            height,
            pixels.len()
        ));
    }
    let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
    for quad in pixels[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        rgb.extend_from_slice(&yuv_to_rgb(quad[0] as f32, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(quad[2] as f32, u, v));
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = plane_len(width, height, 1)?;
    let expected = y_plane
        .checked_add(y_plane / 2)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "NV12 frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;
            let offset = (j * w + i) * 3;
            rgb[offset..offset + 3].copy_from_slice(&yuv_to_rgb(pixels[j * w + i] as f32, u, v));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_conversion_produces_gray() -> Result<()> {
        let nv12 = [vec![128u8; 4], vec![128u8; 2]].concat();
        let frame = to_frame(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(frame.as_rgb_bytes(), &[128u8; 12][..]);
        Ok(())
    }

    #[test]
    fn yuyv_conversion_produces_gray() -> Result<()> {
        let yuyv = vec![90u8, 128, 90, 128, 90, 128, 90, 128];
        let frame = to_frame(&yuyv, 2, 2, PixelFormat::Yuyv)?;
        assert_eq!(frame.as_rgb_bytes(), &[90u8; 12][..]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_validates_length() -> Result<()> {
        let pixels = vec![1u8; 9];
        let frame = to_frame(&pixels, 1, 3, PixelFormat::Rgb24)?;
        assert_eq!(frame.as_rgb_bytes(), &pixels[..]);
        assert!(to_frame(&pixels[..8], 1, 3, PixelFormat::Rgb24).is_err());
        Ok(())
    }

    #[test]
    fn unknown_fourcc_is_rejected() {
        assert!(PixelFormat::from_fourcc(b"GREY").is_err());
        assert_eq!(PixelFormat::from_fourcc(b"MJPG").ok(), Some(PixelFormat::Mjpeg));
    }
}
