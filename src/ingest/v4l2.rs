//! V4L2 camera.
//!
//! Opens a local device node (e.g. /dev/video0), requests RGB3 at the
//! configured size and falls back to whatever format the driver settles on,
//! normalizing YUYV/NV12/MJPEG buffers to RGB.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use super::normalize::{self, PixelFormat};
use super::CaptureDevice;
use crate::frame::Frame;

#[self_referencing]
struct StreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

pub struct V4l2Camera {
    path: String,
    state: Option<StreamState>,
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_count: u64,
}

impl V4l2Camera {
    pub fn open(path: String, width: u32, height: u32, fps: u32) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;
        let mut requested = device.format().context("read v4l2 format")?;
        requested.width = width;
        requested.height = height;
        requested.fourcc = v4l::FourCC::new(b"RGB3");

        let active = match device.set_format(&requested) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("V4l2Camera: failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        let format = PixelFormat::from_fourcc(&active.fourcc.repr)?;

        if fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("V4l2Camera: failed to set fps on {}: {}", path, err);
            }
        }

        let state = StreamStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Camera: opened {} ({}x{} {:?})",
            path,
            active.width,
            active.height,
            format
        );
        Ok(Self {
            path,
            state: Some(state),
            width: active.width,
            height: active.height,
            format,
            frame_count: 0,
        })
    }
}

impl CaptureDevice for V4l2Camera {
    fn describe(&self) -> String {
        format!("{} ({}x{} {:?})", self.path, self.width, self.height, self.format)
    }

    fn read(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device released")?;
        let (width, height, format) = (self.width, self.height, self.format);
        let frame = state.with_mut(|fields| -> Result<Frame> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize::to_frame(&buf[..used], width, height, format)
        })?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Camera: released {}", self.path);
        }
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}
