use ar_overlay_core::{Bgr, FrameBuffer};
use serde::{Deserialize, Serialize};

/// Which camera backend a session reads frames from.
///
/// Hardware backends (depth cameras) are selected by configuration and
/// implemented out of tree; this crate only ships the capability interface
/// and a synthetic source for tests and offline runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureKind {
    #[default]
    Default,
    RealSenseD435,
    RealSenseL515,
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("capture backend {0:?} is not available in this build")]
    Unavailable(CaptureKind),
}

/// Minimal frame-producing collaborator: the pipeline only ever asks for
/// the next frame.
pub trait FrameSource {
    /// The next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Option<FrameBuffer>;
}

/// Fixed-color frame source for tests and offline pipelines.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    width: usize,
    height: usize,
    color: Bgr,
    remaining: usize,
}

impl SyntheticSource {
    pub fn new(width: usize, height: usize, color: Bgr, frames: usize) -> Self {
        Self {
            width,
            height,
            color,
            remaining: frames,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<FrameBuffer> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(FrameBuffer::filled(self.width, self.height, self.color))
    }
}

impl CaptureKind {
    /// Open the configured backend.
    pub fn open(self, width: usize, height: usize) -> Result<Box<dyn FrameSource>, CaptureError> {
        match self {
            CaptureKind::Default => Ok(Box::new(SyntheticSource::new(
                width,
                height,
                [0, 0, 0],
                usize::MAX,
            ))),
            CaptureKind::RealSenseD435 | CaptureKind::RealSenseL515 => {
                Err(CaptureError::Unavailable(self))
            }
        }
    }
}
