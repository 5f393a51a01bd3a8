//! High-level facade crate for the `ar-overlay-*` workspace.
//!
//! Overlays synthetic 3-D content onto fiducial markers detected in a video
//! feed. An external detector supplies per-frame [`MarkerObservation`]s;
//! this crate keeps their identities stable across frames, picks the mesh
//! and animation frame for each identity, and composites everything
//! back-to-front onto the frame buffer.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use ar_overlay::{AssetRegister, OverlaySession, SessionParams};
//! use ar_overlay::core::FrameBuffer;
//! use ar_overlay_mesh::{load_obj, ObjLoadOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fallback = load_obj(Path::new("models/fox.obj"), &ObjLoadOptions::default())?;
//! let mut register = AssetRegister::new(Arc::new(fallback));
//! register.load_map_file(Path::new("models/assets.json"))?;
//! register.preload(Path::new("models"))?;
//!
//! let mut session = OverlaySession::new(SessionParams::default(), register);
//! let mut frame = FrameBuffer::new(1280, 720);
//! let observations = vec![]; // from the detector
//! let stats = session.process_frame(&mut frame, &observations);
//! println!("augmented {} marker(s)", stats.augmented);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ar_overlay::core`: observations, pose/projection math, frame raster.
//! - `ar_overlay::mesh`: OBJ/MTL assets and normalization.
//! - `ar_overlay::track`: persistent marker identities.
//! - `ar_overlay::render`: asset register and compositor.
//! - [`OverlaySession`]: the single-owner per-frame pipeline.
//! - `ar_overlay::convert` (feature `image`): frame <-> `image` crate I/O.

pub use ar_overlay_core as core;
pub use ar_overlay_mesh as mesh;
pub use ar_overlay_render as render;
pub use ar_overlay_track as track;

pub use ar_overlay_core::{FrameBuffer, MarkerObservation};
pub use ar_overlay_render::{AssetRegister, Compositor, CompositorParams};
pub use ar_overlay_track::{MarkerTracker, TrackerParams, Uid};

mod capture;
mod session;

pub use capture::{CaptureError, CaptureKind, FrameSource, SyntheticSource};
pub use session::{FrameStats, OverlaySession, RotationSmoother, SessionParams};

#[cfg(feature = "image")]
pub mod convert;
