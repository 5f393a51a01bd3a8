//! Core types and geometry for marker-based AR overlays.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! know anything about marker detection, mesh formats or asset management:
//! it defines the observation snapshot handed over by an external detector,
//! the pose/projection math driven by that snapshot, and a minimal BGR
//! raster type the compositor draws into.

mod frame;
mod geometry;
mod logger;
mod observation;

pub use frame::{fill_convex_polygon, Bgr, FrameBuffer, FrameBufferView};
pub use geometry::{
    autoscale_factor, compose_projection, pose_matrix, project_point, rodrigues,
    DEFAULT_REFERENCE_SIZE,
};
pub use observation::MarkerObservation;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
