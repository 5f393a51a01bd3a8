//! Asset bookkeeping and compositing for marker AR overlays.
//!
//! [`AssetRegister`] decides *what* to draw for each tracked identity
//! (which mesh sequence, which animation frame, honoring the global freeze
//! flag); [`Compositor`] decides *where and how* (pose-driven projection,
//! painter's-algorithm depth ordering, convex fills onto the frame).

mod compositor;
mod register;

pub use compositor::{Compositor, CompositorParams, ProjectError, DEFAULT_FACE_COLOR};
pub use register::{
    AnimationState, AssetMapEntry, AssetRegister, RegisterError, SequenceKey, DEFAULT_ANIMATION,
};
