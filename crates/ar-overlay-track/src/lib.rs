//! Persistent marker identities across frames.
//!
//! The detector re-discovers markers from scratch every frame; this crate
//! turns that per-frame soup into stable identities (UIDs) using same-class
//! nearest-neighbor association with a missing-frame grace window.

mod tracker;
mod uid;

pub use tracker::{MarkerTracker, TrackedMarker, TrackerParams};
pub use uid::Uid;
