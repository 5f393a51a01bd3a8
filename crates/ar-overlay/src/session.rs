use std::collections::{HashMap, VecDeque};

use ar_overlay_core::{FrameBuffer, MarkerObservation};
use ar_overlay_render::{AssetRegister, Compositor, CompositorParams};
use ar_overlay_track::{MarkerTracker, TrackerParams, Uid};
use log::warn;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Settings for one tracking session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionParams {
    pub tracker: TrackerParams,
    pub compositor: CompositorParams,
    /// Smooth each identity's rotation vector with a moving average before
    /// projection. Off by default; helps against pose jitter at the cost
    /// of lag on fast marker motion.
    pub smooth_rotation: bool,
    /// Moving-average window length when smoothing is enabled.
    pub smoothing_window: usize,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            tracker: TrackerParams::default(),
            compositor: CompositorParams::default(),
            smooth_rotation: false,
            smoothing_window: 5,
        }
    }
}

/// What happened during one `process_frame` call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Identities live in the register after the update.
    pub tracked: usize,
    /// Markers successfully augmented this frame.
    pub augmented: usize,
    /// Markers skipped this frame (degenerate geometry).
    pub skipped: usize,
}

/// Moving average over the last N rotation vectors per identity.
#[derive(Clone, Debug, Default)]
pub struct RotationSmoother {
    window: usize,
    histories: HashMap<Uid, VecDeque<Vector3<f64>>>,
}

impl RotationSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            histories: HashMap::new(),
        }
    }

    /// Record the latest rotation for `uid` and return the window average.
    pub fn push(&mut self, uid: Uid, rotation: Vector3<f64>) -> Vector3<f64> {
        let history = self.histories.entry(uid).or_default();
        history.push_back(rotation);
        while history.len() > self.window {
            history.pop_front();
        }
        history.iter().sum::<Vector3<f64>>() / history.len() as f64
    }

    pub fn retain(&mut self, live: &[Uid]) {
        self.histories.retain(|uid, _| live.contains(uid));
    }
}

/// Single-owner state of one tracking session.
///
/// Owns the tracker register, the asset register and the compositor, and
/// runs the synchronous per-frame pipeline: track, resolve asset, project.
/// One frame must finish compositing before the next update begins, which
/// the `&mut self` receiver enforces.
pub struct OverlaySession {
    tracker: MarkerTracker,
    register: AssetRegister,
    compositor: Compositor,
    smoother: Option<RotationSmoother>,
}

impl OverlaySession {
    pub fn new(params: SessionParams, register: AssetRegister) -> Self {
        let smoother = params
            .smooth_rotation
            .then(|| RotationSmoother::new(params.smoothing_window));
        Self {
            tracker: MarkerTracker::new(params.tracker),
            compositor: Compositor::new(params.compositor),
            register,
            smoother,
        }
    }

    pub fn tracker(&self) -> &MarkerTracker {
        &self.tracker
    }

    pub fn register(&self) -> &AssetRegister {
        &self.register
    }

    pub fn register_mut(&mut self) -> &mut AssetRegister {
        &mut self.register
    }

    /// Flip the global animation freeze; returns the new value.
    pub fn toggle_frozen(&mut self) -> bool {
        self.register.toggle_frozen()
    }

    /// Run one frame through the pipeline, drawing onto `frame`.
    ///
    /// Every failure mode degrades to "marker not augmented this frame";
    /// the call itself never fails.
    pub fn process_frame(
        &mut self,
        frame: &mut FrameBuffer,
        observations: &[MarkerObservation],
    ) -> FrameStats {
        let updates = self.tracker.update(observations);
        let live = self.tracker.registered_uids();
        self.register.retain_states(&live);
        if let Some(smoother) = &mut self.smoother {
            smoother.retain(&live);
        }

        let mut stats = FrameStats {
            tracked: live.len(),
            ..FrameStats::default()
        };

        for (uid, mut observation) in updates {
            if let Some(smoother) = &mut self.smoother {
                observation.rotation = smoother.push(uid, observation.rotation);
            }
            let asset = self.register.resolve_asset(uid);
            match self.compositor.project(frame, &observation, &asset) {
                Ok(_) => stats.augmented += 1,
                Err(err) => {
                    warn!("not augmenting {uid} this frame: {err}");
                    stats.skipped += 1;
                }
            }
        }
        stats
    }
}
