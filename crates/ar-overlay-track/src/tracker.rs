use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use ar_overlay_core::MarkerObservation;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::Uid;

/// Identity tracker settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackerParams {
    /// Consecutive frames a marker may be missing before eviction.
    pub max_frames_missing: u32,
    /// Max center distance (pixels) for two consecutive-frame observations
    /// to be the same physical marker.
    pub max_distance: f64,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            max_frames_missing: 5,
            max_distance: 5000.0,
        }
    }
}

/// Register entry owned by the tracker.
#[derive(Clone, Debug)]
pub struct TrackedMarker {
    pub last_observation: MarkerObservation,
    pub missing_frames: u32,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    distance: f64,
    obs_index: usize,
    uid: Uid,
}

/// Assigns stable UIDs to per-frame marker observations.
///
/// Association is a greedy global walk over same-class (same dictionary and
/// id) candidate pairs in ascending center-distance order, which
/// approximates optimal assignment cheaply: physical markers rarely move
/// far between consecutive frames relative to `max_distance`.
pub struct MarkerTracker {
    params: TrackerParams,
    register: BTreeMap<Uid, TrackedMarker>,
}

impl MarkerTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            register: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// The live register, keyed by UID in ascending order.
    pub fn register(&self) -> &BTreeMap<Uid, TrackedMarker> {
        &self.register
    }

    pub fn registered_uids(&self) -> Vec<Uid> {
        self.register.keys().copied().collect()
    }

    /// Remove one marker from the register.
    pub fn remove(&mut self, uid: &Uid) -> Option<TrackedMarker> {
        self.register.remove(uid)
    }

    /// Fresh UID for a first sighting: 1 + highest nonce currently live in
    /// the `(dictionary, id)` class. Nonces are never reused while any UID
    /// of the class is alive.
    fn next_uid(&self, dictionary: i32, id: i32) -> Uid {
        let nonce = self
            .register
            .keys()
            .filter(|uid| uid.is_class(dictionary, id))
            .map(|uid| uid.nonce + 1)
            .max()
            .unwrap_or(0);
        Uid::new(dictionary, id, nonce)
    }

    fn insert_new(&mut self, observation: &MarkerObservation) -> Uid {
        let uid = self.next_uid(observation.dictionary, observation.id);
        let previous = self.register.insert(
            uid,
            TrackedMarker {
                last_observation: observation.clone(),
                missing_frames: 0,
            },
        );
        // A fresh nonce can never collide with a live entry.
        debug_assert!(previous.is_none(), "duplicate UID {uid} in register");
        debug!("registered {uid}");
        uid
    }

    /// Age every register entry not matched this frame; evict past the
    /// grace window.
    fn age_unmatched(&mut self, matched: &BTreeSet<Uid>) {
        let max_missing = self.params.max_frames_missing;
        let mut evicted = Vec::new();
        self.register.retain(|uid, entry| {
            if matched.contains(uid) {
                return true;
            }
            entry.missing_frames += 1;
            if entry.missing_frames > max_missing {
                evicted.push(*uid);
                false
            } else {
                true
            }
        });
        for uid in evicted {
            debug!("evicted {uid} after grace window");
        }
    }

    /// Feed one frame's detections and get back `(uid, observation)` for
    /// every marker touched this frame (refreshed or newly registered).
    /// Markers that were only aged are not returned.
    ///
    /// Equal-distance candidates commit in candidate enumeration order
    /// (observation index, then ascending UID). That tie-break is an
    /// accepted nondeterminism of the association scheme, pinned to a
    /// deterministic order here but carrying no semantic claim.
    pub fn update(&mut self, observations: &[MarkerObservation]) -> Vec<(Uid, MarkerObservation)> {
        let mut updates = Vec::new();

        if observations.is_empty() {
            self.age_unmatched(&BTreeSet::new());
            return updates;
        }

        if self.register.is_empty() {
            for obs in observations {
                let uid = self.insert_new(obs);
                updates.push((uid, obs.clone()));
            }
            return updates;
        }

        let mut candidates = Vec::new();
        for (obs_index, obs) in observations.iter().enumerate() {
            for (uid, entry) in &self.register {
                if !uid.is_class(obs.dictionary, obs.id) {
                    continue;
                }
                let distance = (obs.center() - entry.last_observation.center()).norm();
                candidates.push(Candidate {
                    distance,
                    obs_index,
                    uid: *uid,
                });
            }
        }
        // Stable sort: ties keep enumeration order.
        candidates.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });

        let mut matched_obs = vec![false; observations.len()];
        let mut matched_uids = BTreeSet::new();

        for c in &candidates {
            if matched_obs[c.obs_index]
                || matched_uids.contains(&c.uid)
                || c.distance > self.params.max_distance
            {
                continue;
            }
            let obs = &observations[c.obs_index];
            if let Some(entry) = self.register.get_mut(&c.uid) {
                entry.last_observation = obs.clone();
                entry.missing_frames = 0;
                matched_obs[c.obs_index] = true;
                matched_uids.insert(c.uid);
                updates.push((c.uid, obs.clone()));
            }
        }

        for (obs_index, obs) in observations.iter().enumerate() {
            if matched_obs[obs_index] {
                continue;
            }
            let uid = self.insert_new(obs);
            matched_uids.insert(uid);
            updates.push((uid, obs.clone()));
        }

        self.age_unmatched(&matched_uids);
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Vector3};

    fn obs_at(dictionary: i32, id: i32, x: f64, y: f64) -> MarkerObservation {
        MarkerObservation::new(
            [
                Point2::new(x, y),
                Point2::new(x + 100.0, y),
                Point2::new(x + 100.0, y + 100.0),
                Point2::new(x, y + 100.0),
            ],
            Vector3::zeros(),
            Vector3::zeros(),
            dictionary,
            id,
        )
    }

    #[test]
    fn stable_uid_across_repeated_frames() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        let obs = obs_at(3, 5, 100.0, 100.0);
        let first = tracker.update(std::slice::from_ref(&obs));
        let uid = first[0].0;
        for _ in 0..10 {
            let updates = tracker.update(std::slice::from_ref(&obs));
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].0, uid);
        }
        assert_eq!(tracker.register().len(), 1);
    }

    #[test]
    fn eviction_happens_only_past_grace_window() {
        let params = TrackerParams {
            max_frames_missing: 3,
            ..TrackerParams::default()
        };
        let mut tracker = MarkerTracker::new(params);
        tracker.update(&[obs_at(3, 5, 0.0, 0.0)]);

        for _ in 0..3 {
            assert!(tracker.update(&[]).is_empty());
        }
        // Exactly max_frames_missing missing frames: still registered.
        assert_eq!(tracker.register().len(), 1);

        tracker.update(&[]);
        // One more: gone.
        assert!(tracker.register().is_empty());
    }

    #[test]
    fn simultaneous_same_class_markers_get_distinct_nonces() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        let updates = tracker.update(&[obs_at(3, 5, 0.0, 0.0), obs_at(3, 5, 3000.0, 0.0)]);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].0, Uid::new(3, 5, 0));
        assert_eq!(updates[1].0, Uid::new(3, 5, 1));
    }

    #[test]
    fn nonce_is_one_past_highest_live_nonce() {
        let params = TrackerParams {
            max_frames_missing: 0,
            max_distance: 100.0,
        };
        let mut tracker = MarkerTracker::new(params);
        tracker.update(&[obs_at(3, 5, 0.0, 0.0), obs_at(3, 5, 3000.0, 0.0)]);

        // Keep only #1 alive; #0 is evicted immediately (grace window 0).
        tracker.update(&[obs_at(3, 5, 3000.0, 0.0)]);
        assert_eq!(tracker.registered_uids(), vec![Uid::new(3, 5, 1)]);

        // A new far-away sighting gets nonce 2, not the dead 0.
        let updates = tracker.update(&[obs_at(3, 5, 3000.0, 0.0), obs_at(3, 5, 9000.0, 0.0)]);
        assert!(updates.iter().any(|(uid, _)| *uid == Uid::new(3, 5, 2)));
    }

    #[test]
    fn beyond_max_distance_is_a_new_marker() {
        let params = TrackerParams {
            max_distance: 500.0,
            ..TrackerParams::default()
        };
        let mut tracker = MarkerTracker::new(params);
        tracker.update(&[obs_at(3, 5, 0.0, 0.0)]);

        let updates = tracker.update(&[obs_at(3, 5, 2000.0, 0.0)]);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, Uid::new(3, 5, 1));
        // The old entry aged instead of matching.
        assert_eq!(tracker.register()[&Uid::new(3, 5, 0)].missing_frames, 1);
    }

    #[test]
    fn different_ids_never_associate() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        tracker.update(&[obs_at(3, 5, 0.0, 0.0)]);
        // Same position, different id: must not steal the identity.
        let updates = tracker.update(&[obs_at(3, 6, 0.0, 0.0)]);
        assert_eq!(updates[0].0, Uid::new(3, 6, 0));
        assert_eq!(tracker.register().len(), 2);
    }

    #[test]
    fn nearest_observation_wins_association() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        tracker.update(&[obs_at(3, 5, 1000.0, 1000.0)]);

        // Near and far copies of the same class in one frame: the near one
        // keeps the registered identity, the far one is new.
        let updates = tracker.update(&[
            obs_at(3, 5, 4000.0, 1000.0),
            obs_at(3, 5, 1010.0, 1000.0),
        ]);
        let near = updates
            .iter()
            .find(|(_, o)| o.center().x < 2000.0)
            .unwrap();
        assert_eq!(near.0, Uid::new(3, 5, 0));
        let far = updates
            .iter()
            .find(|(_, o)| o.center().x > 2000.0)
            .unwrap();
        assert_eq!(far.0, Uid::new(3, 5, 1));
    }

    #[test]
    fn two_marker_scenario_with_one_disappearing() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        let first = tracker.update(&[obs_at(3, 5, 100.0, 100.0), obs_at(3, 6, 600.0, 100.0)]);
        assert_eq!(first[0].0, Uid::new(3, 5, 0));
        assert_eq!(first[1].0, Uid::new(3, 6, 0));

        // id 5 disappears; id 6 moves 10px.
        let second = tracker.update(&[obs_at(3, 6, 610.0, 100.0)]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, Uid::new(3, 6, 0));

        let register = tracker.register();
        assert_eq!(register.len(), 2);
        assert_eq!(register[&Uid::new(3, 5, 0)].missing_frames, 1);
        assert_eq!(register[&Uid::new(3, 6, 0)].missing_frames, 0);
    }

    #[test]
    fn empty_frames_age_all_entries() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        tracker.update(&[obs_at(3, 5, 0.0, 0.0), obs_at(11, 2, 500.0, 0.0)]);
        tracker.update(&[]);
        for entry in tracker.register().values() {
            assert_eq!(entry.missing_frames, 1);
        }
    }

    #[test]
    fn refresh_from_stale_returns_to_active() {
        let mut tracker = MarkerTracker::new(TrackerParams::default());
        tracker.update(&[obs_at(3, 5, 0.0, 0.0)]);
        tracker.update(&[]);
        tracker.update(&[]);
        assert_eq!(tracker.register()[&Uid::new(3, 5, 0)].missing_frames, 2);

        let updates = tracker.update(&[obs_at(3, 5, 20.0, 0.0)]);
        assert_eq!(updates[0].0, Uid::new(3, 5, 0));
        assert_eq!(tracker.register()[&Uid::new(3, 5, 0)].missing_frames, 0);
    }
}
