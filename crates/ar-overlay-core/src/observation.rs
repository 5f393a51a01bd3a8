use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// One detected fiducial marker in one frame.
///
/// Produced by an external detector; the pose (rotation/translation vectors)
/// is assumed to be estimated already, in the detector's units. The snapshot
/// is immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    /// Corner polygon in pixel coordinates, ordered consistently by the
    /// detector (clockwise from top-left).
    pub corners: [Point2<f64>; 4],
    /// Axis-angle rotation vector (Rodrigues form).
    pub rotation: Vector3<f64>,
    /// Translation vector in the detector's units.
    pub translation: Vector3<f64>,
    /// Marker dictionary identifier (e.g. the DICT_4X4_50 family id).
    pub dictionary: i32,
    /// Marker id within its dictionary.
    pub id: i32,
}

impl MarkerObservation {
    pub fn new(
        corners: [Point2<f64>; 4],
        rotation: Vector3<f64>,
        translation: Vector3<f64>,
        dictionary: i32,
        id: i32,
    ) -> Self {
        Self {
            corners,
            rotation,
            translation,
            dictionary,
            id,
        }
    }

    /// Marker center as the average of the two diagonal midpoints.
    ///
    /// Using opposite corner pairs keeps the center stable under mild
    /// corner-detection noise.
    pub fn center(&self) -> Point2<f64> {
        let d0 = self.corners[0].coords + self.corners[2].coords;
        let d1 = self.corners[1].coords + self.corners[3].coords;
        Point2::from((d0 * 0.5 + d1 * 0.5) * 0.5)
    }

    /// Marker center lifted onto the z = 0 plane of projected space.
    pub fn center3(&self) -> Point3<f64> {
        let c = self.center();
        Point3::new(c.x, c.y, 0.0)
    }
}
