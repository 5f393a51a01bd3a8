//! Pose and projection math for a single marker observation.
//!
//! All computations are double precision. The projection pipeline is
//! `extrinsic (3x3) * [R | t] (3x4)`, applied to homogenized mesh points;
//! the z component survives projection so the compositor can depth-sort.

use nalgebra::{Matrix3, Matrix3x4, Point2, Point3, Vector3};

/// Canonical marker pixel size the autoscale factor is measured against.
///
/// A marker whose longest edge spans this many pixels renders a
/// unit-normalized mesh at scale 1.
pub const DEFAULT_REFERENCE_SIZE: f64 = 2000.0;

/// Convert an axis-angle rotation vector into a 3x3 rotation matrix using
/// the standard Rodrigues formula.
///
/// A near-zero rotation vector yields the identity.
pub fn rodrigues(rvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta = rvec.norm();
    if theta < 1e-12 {
        return Matrix3::identity();
    }
    let k = rvec / theta;
    let kx = Matrix3::new(0.0, -k.z, k.y, k.z, 0.0, -k.x, -k.y, k.x, 0.0);
    Matrix3::identity() + kx * theta.sin() + kx * kx * (1.0 - theta.cos())
}

/// Build the 3x4 pose matrix `[R | t]` from a rotation vector and a
/// translation column.
pub fn pose_matrix(rotation: &Vector3<f64>, translation: &Vector3<f64>) -> Matrix3x4<f64> {
    let r = rodrigues(rotation);
    let mut m = Matrix3x4::zeros();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    m.set_column(3, translation);
    m
}

/// Compose the final projection matrix as `extrinsic * pose`.
///
/// The extrinsic matrix is the identity in the default pipeline: camera
/// effects are already baked into the detector's pose estimate.
pub fn compose_projection(extrinsic: &Matrix3<f64>, pose: &Matrix3x4<f64>) -> Matrix3x4<f64> {
    extrinsic * pose
}

/// Project a 3-D point through a 3x4 projection matrix.
///
/// The point is homogenized (w = 1); the result keeps its third component
/// so callers can still order faces by depth.
#[inline]
pub fn project_point(projection: &Matrix3x4<f64>, point: &Point3<f64>) -> Vector3<f64> {
    projection * point.to_homogeneous()
}

/// Scale factor mapping a unit-normalized mesh to the marker's apparent
/// pixel size.
///
/// Takes the maximum absolute coordinate difference between each corner and
/// its cyclic predecessor and divides by `reference_size`. Returns `None`
/// when the result is non-finite or not positive (degenerate corners), in
/// which case the marker should be skipped for the frame.
pub fn autoscale_factor(corners: &[Point2<f64>; 4], reference_size: f64) -> Option<f64> {
    let mut max_delta = 0.0_f64;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let cur = corners[i];
        max_delta = max_delta
            .max((cur.x - prev.x).abs())
            .max((cur.y - prev.y).abs());
    }
    let factor = max_delta / reference_size;
    if factor.is_finite() && factor > 0.0 {
        Some(factor)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn rodrigues_zero_vector_is_identity() {
        let r = rodrigues(&Vector3::zeros());
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn rodrigues_quarter_turn_about_z() {
        let r = rodrigues(&Vector3::new(0.0, 0.0, FRAC_PI_2));
        let v = r * Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rodrigues_half_turn_about_x() {
        let r = rodrigues(&Vector3::new(PI, 0.0, 0.0));
        let v = r * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(v.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn rodrigues_is_orthonormal() {
        let r = rodrigues(&Vector3::new(0.3, -0.7, 1.1));
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn pose_matrix_carries_translation_column() {
        let m = pose_matrix(&Vector3::zeros(), &Vector3::new(10.0, 20.0, 30.0));
        let p = project_point(&m, &Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p, Vector3::new(11.0, 22.0, 33.0), epsilon = 1e-12);
    }

    #[test]
    fn identity_extrinsic_leaves_pose_unchanged() {
        let pose = pose_matrix(&Vector3::new(0.1, 0.2, 0.3), &Vector3::new(1.0, 2.0, 3.0));
        let proj = compose_projection(&Matrix3::identity(), &pose);
        assert_relative_eq!(proj, pose, epsilon = 1e-12);
    }

    #[test]
    fn autoscale_uses_longest_cyclic_edge_component() {
        let corners = [
            Point2::new(100.0, 100.0),
            Point2::new(300.0, 120.0),
            Point2::new(310.0, 340.0),
            Point2::new(90.0, 330.0),
        ];
        // Largest component delta: |330 - 100| = 230 between corners 3 and 0.
        let f = autoscale_factor(&corners, 2000.0).unwrap();
        assert_relative_eq!(f, 230.0 / 2000.0);
    }

    #[test]
    fn autoscale_rejects_degenerate_corners() {
        let p = Point2::new(50.0, 50.0);
        assert!(autoscale_factor(&[p, p, p, p], 2000.0).is_none());
        let nan = Point2::new(f64::NAN, 0.0);
        assert!(autoscale_factor(&[nan, p, p, p], 2000.0).is_none());
    }
}
