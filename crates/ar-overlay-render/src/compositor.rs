use std::cmp::Ordering;
use std::collections::HashMap;

use ar_overlay_core::{
    autoscale_factor, compose_projection, fill_convex_polygon, pose_matrix, project_point, Bgr,
    FrameBuffer, MarkerObservation, DEFAULT_REFERENCE_SIZE,
};
use ar_overlay_mesh::{Face, Material, MeshAsset};
use log::{debug, warn};
use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Fill color for faces with no resolvable material or vertex colors (BGR).
pub const DEFAULT_FACE_COLOR: Bgr = [158, 5, 81];

/// Compositing settings. All fields have working defaults; callers override
/// the constants, they are never computed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompositorParams {
    /// Extra scale applied on top of the marker-derived autoscale factor.
    pub scale: f64,
    /// Canonical marker pixel size the autoscale factor is measured against.
    pub reference_size: f64,
    /// Fallback face fill color.
    pub default_color: Bgr,
    /// Fixed 3x3 extrinsic matrix; identity because camera effects are
    /// already baked into the observation's pose.
    pub extrinsic: Matrix3<f64>,
    /// Reference point in projected space for the painter's depth sort.
    pub depth_reference: Point3<f64>,
}

impl Default for CompositorParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            reference_size: DEFAULT_REFERENCE_SIZE,
            default_color: DEFAULT_FACE_COLOR,
            extrinsic: Matrix3::identity(),
            depth_reference: Point3::origin(),
        }
    }
}

/// Per-marker projection failures. The caller skips the marker for the
/// frame; the frame loop itself never aborts.
#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("degenerate marker corners: autoscale factor is zero or non-finite")]
    DegenerateScale,
}

struct ProjectedFace {
    points: Vec<Vector3<f64>>,
    color: Bgr,
    depth: f64,
}

/// Projects mesh faces through a marker's pose and rasterizes them
/// back-to-front onto the frame.
pub struct Compositor {
    params: CompositorParams,
}

impl Compositor {
    pub fn new(params: CompositorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CompositorParams {
        &self.params
    }

    /// Draw `asset` onto `frame` at the marker's pose. Returns the number
    /// of faces rasterized; malformed or numerically degenerate faces are
    /// skipped individually.
    pub fn project(
        &self,
        frame: &mut FrameBuffer,
        observation: &MarkerObservation,
        asset: &MeshAsset,
    ) -> Result<usize, ProjectError> {
        let autoscale = autoscale_factor(&observation.corners, self.params.reference_size)
            .ok_or(ProjectError::DegenerateScale)?;
        let scale = self.params.scale * autoscale;

        let center = observation.center3();
        let pose = pose_matrix(&observation.rotation, &center.coords);
        let projection = compose_projection(&self.params.extrinsic, &pose);

        let mut projected: Vec<ProjectedFace> = Vec::with_capacity(asset.faces.len());
        for face in &asset.faces {
            if face.points.len() < 3 {
                warn!("skipping face with {} point(s)", face.points.len());
                continue;
            }
            let points: Vec<Vector3<f64>> = face
                .points
                .iter()
                .map(|p| project_point(&projection, &Point3::from(p.coords * scale)))
                .collect();
            if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite()) {
                warn!("skipping face with non-finite projection");
                continue;
            }

            let centroid = points.iter().sum::<Vector3<f64>>() / points.len() as f64;
            let depth = (centroid - self.params.depth_reference.coords).norm();

            projected.push(ProjectedFace {
                points,
                color: resolve_face_color(face, &asset.materials, self.params.default_color),
                depth,
            });
        }

        // Painter's algorithm: farthest from the reference point first, so
        // nearer faces overwrite. No z-buffer; meshes need not be convex
        // overall, only per face.
        projected.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));

        let drawn = projected.len();
        for face in &projected {
            let flat: Vec<Point2<f64>> =
                face.points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            fill_convex_polygon(frame, &flat, face.color);
        }
        Ok(drawn)
    }
}

/// Resolve a face fill color: referenced material's diffuse, else the
/// average of the per-vertex colors, else the configured default. A missing
/// material name is non-fatal and falls back to the default.
fn resolve_face_color(face: &Face, materials: &HashMap<String, Material>, default: Bgr) -> Bgr {
    if let Some(name) = &face.material {
        match materials.get(name) {
            Some(material) => return material.diffuse,
            None => {
                debug!("material `{name}` not defined, using default color");
                return default;
            }
        }
    }
    face.average_color().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3 as V3;

    fn observation(x: f64, y: f64, side: f64) -> MarkerObservation {
        MarkerObservation::new(
            [
                Point2::new(x, y),
                Point2::new(x + side, y),
                Point2::new(x + side, y + side),
                Point2::new(x, y + side),
            ],
            V3::zeros(),
            V3::new(0.0, 0.0, 10.0),
            3,
            5,
        )
    }

    fn square_face(z: f64, material: Option<&str>) -> Face {
        Face {
            points: vec![
                Point3::new(-1.0, -1.0, z),
                Point3::new(1.0, -1.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(-1.0, 1.0, z),
            ],
            colors: None,
            material: material.map(String::from),
        }
    }

    fn single_square_asset() -> MeshAsset {
        MeshAsset {
            vertices: vec![],
            faces: vec![square_face(0.0, None)],
            materials: HashMap::new(),
        }
    }

    fn drawn_centroid(frame: &FrameBuffer, color: Bgr) -> Option<(f64, f64)> {
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for y in 0..frame.height as i32 {
            for x in 0..frame.width as i32 {
                if frame.get_pixel(x, y) == Some(color) {
                    sx += x as f64;
                    sy += y as f64;
                    n += 1;
                }
            }
        }
        (n > 0).then(|| (sx / n as f64, sy / n as f64))
    }

    #[test]
    fn zero_rotation_square_lands_on_marker_center() {
        let params = CompositorParams {
            // Blow the unit square up to ~10px so the fill has area.
            scale: 100.0,
            ..CompositorParams::default()
        };
        let compositor = Compositor::new(params);
        let mut frame = FrameBuffer::new(320, 320);
        let obs = observation(100.0, 100.0, 100.0);

        let drawn = compositor
            .project(&mut frame, &obs, &single_square_asset())
            .unwrap();
        assert_eq!(drawn, 1);

        let (cx, cy) = drawn_centroid(&frame, DEFAULT_FACE_COLOR).expect("pixels drawn");
        let center = obs.center();
        assert_relative_eq!(cx, center.x, epsilon = 1.0);
        assert_relative_eq!(cy, center.y, epsilon = 1.0);
    }

    #[test]
    fn degenerate_corners_skip_the_marker() {
        let compositor = Compositor::new(CompositorParams::default());
        let mut frame = FrameBuffer::new(64, 64);
        let obs = observation(10.0, 10.0, 0.0);
        assert!(matches!(
            compositor.project(&mut frame, &obs, &single_square_asset()),
            Err(ProjectError::DegenerateScale)
        ));
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn short_faces_are_skipped_but_frame_render_continues() {
        let compositor = Compositor::new(CompositorParams {
            scale: 100.0,
            ..CompositorParams::default()
        });
        let mut frame = FrameBuffer::new(320, 320);
        let mut asset = single_square_asset();
        asset.faces.insert(
            0,
            Face {
                points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
                colors: None,
                material: None,
            },
        );
        let drawn = compositor
            .project(&mut frame, &observation(100.0, 100.0, 100.0), &asset)
            .unwrap();
        assert_eq!(drawn, 1);
    }

    #[test]
    fn face_closer_to_reference_is_drawn_last() {
        let mut materials = HashMap::new();
        materials.insert(
            "near".to_string(),
            Material {
                diffuse: [255, 0, 0],
                ..Material::default()
            },
        );
        materials.insert(
            "far".to_string(),
            Material {
                diffuse: [0, 255, 0],
                ..Material::default()
            },
        );
        // Both squares cover the same screen area; the z = 0.5 one sits
        // farther from the origin reference than the z = 0 one.
        let asset = MeshAsset {
            vertices: vec![],
            faces: vec![square_face(0.0, Some("near")), square_face(0.5, Some("far"))],
            materials,
        };

        let compositor = Compositor::new(CompositorParams {
            scale: 100.0,
            ..CompositorParams::default()
        });
        let mut frame = FrameBuffer::new(320, 320);
        let obs = observation(100.0, 100.0, 100.0);
        compositor.project(&mut frame, &obs, &asset).unwrap();

        let center = obs.center();
        assert_eq!(
            frame.get_pixel(center.x as i32, center.y as i32),
            Some([255, 0, 0])
        );
    }

    #[test]
    fn color_resolution_prefers_material_then_vertex_average() {
        let mut materials = HashMap::new();
        materials.insert(
            "skin".to_string(),
            Material {
                diffuse: [1, 2, 3],
                ..Material::default()
            },
        );

        let with_material = square_face(0.0, Some("skin"));
        assert_eq!(
            resolve_face_color(&with_material, &materials, DEFAULT_FACE_COLOR),
            [1, 2, 3]
        );

        let mut with_colors = square_face(0.0, None);
        with_colors.colors = Some(vec![[10, 10, 10], [20, 20, 20]]);
        assert_eq!(
            resolve_face_color(&with_colors, &materials, DEFAULT_FACE_COLOR),
            [15, 15, 15]
        );

        let missing_material = square_face(0.0, Some("ghost"));
        assert_eq!(
            resolve_face_color(&missing_material, &materials, DEFAULT_FACE_COLOR),
            DEFAULT_FACE_COLOR
        );

        let bare = square_face(0.0, None);
        assert_eq!(
            resolve_face_color(&bare, &materials, DEFAULT_FACE_COLOR),
            DEFAULT_FACE_COLOR
        );
    }
}
