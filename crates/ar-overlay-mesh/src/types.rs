use std::collections::HashMap;

use ar_overlay_core::Bgr;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::MeshError;

/// Which coordinates participate in the normalization distance.
///
/// `Xy` normalizes against the footprint on the marker plane; `Xyz` against
/// the full bounding sphere.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum NormalizeAxes {
    #[default]
    Xy,
    Xyz,
}

/// Material attributes kept from the MTL file.
///
/// Only the diffuse color drives face fill today; the rest is carried so a
/// shading compositor can use it without re-parsing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Bgr,
    pub diffuse: Bgr,
    pub specular: Bgr,
    /// MTL `d` value scaled to 0..=255; 255 is opaque.
    pub opacity: u8,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: [0, 0, 0],
            diffuse: [200, 200, 200],
            specular: [0, 0, 0],
            opacity: 255,
        }
    }
}

/// One convex polygon of the mesh, with at least 3 points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub points: Vec<Point3<f64>>,
    /// Per-point BGR colors sampled from the texture, when present.
    pub colors: Option<Vec<Bgr>>,
    /// Material name from the enclosing `usemtl` block, when present.
    pub material: Option<String>,
}

impl Face {
    /// Average of the per-point colors, if the face has any.
    pub fn average_color(&self) -> Option<Bgr> {
        let colors = self.colors.as_deref().filter(|c| !c.is_empty())?;
        let n = colors.len() as u32;
        let mut sum = [0u32; 3];
        for c in colors {
            sum[0] += c[0] as u32;
            sum[1] += c[1] as u32;
            sum[2] += c[2] as u32;
        }
        Some([(sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8])
    }

    /// Centroid of the face's points.
    pub fn centroid(&self) -> Point3<f64> {
        let n = self.points.len() as f64;
        let mut sum = nalgebra::Vector3::zeros();
        for p in &self.points {
            sum += p.coords;
        }
        Point3::from(sum / n)
    }
}

/// Immutable in-memory 3-D model.
///
/// Normalized at load time so the furthest vertex from the origin sits at
/// distance 1; after that the asset is shared read-only between all tracked
/// markers referencing it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshAsset {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
    pub materials: HashMap<String, Material>,
}

impl MeshAsset {
    /// Distance of the furthest face point from the origin over the chosen
    /// axes.
    pub fn furthest_distance(&self, axes: NormalizeAxes) -> f64 {
        let mut max = 0.0_f64;
        for face in &self.faces {
            for p in &face.points {
                let d = match axes {
                    NormalizeAxes::Xy => (p.x * p.x + p.y * p.y).sqrt(),
                    NormalizeAxes::Xyz => p.coords.norm(),
                };
                max = max.max(d);
            }
        }
        max
    }

    /// Scale every vertex and face point so the furthest point lies at
    /// distance 1.
    pub fn normalize(&mut self, axes: NormalizeAxes) -> Result<(), MeshError> {
        if self.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let norm = self.furthest_distance(axes);
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(MeshError::DegenerateScale);
        }
        let inv = 1.0 / norm;
        for v in &mut self.vertices {
            v.coords *= inv;
        }
        for face in &mut self.faces {
            for p in &mut face.points {
                p.coords *= inv;
            }
        }
        Ok(())
    }
}
