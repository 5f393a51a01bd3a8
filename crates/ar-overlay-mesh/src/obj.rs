use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ar_overlay_core::Bgr;
use image::RgbImage;
use log::warn;
use nalgebra::{Point2, Point3};

use crate::{parse_mtl, Face, Material, MeshAsset, MeshError, NormalizeAxes};

/// Options for [`load_obj`].
#[derive(Clone, Debug)]
pub struct ObjLoadOptions {
    /// Texture image used to sample per-vertex colors from `vt` coordinates.
    pub texture: Option<PathBuf>,
    /// Normalization axes; `None` keeps the model's native units.
    pub normalize: Option<NormalizeAxes>,
}

impl Default for ObjLoadOptions {
    fn default() -> Self {
        Self {
            texture: None,
            normalize: Some(NormalizeAxes::Xy),
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, MeshError> {
    std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a Wavefront OBJ file, its `mtllib` companions (resolved relative to
/// the OBJ file) and an optional texture image, then normalize.
pub fn load_obj(path: &Path, options: &ObjLoadOptions) -> Result<MeshAsset, MeshError> {
    let text = read_to_string(path)?;

    let texture = match &options.texture {
        Some(tex_path) => Some(
            image::open(tex_path)
                .map_err(|source| MeshError::Texture {
                    path: tex_path.clone(),
                    source,
                })?
                .to_rgb8(),
        ),
        None => None,
    };

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut materials = HashMap::new();
    for line in text.lines() {
        if let Some(name) = line.trim().strip_prefix("mtllib ") {
            let mtl_text = read_to_string(&base.join(name.trim()))?;
            materials.extend(parse_mtl(&mtl_text)?);
        }
    }

    let mut mesh = parse_obj(&text, texture.as_ref(), materials)?;
    if let Some(axes) = options.normalize {
        mesh.normalize(axes)?;
    }
    Ok(mesh)
}

fn parse_floats<const N: usize>(parts: &[&str], line: usize) -> Result<[f64; N], MeshError> {
    if parts.len() < N {
        return Err(MeshError::parse(line, format!("expected {N} components")));
    }
    let mut out = [0.0; N];
    for (slot, text) in out.iter_mut().zip(parts) {
        *slot = text
            .parse()
            .map_err(|_| MeshError::parse(line, format!("invalid number `{text}`")))?;
    }
    Ok(out)
}

fn resolve_index(token: &str, len: usize, line: usize) -> Result<usize, MeshError> {
    let idx: i64 = token
        .parse()
        .map_err(|_| MeshError::parse(line, format!("invalid index `{token}`")))?;
    // OBJ indices are 1-based.
    if idx < 1 || idx as usize > len {
        return Err(MeshError::parse(
            line,
            format!("index {idx} out of range (1..={len})"),
        ));
    }
    Ok(idx as usize - 1)
}

/// Sample the texture at relative coordinates `(u, v)`, clamped to the
/// image bounds, returning a BGR triple. `v` grows upward in OBJ space, so
/// the row is flipped.
fn sample_texture(texture: &RgbImage, uv: Point2<f64>) -> Bgr {
    let (w, h) = texture.dimensions();
    let col = ((w as f64) * uv.x).round().clamp(0.0, (w - 1) as f64) as u32;
    let row = ((h as f64) * (1.0 - uv.y)).round().clamp(0.0, (h - 1) as f64) as u32;
    let px = texture.get_pixel(col, row);
    [px[2], px[1], px[0]]
}

/// Parse OBJ text into a (not yet normalized) mesh asset.
///
/// Supported statements: `v`, `vt`, `f`, `usemtl`; `vn`, `mtllib`, object
/// and group statements are ignored here (`load_obj` resolves `mtllib`
/// before calling). Per-vertex colors are only produced when a texture is
/// supplied. Faces with fewer than 3 points are dropped with a warning.
pub fn parse_obj(
    text: &str,
    texture: Option<&RgbImage>,
    materials: HashMap<String, Material>,
) -> Result<MeshAsset, MeshError> {
    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut tex_coords: Vec<Point2<f64>> = Vec::new();
    let mut faces: Vec<Face> = Vec::new();
    let mut active_material: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&rest, line_no)?;
                vertices.push(Point3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&rest, line_no)?;
                tex_coords.push(Point2::new(u, v));
            }
            "usemtl" => {
                active_material = rest.first().map(|s| s.to_string());
            }
            "f" => {
                let mut points = Vec::with_capacity(rest.len());
                let mut colors = Vec::new();
                for token in &rest {
                    let mut elements = token.split('/');
                    let vi = resolve_index(
                        elements.next().unwrap_or_default(),
                        vertices.len(),
                        line_no,
                    )?;
                    points.push(vertices[vi]);
                    if let (Some(tex), Some(vt_token)) = (texture, elements.next()) {
                        if !vt_token.is_empty() {
                            let ti = resolve_index(vt_token, tex_coords.len(), line_no)?;
                            colors.push(sample_texture(tex, tex_coords[ti]));
                        }
                    }
                }
                if points.len() < 3 {
                    warn!("dropping face with {} point(s) at line {line_no}", points.len());
                    continue;
                }
                faces.push(Face {
                    points,
                    colors: (!colors.is_empty()).then_some(colors),
                    material: active_material.clone(),
                });
            }
            _ => {}
        }
    }

    Ok(MeshAsset {
        vertices,
        faces,
        materials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgb;
    use std::io::Write;

    const SQUARE_OBJ: &str = "\
# unit square on the xy plane
v -2 -2 0
v 2 -2 0
v 2 2 0
v -2 2 0
f 1 2 3 4
";

    #[test]
    fn parses_vertices_and_quad_face() {
        let mesh = parse_obj(SQUARE_OBJ, None, HashMap::new()).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.faces[0].points.len(), 4);
        assert!(mesh.faces[0].colors.is_none());
    }

    #[test]
    fn usemtl_tags_following_faces() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl skin\nf 1 2 3\n";
        let mesh = parse_obj(text, None, HashMap::new()).unwrap();
        assert_eq!(mesh.faces[0].material.as_deref(), Some("skin"));
    }

    #[test]
    fn out_of_range_vertex_index_is_an_error() {
        let text = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            parse_obj(text, None, HashMap::new()),
            Err(MeshError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn short_faces_are_dropped_not_fatal() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf 1 2 3\n";
        let mesh = parse_obj(text, None, HashMap::new()).unwrap();
        assert_eq!(mesh.faces.len(), 1);
    }

    #[test]
    fn texture_coordinates_become_vertex_colors() {
        // 2x2 texture: top row red/green, bottom row blue/white (RGB).
        let mut tex = RgbImage::new(2, 2);
        tex.put_pixel(0, 0, Rgb([255, 0, 0]));
        tex.put_pixel(1, 0, Rgb([0, 255, 0]));
        tex.put_pixel(0, 1, Rgb([0, 0, 255]));
        tex.put_pixel(1, 1, Rgb([255, 255, 255]));

        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 1
vt 1 1
vt 0 0
f 1/1 2/2 3/3
";
        let mesh = parse_obj(text, Some(&tex), HashMap::new()).unwrap();
        let colors = mesh.faces[0].colors.as_ref().unwrap();
        // v=1 maps to the top row, colors come back BGR.
        assert_eq!(colors[0], [0, 0, 255]);
        assert_eq!(colors[1], [0, 255, 0]);
    }

    #[test]
    fn texture_sampling_clamps_out_of_range_coordinates() {
        let mut tex = RgbImage::new(2, 2);
        tex.put_pixel(1, 1, Rgb([10, 20, 30]));
        let c = sample_texture(&tex, Point2::new(1.5, -0.5));
        assert_eq!(c, [30, 20, 10]);
    }

    #[test]
    fn load_obj_resolves_mtllib_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let mtl_path = dir.path().join("cube.mtl");
        let obj_path = dir.path().join("cube.obj");
        let mut mtl = std::fs::File::create(&mtl_path).unwrap();
        writeln!(mtl, "newmtl body\nKd 0 0 1").unwrap();
        let mut obj = std::fs::File::create(&obj_path).unwrap();
        writeln!(obj, "mtllib cube.mtl").unwrap();
        writeln!(obj, "{SQUARE_OBJ}").unwrap();

        let mesh = load_obj(&obj_path, &ObjLoadOptions::default()).unwrap();
        assert_eq!(mesh.materials["body"].diffuse, [255, 0, 0]);
        // Furthest corner (2, 2) scaled onto the unit circle.
        let far = mesh.faces[0].points[2];
        assert_relative_eq!((far.x * far.x + far.y * far.y).sqrt(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_obj(Path::new("/nonexistent/x.obj"), &ObjLoadOptions::default());
        assert!(matches!(err, Err(MeshError::Io { .. })));
    }
}
