use std::collections::HashMap;

use ar_overlay_core::Bgr;

use crate::{Material, MeshError};

fn parse_color(parts: &[&str], line: usize) -> Result<Bgr, MeshError> {
    if parts.len() < 3 {
        return Err(MeshError::parse(line, "color needs 3 components"));
    }
    let mut rgb = [0.0_f32; 3];
    for (slot, text) in rgb.iter_mut().zip(parts) {
        *slot = text
            .parse::<f32>()
            .map_err(|_| MeshError::parse(line, format!("invalid color component `{text}`")))?;
    }
    // MTL colors are RGB in 0..=1; frames are BGR bytes.
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Ok([to_byte(rgb[2]), to_byte(rgb[1]), to_byte(rgb[0])])
}

/// Parse the MTL subset used for face fills: `newmtl`, `Ka`, `Kd`, `Ks`, `d`.
///
/// Unknown statements are ignored. Attributes appearing before the first
/// `newmtl` are a parse error.
pub fn parse_mtl(text: &str) -> Result<HashMap<String, Material>, MeshError> {
    let mut materials = HashMap::new();
    let mut current: Option<String> = None;

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
            "newmtl" => {
                let name = rest
                    .first()
                    .ok_or_else(|| MeshError::parse(line_no, "newmtl without a name"))?;
                materials.insert(name.to_string(), Material::default());
                current = Some(name.to_string());
            }
            "Ka" | "Kd" | "Ks" | "d" => {
                let name = current
                    .as_ref()
                    .ok_or_else(|| MeshError::parse(line_no, "attribute before newmtl"))?;
                let material = materials.get_mut(name).unwrap_or_else(|| unreachable!());
                match keyword {
                    "Ka" => material.ambient = parse_color(&rest, line_no)?,
                    "Kd" => material.diffuse = parse_color(&rest, line_no)?,
                    "Ks" => material.specular = parse_color(&rest, line_no)?,
                    _ => {
                        let d: f32 = rest
                            .first()
                            .and_then(|t| t.parse().ok())
                            .ok_or_else(|| MeshError::parse(line_no, "invalid opacity"))?;
                        material.opacity = (d.clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(materials)
}
