//! Mesh assets for marker AR overlays.
//!
//! Parses the Wavefront OBJ/MTL subset the compositor needs (vertices,
//! faces, diffuse materials, texture-sampled vertex colors) and normalizes
//! meshes into a canonical unit scale so render-time autoscaling is
//! independent of the source model's native units.

mod error;
mod mtl;
mod obj;
mod types;

pub use error::MeshError;
pub use mtl::parse_mtl;
pub use obj::{load_obj, parse_obj, ObjLoadOptions};
pub use types::{Face, Material, MeshAsset, NormalizeAxes};
