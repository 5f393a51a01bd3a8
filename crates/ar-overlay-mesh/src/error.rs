use std::path::PathBuf;

/// Errors raised while loading or normalizing a mesh asset.
///
/// These are registration-time failures: a mesh that fails to load is never
/// retried per frame.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("failed to decode texture {path}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("mesh has no faces")]
    EmptyMesh,

    #[error("cannot normalize: furthest vertex is at the origin")]
    DegenerateScale,
}

impl MeshError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
