//! Conversions between the pipeline's BGR [`FrameBuffer`] and the `image`
//! crate's RGB types, for loading camera stills and saving composited
//! frames.

use std::path::Path;

use ar_overlay_core::FrameBuffer;
use image::RgbImage;

/// Errors for frame image I/O.
#[derive(thiserror::Error, Debug)]
pub enum FrameIoError {
    #[error("failed to read or write {path}")]
    Image {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Convert a frame to an RGB image (channel order swapped).
pub fn to_rgb_image(frame: &FrameBuffer) -> RgbImage {
    let mut out = RgbImage::new(frame.width as u32, frame.height as u32);
    for (x, y, px) in out.enumerate_pixels_mut() {
        if let Some([b, g, r]) = frame.get_pixel(x as i32, y as i32) {
            px.0 = [r, g, b];
        }
    }
    out
}

/// Convert an RGB image into a BGR frame buffer.
pub fn from_rgb_image(img: &RgbImage) -> FrameBuffer {
    let mut frame = FrameBuffer::new(img.width() as usize, img.height() as usize);
    for (x, y, px) in img.enumerate_pixels() {
        let [r, g, b] = px.0;
        frame.put_pixel(x as i32, y as i32, [b, g, r]);
    }
    frame
}

/// Load an image file as a frame buffer.
pub fn load_frame(path: &Path) -> Result<FrameBuffer, FrameIoError> {
    let img = image::open(path)
        .map_err(|source| FrameIoError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    Ok(from_rgb_image(&img))
}

/// Save a frame buffer as an image file (format from the extension).
pub fn save_frame(frame: &FrameBuffer, path: &Path) -> Result<(), FrameIoError> {
    to_rgb_image(frame)
        .save(path)
        .map_err(|source| FrameIoError::Image {
            path: path.to_path_buf(),
            source,
        })
}
