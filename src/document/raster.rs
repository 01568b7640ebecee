use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GenericImageView;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageError(String);

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unreadable image: {}", self.0)
    }
}

impl std::error::Error for ImageError {}

/// Pixel data ready for a PDF image XObject: Flate-compressed 8-bit RGB plus
/// an optional Flate-compressed 8-bit alpha channel for the soft mask.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl RasterImage {
    /// Decode any format the `image` crate recognizes from its magic bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory(bytes).map_err(|e| ImageError(e.to_string()))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError("image has no pixels".to_string()));
        }

        let has_alpha = img.color().has_alpha();
        let rgba = img.to_rgba8();

        let pixel_count = (width as usize) * (height as usize);
        let mut rgb_buf = Vec::with_capacity(pixel_count * 3);
        let mut alpha_buf = Vec::with_capacity(if has_alpha { pixel_count } else { 0 });
        let mut translucent = false;

        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb_buf.extend_from_slice(&[r, g, b]);
            if has_alpha {
                alpha_buf.push(a);
                translucent |= a != u8::MAX;
            }
        }

        let alpha = if translucent {
            Some(deflate(&alpha_buf)?)
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            rgb: deflate(&rgb_buf)?,
            alpha,
        })
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ImageError(format!("compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| ImageError(format!("compression failed: {e}")))
}
