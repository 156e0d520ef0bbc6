use std::path::Path;

use anyhow::{ensure, Context as _};

use crate::core::{Managed, Object};
use crate::device::PixelFormat;

/// CPU-side 8-bit image, rows stored bottom-to-top as GL expects them.
pub struct Image {
    object: Object,
    width: u32,
    height: u32,
    bpp: u32,
    data: Vec<u8>,
}

impl Image {
    /// Zero-filled image with `bpp` bytes per pixel.
    pub fn new(width: u32, height: u32, bpp: u32) -> Self {
        let len = width as usize * height as usize * bpp as usize;
        Self {
            object: Object::new("Image"),
            width,
            height,
            bpp,
            data: vec![0; len],
        }
    }

    /// Wraps existing pixel bytes. `data` must hold exactly `width * height * bpp` bytes.
    pub fn from_raw(width: u32, height: u32, bpp: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        ensure!(
            (1..=4).contains(&bpp),
            "unsupported pixel size: {bpp} bytes per pixel"
        );
        let expected = width as usize * height as usize * bpp as usize;
        ensure!(
            data.len() == expected,
            "image data is {} bytes, {width}x{height}x{bpp} needs {expected}",
            data.len()
        );
        Ok(Self {
            object: Object::new("Image"),
            width,
            height,
            bpp,
            data,
        })
    }

    /// Decodes a PNG or TGA file.
    ///
    /// Three-channel sources stay RGB; everything else is expanded to RGBA.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?
            // GL samples from the bottom row up.
            .flipv();

        let image = if decoded.color().channel_count() == 3 {
            let rgb = decoded.to_rgb8();
            let (w, h) = rgb.dimensions();
            Self::from_raw(w, h, 3, rgb.into_raw())?
        } else {
            let rgba = decoded.to_rgba8();
            let (w, h) = rgba.dimensions();
            Self::from_raw(w, h, 4, rgba.into_raw())?
        };

        log::debug!(
            "loaded {} ({}x{}, {} bpp)",
            path.display(),
            image.width,
            image.height,
            image.bpp
        );
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel.
    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Upload format: 3 bytes per pixel is RGB, anything else RGBA.
    pub fn pixel_format(&self) -> PixelFormat {
        if self.bpp == 3 {
            PixelFormat::Rgb
        } else {
            PixelFormat::Rgba
        }
    }

    /// Square with a power-of-two side between 2 and 2048.
    pub fn is_pot_square(&self) -> bool {
        self.width == self.height
            && (2..=2048).contains(&self.width)
            && self.width.is_power_of_two()
    }
}

impl Managed for Image {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bpp", &self.bpp)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero_filled() {
        let img = Image::new(4, 2, 3);
        assert_eq!(img.data().len(), 24);
        assert!(img.data().iter().all(|b| *b == 0));
        assert_eq!(img.pixel_format(), PixelFormat::Rgb);
    }

    #[test]
    fn from_raw_validates_length() {
        assert!(Image::from_raw(2, 2, 4, vec![0; 16]).is_ok());
        let err = Image::from_raw(2, 2, 4, vec![0; 15]).unwrap_err();
        assert!(err.to_string().contains("needs 16"));
        assert!(Image::from_raw(1, 1, 0, Vec::new()).is_err());
    }

    #[test]
    fn pot_square_classification() {
        assert!(Image::new(8, 8, 4).is_pot_square());
        assert!(Image::new(2048, 2048, 1).is_pot_square());
        assert!(!Image::new(1, 1, 4).is_pot_square());
        assert!(!Image::new(8, 4, 4).is_pot_square());
        assert!(!Image::new(12, 12, 4).is_pot_square());
        assert!(!Image::new(4096, 4096, 1).is_pot_square());
    }

    #[test]
    fn load_reports_missing_files() {
        let err = Image::load("does/not/exist.png").unwrap_err();
        assert!(err.to_string().contains("exist.png"));
    }
}
