use crate::message::Color;
use crate::replay::StrokeReplay;
use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

pub const DEFAULT_CANVAS_WIDTH: u32 = 1920;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1080;

/// Raster surface that stroke segments are replayed onto.
#[derive(Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// A white surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0xFF, 0xFF, 0xFF, 0xFF])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width() && y < self.height() {
            let Rgba([r, g, b, _]) = *self.image.get_pixel(x, y);
            Some(Color::rgb(r, g, b))
        } else {
            None
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Encodes the surface as PNG, ready for a save request.
    pub fn to_png(&self) -> ImageResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)
    }

    /// Paints one pixel, blending `opacity` percent of `color` over what is
    /// already there. Coordinates outside the surface are ignored.
    pub(crate) fn blend(&mut self, x: i64, y: i64, color: Color, opacity: u8) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let op = opacity.min(100) as u32;
        let mix = |src: u8, dst: u8| -> u8 {
            ((src as u32 * op + dst as u32 * (100 - op) + 50) / 100) as u8
        };
        let Rgba([r, g, b, _]) = *pixel;
        *pixel = Rgba([
            mix(color.r(), r),
            mix(color.g(), g),
            mix(color.b(), b),
            0xFF,
        ]);
    }
}

impl std::default::Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl StrokeReplay for Canvas {
    fn canvas(&mut self) -> &mut Canvas {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_start_white() {
        let canvas = Canvas::new(4, 3);
        assert_eq!(canvas.pixel(3, 2), Some(Color::WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn it_should_blend_by_opacity() {
        let mut canvas = Canvas::new(2, 1);
        canvas.blend(0, 0, Color::BLACK, 50);
        assert_eq!(canvas.pixel(0, 0), Some(Color::rgb(128, 128, 128)));
        canvas.blend(1, 0, Color(0xFF00_0000), 100);
        assert_eq!(canvas.pixel(1, 0), Some(Color::BLACK));
        canvas.blend(-1, 0, Color::BLACK, 100);
        canvas.blend(0, 7, Color::BLACK, 100);
    }

    #[test]
    fn it_should_encode_png() {
        let canvas = Canvas::new(8, 8);
        let png = canvas.to_png().expect("");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn it_should_export_to_a_file() {
        let dir = tempfile::tempdir().expect("");
        let path = dir.path().join("board.png");
        Canvas::new(8, 8).export(&path).expect("");
        let decoded = image::open(&path).expect("").to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
    }
}
