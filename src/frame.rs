//! Frame containers and zero-copy grayscale region views.

use std::path::Path;

use image::{imageops, GrayImage, Luma, RgbaImage};

use crate::{
    geometry::DetectionBox,
    utils::safe_cast::i32_to_u32_clamp,
    Error, Result,
};

/// One input frame: a color image and a grayscale image of identical size
#[derive(Debug, Clone)]
pub struct Frame {
    color: RgbaImage,
    gray: GrayImage,
}

impl Frame {
    /// Pair a color image with its grayscale counterpart
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the two images differ in size.
    pub fn new(color: RgbaImage, gray: GrayImage) -> Result<Self> {
        if color.dimensions() != gray.dimensions() {
            return Err(Error::InvalidInput(format!(
                "Color frame is {:?} but gray frame is {:?}",
                color.dimensions(),
                gray.dimensions()
            )));
        }
        Ok(Self { color, gray })
    }

    /// Decode an image file into a frame
    ///
    /// # Errors
    ///
    /// Returns `Image` when the file cannot be read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let color = image::open(path)?.to_rgba8();
        Ok(Self::from_color(color))
    }

    /// Build a frame from a color image, deriving the grayscale channel
    #[must_use]
    pub fn from_color(color: RgbaImage) -> Self {
        let gray = imageops::grayscale(&color);
        Self { color, gray }
    }

    /// Frame width and height
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    /// Color image
    #[must_use]
    pub fn color(&self) -> &RgbaImage {
        &self.color
    }

    /// Grayscale image
    #[must_use]
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Split into the color and grayscale images
    #[must_use]
    pub fn into_parts(self) -> (RgbaImage, GrayImage) {
        (self.color, self.gray)
    }
}

/// Borrowed rectangular view into a grayscale image.
///
/// The bounds are always clipped to the source, so reads through the view
/// never leave the underlying buffer.
#[derive(Debug, Clone, Copy)]
pub struct GrayRegion<'a> {
    source: &'a GrayImage,
    bounds: DetectionBox,
}

impl<'a> GrayRegion<'a> {
    /// View covering the whole image
    #[must_use]
    pub fn full(source: &'a GrayImage) -> Self {
        let (width, height) = source.dimensions();
        Self {
            source,
            bounds: DetectionBox::full(width, height),
        }
    }

    /// View bounded by `bounds` (in source coordinates), clipped to the source
    #[must_use]
    pub fn new(source: &'a GrayImage, bounds: DetectionBox) -> Option<Self> {
        let (width, height) = source.dimensions();
        bounds.clip_to(width, height).map(|bounds| Self { source, bounds })
    }

    /// Region bounds in source coordinates
    #[must_use]
    pub fn bounds(&self) -> DetectionBox {
        self.bounds
    }

    /// Top-left corner in source coordinates
    #[must_use]
    pub fn origin(&self) -> (i32, i32) {
        (self.bounds.x, self.bounds.y)
    }

    /// Region width
    #[must_use]
    pub fn width(&self) -> u32 {
        i32_to_u32_clamp(self.bounds.width)
    }

    /// Region height
    #[must_use]
    pub fn height(&self) -> u32 {
        i32_to_u32_clamp(self.bounds.height)
    }

    /// Pixel at region-relative `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics when `(x, y)` lies outside the region.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width() && y < self.height(), "pixel ({x}, {y}) outside region");
        let (ox, oy) = self.origin();
        self.source.get_pixel(i32_to_u32_clamp(ox) + x, i32_to_u32_clamp(oy) + y)[0]
    }

    /// Row slices of the region, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let source: &'a GrayImage = self.source;
        let raw: &'a [u8] = source.as_raw();
        let stride = source.width() as usize;
        let x0 = i32_to_u32_clamp(self.bounds.x) as usize;
        let y0 = i32_to_u32_clamp(self.bounds.y) as usize;
        let width = self.width() as usize;
        (y0..y0 + self.height() as usize).map(move |row| {
            let start = row * stride + x0;
            &raw[start..start + width]
        })
    }

    /// Copy the region into an owned image
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let mut data = Vec::with_capacity(self.width() as usize * self.height() as usize);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        GrayImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| GrayImage::from_fn(self.width(), self.height(), |x, y| Luma([self.pixel(x, y)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + y * width) % 251) as u8]))
    }

    #[test]
    fn test_frame_dimension_mismatch() {
        let result = Frame::new(RgbaImage::new(4, 4), GrayImage::new(4, 5));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_frame_from_color() {
        let frame = Frame::from_color(RgbaImage::from_pixel(8, 6, image::Rgba([255, 255, 255, 255])));
        assert_eq!(frame.gray().dimensions(), (8, 6));
        assert_eq!(frame.gray().get_pixel(3, 3)[0], 255);
    }

    #[test]
    fn test_region_is_view_of_source() {
        let image = gradient(20, 10);
        let region = GrayRegion::new(&image, DetectionBox::new(5, 2, 4, 3)).unwrap();

        assert_eq!((region.width(), region.height()), (4, 3));
        assert_eq!(region.pixel(0, 0), image.get_pixel(5, 2)[0]);
        assert_eq!(region.pixel(3, 2), image.get_pixel(8, 4)[0]);

        let copy = region.to_image();
        assert_eq!(copy.dimensions(), (4, 3));
        assert_eq!(copy.get_pixel(1, 1)[0], image.get_pixel(6, 3)[0]);
    }

    #[test]
    fn test_region_clipped_to_source() {
        let image = gradient(20, 10);
        let region = GrayRegion::new(&image, DetectionBox::new(15, 5, 10, 10)).unwrap();
        assert_eq!(region.bounds(), DetectionBox::new(15, 5, 5, 5));
        assert!(GrayRegion::new(&image, DetectionBox::new(30, 0, 5, 5)).is_none());
    }
}
