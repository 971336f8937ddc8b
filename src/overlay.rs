//! Wandering-pupil overlay drawn over each detected eye.

use image::RgbaImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use rand::Rng;

use crate::{
    constants::{FACE_RECT_COLOR, IRIS_COLOR, PUPIL_COLOR, PUPIL_OFFSET_DIVISOR},
    geometry::DetectionBox,
    utils::safe_cast::f32_to_i32_clamp,
};

/// Iris and pupil circles for one eye in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySpec {
    /// Iris center in frame coordinates
    pub iris_center: (i32, i32),
    /// Iris radius in pixels
    pub iris_radius: i32,
    /// Pupil displacement from the iris center
    pub pupil_offset: (i32, i32),
    /// Pupil radius in pixels, always below the iris radius
    pub pupil_radius: i32,
}

impl OverlaySpec {
    /// Randomized overlay for an eye box in frame coordinates.
    ///
    /// Returns `None` when the box is too small to hold a pupil.
    pub fn synthesize<R: Rng + ?Sized>(eye: &DetectionBox, rng: &mut R) -> Option<Self> {
        let iris_radius = (eye.width + eye.height) / 4;
        let third = iris_radius / 3;
        if third <= 0 {
            return None;
        }

        let pupil_radius = rng.gen_range(third..2 * third);

        #[allow(clippy::cast_precision_loss)]
        let reach = (iris_radius - pupil_radius) as f32 / PUPIL_OFFSET_DIVISOR;
        let max_offset = f32_to_i32_clamp(reach, 0, iris_radius);
        let pupil_offset = (
            rng.gen_range(-max_offset..=max_offset),
            rng.gen_range(-max_offset..=max_offset),
        );

        Some(Self {
            iris_center: eye.center(),
            iris_radius,
            pupil_offset,
            pupil_radius,
        })
    }

    /// Pupil center in frame coordinates
    #[must_use]
    pub const fn pupil_center(&self) -> (i32, i32) {
        (
            self.iris_center.0 + self.pupil_offset.0,
            self.iris_center.1 + self.pupil_offset.1,
        )
    }

    /// Fill the iris, then the pupil on top of it
    pub fn draw(&self, image: &mut RgbaImage) {
        draw_filled_circle_mut(image, self.iris_center, self.iris_radius, IRIS_COLOR);
        draw_filled_circle_mut(image, self.pupil_center(), self.pupil_radius, PUPIL_COLOR);
    }
}

/// Outline a face box with lines `thickness` pixels wide, centered on the box edge
pub fn draw_face_box(image: &mut RgbaImage, face: &DetectionBox, thickness: u32) {
    let half = i32::try_from(thickness / 2).unwrap_or(0);
    for step in 0..thickness {
        let grow = half - i32::try_from(step).unwrap_or(half);
        let outline = DetectionBox::new(
            face.x - grow,
            face.y - grow,
            face.width + 2 * grow,
            face.height + 2 * grow,
        );
        if let Some(rect) = outline.to_rect() {
            draw_hollow_rect_mut(image, rect, FACE_RECT_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_iris_geometry() {
        let mut rng = StdRng::seed_from_u64(7);
        let spec = OverlaySpec::synthesize(&DetectionBox::new(60, 60, 20, 20), &mut rng).unwrap();

        assert_eq!(spec.iris_center, (70, 70));
        assert_eq!(spec.iris_radius, 10);
        assert!((3..6).contains(&spec.pupil_radius));
    }

    #[test]
    fn test_tiny_eye_has_no_overlay() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(OverlaySpec::synthesize(&DetectionBox::new(0, 0, 5, 5), &mut rng).is_none());
        assert!(OverlaySpec::synthesize(&DetectionBox::new(0, 0, 0, 0), &mut rng).is_none());
    }

    #[test]
    fn test_draw_paints_iris_and_pupil() {
        let mut image = RgbaImage::from_pixel(100, 100, Rgba([10, 20, 30, 255]));
        let spec = OverlaySpec {
            iris_center: (50, 50),
            iris_radius: 12,
            pupil_offset: (0, 0),
            pupil_radius: 4,
        };
        spec.draw(&mut image);

        assert_eq!(*image.get_pixel(50, 50), PUPIL_COLOR);
        assert_eq!(*image.get_pixel(50, 40), IRIS_COLOR);
        assert_eq!(*image.get_pixel(5, 5), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_face_box_outline() {
        let mut image = RgbaImage::new(200, 200);
        draw_face_box(&mut image, &DetectionBox::new(50, 50, 100, 100), 3);

        assert_eq!(*image.get_pixel(50, 100), FACE_RECT_COLOR);
        assert_eq!(*image.get_pixel(49, 100), FACE_RECT_COLOR);
        assert_eq!(*image.get_pixel(51, 100), FACE_RECT_COLOR);
        assert_eq!(*image.get_pixel(100, 100), Rgba([0, 0, 0, 0]));
    }

    proptest! {
        #[test]
        fn prop_pupil_stays_inside_iris(
            seed in any::<u64>(),
            width in 0i32..400,
            height in 0i32..400,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(spec) = OverlaySpec::synthesize(&DetectionBox::new(0, 0, width, height), &mut rng) {
                let third = spec.iris_radius / 3;
                prop_assert!(spec.pupil_radius < spec.iris_radius);
                prop_assert!(spec.pupil_radius >= third && spec.pupil_radius < 2 * third);

                let bound = f64::from(spec.iris_radius - spec.pupil_radius) / f64::from(PUPIL_OFFSET_DIVISOR);
                prop_assert!(f64::from(spec.pupil_offset.0.abs()) <= bound);
                prop_assert!(f64::from(spec.pupil_offset.1.abs()) <= bound);
            } else {
                prop_assert!((width + height) / 4 / 3 == 0);
            }
        }
    }
}
