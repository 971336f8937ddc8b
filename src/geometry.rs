//! Detection boxes and the rectangle arithmetic the pipeline relies on.

use imageproc::rect::Rect;

use crate::utils::safe_cast::{i32_to_u32_clamp, u32_to_i32_saturating};

/// Axis-aligned detection rectangle in pixel coordinates.
///
/// Coordinates are relative to the image the box was detected on; the
/// orchestrator translates eye boxes into frame space before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DetectionBox {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

/// Ordered boxes produced by one detector invocation
pub type DetectionSet = Vec<DetectionBox>;

impl DetectionBox {
    /// Create a new detection box
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Box covering a whole `width` x `height` image
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, u32_to_i32_saturating(width), u32_to_i32_saturating(height))
    }

    /// True when the box has no area
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Area in pixels, zero for empty boxes
    #[must_use]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    /// Integer center point
    #[must_use]
    pub const fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Shift the box by `(dx, dy)`
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.width, self.height)
    }

    /// True when `other` lies entirely inside this box
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Overlapping part of two boxes, if any
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let clipped = Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y));
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Clip the box to a `width` x `height` image, `None` if nothing is left
    #[must_use]
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
        self.intersection(&Self::full(width, height))
    }

    /// Intersection over union of two boxes
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Box areas are far below f64 precision limits
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection(other).map_or(0, |b| b.area());
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }

    /// Drawing rectangle, `None` for empty boxes
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect> {
        (!self.is_empty())
            .then(|| Rect::at(self.x, self.y).of_size(i32_to_u32_clamp(self.width), i32_to_u32_clamp(self.height)))
    }
}
