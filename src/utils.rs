//! Utility functions for box sanitation and coordinate conversions.

pub mod safe_cast;

use crate::geometry::{DetectionBox, DetectionSet};
use log::debug;

/// Clip detector output to the image it was produced on.
///
/// Boxes overhanging the border are cut back to the image; boxes with no
/// area left are dropped. Order of the surviving boxes is preserved.
#[must_use]
pub fn clip_boxes(boxes: DetectionSet, max_width: u32, max_height: u32) -> DetectionSet {
    let total = boxes.len();
    let clipped: DetectionSet = boxes
        .into_iter()
        .filter_map(|bbox| bbox.clip_to(max_width, max_height))
        .collect();

    if clipped.len() != total {
        debug!(
            "Dropped {} of {} boxes outside {}x{}",
            total - clipped.len(),
            total,
            max_width,
            max_height
        );
    }

    clipped
}

/// Translate region-relative boxes into the coordinate space of the region's parent
#[must_use]
pub fn translate_boxes(boxes: DetectionSet, origin: (i32, i32)) -> DetectionSet {
    boxes
        .into_iter()
        .map(|bbox: DetectionBox| bbox.translate(origin.0, origin.1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_boxes() {
        let boxes = vec![
            DetectionBox::new(10, 10, 50, 50),
            DetectionBox::new(180, 180, 40, 40),
            DetectionBox::new(300, 300, 10, 10),
        ];

        let clipped = clip_boxes(boxes, 200, 200);

        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped[0], DetectionBox::new(10, 10, 50, 50));
        assert_eq!(clipped[1], DetectionBox::new(180, 180, 20, 20));
        for bbox in &clipped {
            assert!(bbox.right() <= 200);
            assert!(bbox.bottom() <= 200);
        }
    }

    #[test]
    fn test_clip_boxes_empty() {
        assert!(clip_boxes(vec![], 200, 200).is_empty());
    }

    #[test]
    fn test_clip_boxes_drops_degenerate() {
        let boxes = vec![DetectionBox::new(5, 5, 0, 10), DetectionBox::new(5, 5, 10, -3)];
        assert!(clip_boxes(boxes, 200, 200).is_empty());
    }

    #[test]
    fn test_translate_boxes() {
        let boxes = vec![DetectionBox::new(10, 10, 20, 20), DetectionBox::new(60, 12, 20, 20)];
        let translated = translate_boxes(boxes, (50, 50));
        assert_eq!(translated[0], DetectionBox::new(60, 60, 20, 20));
        assert_eq!(translated[1], DetectionBox::new(110, 62, 20, 20));
    }
}
