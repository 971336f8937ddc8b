//! Face-then-eye detection over one frame and the drawing that follows it.

use image::{GrayImage, RgbaImage};
use log::{trace, warn};
use rand::Rng;

use crate::{
    constants::EYE_MIN_SIZE,
    detector::DetectorSlot,
    frame::GrayRegion,
    geometry::{DetectionBox, DetectionSet},
    overlay::{draw_face_box, OverlaySpec},
    session::{Mode, Session},
    utils::{clip_boxes, translate_boxes},
};

/// One face and the eyes found inside it, in frame coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceDetection {
    /// Face box, clipped to the frame
    pub face: DetectionBox,
    /// Eye boxes, each inside `face`
    pub eyes: DetectionSet,
}

// Run the slot's active detector; anything short of a ready detector is an empty result.
fn run_slot(slot: &mut DetectorSlot, mode: Mode, image: &GrayRegion<'_>, min_object_size: i32) -> DetectionSet {
    let role = slot.role();
    let Some(ready) = slot.active(mode).map(|detector| detector.is_ready()) else {
        trace!("No {role} detector loaded for {mode} mode");
        return DetectionSet::new();
    };
    if !ready {
        slot.mark_not_ready(mode);
        return DetectionSet::new();
    }
    slot.mark_ready(mode);

    let Some(mut detector) = slot.active(mode) else {
        return DetectionSet::new();
    };
    match detector.detect(image, min_object_size) {
        Ok(boxes) => boxes,
        Err(e) => {
            warn!("{role} {} failed: {e}", detector.kind());
            DetectionSet::new()
        }
    }
}

/// Detect faces in `gray`, then eyes inside each face.
///
/// Derives the face-size threshold for this frame height first when the
/// session has none. Eyes are only searched inside face regions.
pub fn detect_hierarchy(session: &mut Session, gray: &GrayImage) -> Vec<FaceDetection> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let face_threshold = session.ensure_face_threshold(height);
    let mode = session.mode();
    let (face_slot, eye_slot) = session.slots_mut();

    let faces = run_slot(face_slot, mode, &GrayRegion::full(gray), face_threshold);
    let faces = clip_boxes(faces, width, height);

    let mut detections = Vec::with_capacity(faces.len());
    for face in faces {
        let Some(view) = GrayRegion::new(gray, face) else {
            continue;
        };
        let eyes = run_slot(eye_slot, mode, &view, EYE_MIN_SIZE);
        let eyes = translate_boxes(clip_boxes(eyes, view.width(), view.height()), view.origin());
        detections.push(FaceDetection {
            face: view.bounds(),
            eyes,
        });
    }

    trace!(
        "Detected {} faces and {} eyes",
        detections.len(),
        detections.iter().map(|d| d.eyes.len()).sum::<usize>()
    );
    detections
}

/// Draw every face rectangle and one randomized overlay per eye; returns the overlay count
pub fn annotate<R: Rng + ?Sized>(
    color: &mut RgbaImage,
    detections: &[FaceDetection],
    rng: &mut R,
    face_rect_thickness: u32,
) -> usize {
    let mut overlays = 0;
    for detection in detections {
        draw_face_box(color, &detection.face, face_rect_thickness);
        for eye in &detection.eyes {
            if let Some(spec) = OverlaySpec::synthesize(eye, rng) {
                spec.draw(color);
                overlays += 1;
            }
        }
    }
    overlays
}
