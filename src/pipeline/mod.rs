//! Frame pipeline: drains queued controls, runs detection and draws overlays.

/// Hierarchical face-then-eye detection and annotation
pub mod orchestrator;

use std::sync::mpsc::Receiver;

use image::{GrayImage, RgbaImage};
use log::{debug, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    config::{Config, OverlayConfig},
    controls::{self, ControlAction, ControlHandle},
    frame::Frame,
    session::{Mode, Session},
    Result,
};

pub use self::orchestrator::{annotate, detect_hierarchy, FaceDetection};

/// Counts recorded for one processed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Zero-based index of the frame in this pipeline
    pub frame_index: u64,
    /// Mode the frame was processed in
    pub mode: Mode,
    /// Face-size threshold used, 0 when unset
    pub face_threshold: i32,
    /// Faces detected
    pub faces: usize,
    /// Eyes detected across all faces
    pub eyes: usize,
    /// Overlays drawn
    pub overlays: usize,
    /// Whether the input was returned without processing
    pub passthrough: bool,
}

/// Drives one session over a stream of frames
pub struct FramePipeline {
    session: Session,
    controls: Receiver<ControlAction>,
    handle: ControlHandle,
    rng: StdRng,
    overlay: OverlayConfig,
    frames: u64,
    last_report: Option<FrameReport>,
}

impl FramePipeline {
    /// Wrap an existing session
    #[must_use]
    pub fn new(session: Session, overlay: OverlayConfig) -> Self {
        let (handle, controls) = controls::channel();
        let rng = overlay.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            session,
            controls,
            handle,
            rng,
            overlay,
            frames: 0,
            last_report: None,
        }
    }

    /// Build the session from `config` and start loading its classifiers
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Session::from_config(config)?, config.overlay.clone()))
    }

    /// Handle for queueing control actions from other threads
    #[must_use]
    pub fn control_handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    /// The driven session
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The driven session, for direct changes between frames
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Apply every queued control action; returns how many were applied
    pub fn apply_pending_controls(&mut self) -> usize {
        let mut applied = 0;
        for action in self.controls.try_iter() {
            if let Err(e) = self.session.apply(action) {
                warn!("Control action {action:?} failed: {e}");
            }
            applied += 1;
        }
        applied
    }

    /// Detect and annotate one frame, returning the annotated color image
    pub fn process_frame(&mut self, frame: Frame) -> RgbaImage {
        let (color, gray) = frame.into_parts();
        self.run(color, &gray)
    }

    /// Detect and annotate an unchecked color/gray pair.
    ///
    /// A pair of mismatched sizes is returned unannotated.
    pub fn process(&mut self, color: RgbaImage, gray: &GrayImage) -> RgbaImage {
        if color.dimensions() != gray.dimensions() {
            warn!(
                "Color frame is {:?} but gray frame is {:?}, passing through",
                color.dimensions(),
                gray.dimensions()
            );
            self.record(FrameReport {
                frame_index: self.frames,
                mode: self.session.mode(),
                face_threshold: self.session.absolute_face_size(),
                faces: 0,
                eyes: 0,
                overlays: 0,
                passthrough: true,
            });
            return color;
        }
        self.run(color, gray)
    }

    fn run(&mut self, mut color: RgbaImage, gray: &GrayImage) -> RgbaImage {
        self.session.poll_loaded();
        self.apply_pending_controls();

        let detections = detect_hierarchy(&mut self.session, gray);
        let overlays = if self.overlay.enabled {
            annotate(&mut color, &detections, &mut self.rng, self.overlay.face_rect_thickness)
        } else {
            0
        };

        self.record(FrameReport {
            frame_index: self.frames,
            mode: self.session.mode(),
            face_threshold: self.session.absolute_face_size(),
            faces: detections.len(),
            eyes: detections.iter().map(|d| d.eyes.len()).sum(),
            overlays,
            passthrough: false,
        });
        color
    }

    fn record(&mut self, report: FrameReport) {
        debug!(
            "Frame {}: {} mode, threshold {}, {} faces, {} eyes, {} overlays",
            report.frame_index, report.mode, report.face_threshold, report.faces, report.eyes, report.overlays
        );
        self.frames += 1;
        self.last_report = Some(report);
    }

    /// Report for the most recent frame
    #[must_use]
    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Frames handled so far, passthroughs included
    #[must_use]
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Stop the session's trackers
    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }
}
