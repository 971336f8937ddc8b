//! Helper types and functions for tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use face_eye_detect::{
    config::OverlayConfig,
    detector::{CascadeDetector, CascadeMatcher, DetectorSlot, MultiScaleParams, ObjectTracker, SlotRole},
    frame::{Frame, GrayRegion},
    geometry::{DetectionBox, DetectionSet},
    Result,
};
use image::{Rgba, RgbaImage};

/// Background color of generated frames
pub const BACKGROUND: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// One recorded matcher invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherCall {
    /// Region the matcher ran on, in source coordinates
    pub bounds: DetectionBox,
    /// Parameters it was called with
    pub params: MultiScaleParams,
}

/// Cascade matcher answering from a script and recording every call
pub struct ScriptedMatcher {
    script: Mutex<VecDeque<DetectionSet>>,
    fallback: DetectionSet,
    by_width: Vec<(u32, DetectionSet)>,
    empty: bool,
    calls: Mutex<Vec<MatcherCall>>,
}

impl ScriptedMatcher {
    /// Matcher returning `boxes` on every call
    pub fn returning(boxes: DetectionSet) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: boxes,
            by_width: Vec::new(),
            empty: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Matcher returning each set in turn, then nothing
    pub fn sequence(script: Vec<DetectionSet>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Vec::new(),
            by_width: Vec::new(),
            empty: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Matcher answering by region width, nothing for other widths
    pub fn for_width(answers: Vec<(u32, DetectionSet)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Vec::new(),
            by_width: answers,
            empty: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Matcher without classifier data
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Vec::new(),
            by_width: Vec::new(),
            empty: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<MatcherCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CascadeMatcher for ScriptedMatcher {
    fn detect_multi_scale(&self, image: &GrayRegion<'_>, params: &MultiScaleParams) -> Result<DetectionSet> {
        self.calls.lock().unwrap().push(MatcherCall {
            bounds: image.bounds(),
            params: *params,
        });
        if let Some((_, boxes)) = self.by_width.iter().find(|(width, _)| *width == image.width()) {
            return Ok(boxes.clone());
        }
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// What a recording tracker saw
#[derive(Debug, Default)]
pub struct TrackerLog {
    /// Effective starts
    pub starts: usize,
    /// Effective stops
    pub stops: usize,
    /// Bounds of every region passed to `detect`
    pub detects: Vec<DetectionBox>,
    /// Every minimum size set, in order
    pub min_sizes: Vec<i32>,
}

/// Tracker returning fixed boxes and logging its lifecycle
pub struct RecordingTracker {
    boxes: DetectionSet,
    running: bool,
    min_size: i32,
    log: Arc<Mutex<TrackerLog>>,
}

impl RecordingTracker {
    /// Tracker returning `boxes`, plus the shared log it writes to
    pub fn new(boxes: DetectionSet) -> (Self, Arc<Mutex<TrackerLog>>) {
        let log = Arc::new(Mutex::new(TrackerLog::default()));
        (
            Self {
                boxes,
                running: false,
                min_size: 0,
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl ObjectTracker for RecordingTracker {
    fn start(&mut self) -> Result<bool> {
        if self.running {
            return Ok(false);
        }
        self.running = true;
        self.log.lock().unwrap().starts += 1;
        Ok(true)
    }

    fn stop(&mut self) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }
        self.running = false;
        self.log.lock().unwrap().stops += 1;
        Ok(true)
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn set_min_object_size(&mut self, size: i32) -> Result<()> {
        self.min_size = size;
        self.log.lock().unwrap().min_sizes.push(size);
        Ok(())
    }

    fn min_object_size(&self) -> i32 {
        self.min_size
    }

    fn detect(&mut self, image: &GrayRegion<'_>) -> Result<DetectionSet> {
        self.log.lock().unwrap().detects.push(image.bounds());
        Ok(self.boxes.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Slot with a scripted cascade and a recording tracker
pub fn scripted_slot(role: SlotRole, matcher: &Arc<ScriptedMatcher>, tracker: RecordingTracker) -> DetectorSlot {
    let matcher: Arc<dyn CascadeMatcher> = matcher.clone();
    DetectorSlot::new(role, Some(CascadeDetector::new(matcher)), Some(Box::new(tracker)))
}

/// Slot with only a scripted cascade
pub fn cascade_slot(role: SlotRole, matcher: &Arc<ScriptedMatcher>) -> DetectorSlot {
    let matcher: Arc<dyn CascadeMatcher> = matcher.clone();
    DetectorSlot::new(role, Some(CascadeDetector::new(matcher)), None)
}

/// Uniform frame of the given size
pub fn blank_frame(width: u32, height: u32) -> Frame {
    Frame::from_color(RgbaImage::from_pixel(width, height, BACKGROUND))
}

/// Overlay configuration with a fixed seed
pub fn seeded_overlay() -> OverlayConfig {
    OverlayConfig {
        seed: Some(42),
        ..OverlayConfig::default()
    }
}
