//! Session state: detection mode, face-size threshold and the detector slots.
//!
//! All mutation goes through `&mut self`, so mode changes and threshold
//! updates can never interleave with frame processing. Other threads reach a
//! running session through [`crate::controls::ControlHandle`].

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    constants::{DEFAULT_RELATIVE_FACE_SIZE, EYE_MIN_SIZE, FACE_SIZE_UNSET},
    controls::ControlAction,
    detector::{loader::SlotLoader, DetectorSlot, SlotRole},
    utils::safe_cast::f32_to_i32_clamp,
    Error, Result,
};

/// Which detector variant answers for each slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Stateless multi-scale cascade on every frame
    #[default]
    Cascade,
    /// Stateful tracker with background scanning
    Tracked,
}

impl Mode {
    /// The other mode
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Cascade => Self::Tracked,
            Self::Tracked => Self::Cascade,
        }
    }

    /// Title shown on the mode toggle
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cascade => "Cascade",
            Self::Tracked => "Cascade (tracking)",
        }
    }

    /// Name used in configuration and on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Tracked => "tracked",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "tracked" | "tracking" => Ok(Self::Tracked),
            other => Err(Error::InvalidInput(format!("Unknown detection mode: {other}"))),
        }
    }
}

/// Explicit per-session context
pub struct Session {
    face: DetectorSlot,
    eye: DetectorSlot,
    mode: Mode,
    relative_face_size: f32,
    absolute_face_size: i32,
    loader: Option<SlotLoader>,
}

impl Session {
    /// Session in cascade mode with both slots not yet loaded
    #[must_use]
    pub fn new() -> Self {
        Self::with_slots(DetectorSlot::unloaded(SlotRole::Face), DetectorSlot::unloaded(SlotRole::Eye))
    }

    /// Session in cascade mode over already loaded slots
    #[must_use]
    pub fn with_slots(face: DetectorSlot, eye: DetectorSlot) -> Self {
        Self {
            face,
            eye,
            mode: Mode::Cascade,
            relative_face_size: DEFAULT_RELATIVE_FACE_SIZE,
            absolute_face_size: FACE_SIZE_UNSET,
            loader: None,
        }
    }

    /// Session configured from `config`, loading its classifiers in the background
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the loader
    /// thread cannot be spawned. Classifier load failures are not errors.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let mut session = Self::new();
        session.set_relative_face_size(config.detection.relative_face_size)?;
        session.set_mode(config.detection.mode)?;
        session.attach_loader(SlotLoader::spawn(&config.cascades, &config.tracker)?);
        Ok(session)
    }

    /// Take slots from `loader` as they finish loading
    pub fn attach_loader(&mut self, loader: SlotLoader) {
        self.loader = Some(loader);
    }

    /// Install every slot finished since the last call; returns how many
    pub fn poll_loaded(&mut self) -> usize {
        let mut installed = 0;
        while let Some(slot) = self.loader.as_mut().and_then(SlotLoader::try_next) {
            self.install_slot(slot);
            installed += 1;
        }
        self.release_finished_loader();
        installed
    }

    /// Block until the loader delivered every slot or `timeout` elapsed
    pub fn wait_for_slots(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut installed = 0;
        while let Some(slot) = self.loader.as_mut().and_then(|loader| loader.next_before(deadline)) {
            self.install_slot(slot);
            installed += 1;
        }
        if self.loader.as_ref().is_some_and(|loader| !loader.is_finished()) {
            warn!("Detector slots still loading after {timeout:?}");
        }
        self.release_finished_loader();
        installed
    }

    fn release_finished_loader(&mut self) {
        if self.loader.as_ref().is_some_and(SlotLoader::is_finished) {
            if let Some(mut loader) = self.loader.take() {
                loader.join();
                debug!("Slot loader finished");
            }
        }
    }

    /// Replace the slot for `slot.role()`, bringing it up to the current mode
    pub fn install_slot(&mut self, mut slot: DetectorSlot) {
        let role = slot.role();
        if self.mode == Mode::Tracked {
            if let Err(e) = Self::enter_tracked(&mut slot, self.absolute_face_size) {
                error!("Failed to start {role} tracker on install: {e}");
            }
        }

        let previous = match role {
            SlotRole::Face => std::mem::replace(&mut self.face, slot),
            SlotRole::Eye => std::mem::replace(&mut self.eye, slot),
        };
        drop(previous);
        info!("Installed {role} detector slot");
    }

    // Start the slot's tracker and apply the minimum size its role uses.
    fn enter_tracked(slot: &mut DetectorSlot, absolute_face_size: i32) -> Result<()> {
        slot.start_tracker()?;
        match slot.role() {
            SlotRole::Face if absolute_face_size > 0 => slot.set_tracker_min_size(absolute_face_size),
            SlotRole::Face => Ok(()),
            SlotRole::Eye => slot.set_tracker_min_size(EYE_MIN_SIZE),
        }
    }

    /// Switch detection mode; returns `false` when `mode` is already active
    ///
    /// # Errors
    ///
    /// Returns the first tracker start or stop failure. The mode is switched
    /// and both slots are attempted regardless.
    pub fn set_mode(&mut self, mode: Mode) -> Result<bool> {
        if mode == self.mode {
            return Ok(false);
        }
        self.mode = mode;
        info!("Detection mode set to {mode}");

        let (face, eye) = match mode {
            Mode::Tracked => (
                Self::enter_tracked(&mut self.face, self.absolute_face_size),
                Self::enter_tracked(&mut self.eye, self.absolute_face_size),
            ),
            Mode::Cascade => (
                self.face.stop_tracker().map(|_| ()),
                self.eye.stop_tracker().map(|_| ()),
            ),
        };
        face?;
        eye?;
        Ok(true)
    }

    /// Store a new face size fraction and invalidate the absolute threshold
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a fraction outside 0.0-1.0.
    pub fn set_relative_face_size(&mut self, fraction: f32) -> Result<()> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidInput(format!(
                "Relative face size must be between 0.0 and 1.0, got {fraction}"
            )));
        }
        self.relative_face_size = fraction;
        self.absolute_face_size = FACE_SIZE_UNSET;
        debug!("Relative face size set to {fraction}");
        Ok(())
    }

    /// Apply one queued control action
    ///
    /// # Errors
    ///
    /// Propagates failures from the mode or face-size change.
    pub fn apply(&mut self, action: ControlAction) -> Result<()> {
        debug!("Applying control action: {}", action.label(self.mode));
        match action {
            ControlAction::SetFaceSize(preset) => self.set_relative_face_size(preset.fraction()),
            ControlAction::ToggleMode => self.set_mode(self.mode.toggled()).map(|_| ()),
            ControlAction::SetMode(mode) => self.set_mode(mode).map(|_| ()),
        }
    }

    /// Absolute face threshold for a frame of `height`, derived when unset.
    ///
    /// Every recomputed threshold is pushed to the face tracker, even while
    /// it runs, so no earlier floor survives a fraction change. A threshold
    /// that rounds to 0 stays unset and clears the tracker floor.
    pub fn ensure_face_threshold(&mut self, height: u32) -> i32 {
        if self.absolute_face_size == FACE_SIZE_UNSET && height > 0 {
            #[allow(clippy::cast_precision_loss)]
            let scaled = (height as f32 * self.relative_face_size).round();
            let size = f32_to_i32_clamp(scaled, 0, i32::MAX);
            if size > 0 {
                self.absolute_face_size = size;
                debug!("Face size threshold set to {size}px for height {height}");
            }
            let current = self.face.tracker().map(|tracker| tracker.min_object_size());
            if current.is_some_and(|current| current != self.absolute_face_size) {
                if let Err(e) = self.face.set_tracker_min_size(self.absolute_face_size) {
                    error!("Failed to update face tracker minimum size: {e}");
                }
            }
        }
        self.absolute_face_size
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Face size as a fraction of frame height
    #[must_use]
    pub fn relative_face_size(&self) -> f32 {
        self.relative_face_size
    }

    /// Absolute face threshold in pixels, 0 while unset
    #[must_use]
    pub fn absolute_face_size(&self) -> i32 {
        self.absolute_face_size
    }

    /// Face detector slot
    #[must_use]
    pub fn face_slot(&self) -> &DetectorSlot {
        &self.face
    }

    /// Eye detector slot
    #[must_use]
    pub fn eye_slot(&self) -> &DetectorSlot {
        &self.eye
    }

    /// Both slots for one frame of detection
    pub fn slots_mut(&mut self) -> (&mut DetectorSlot, &mut DetectorSlot) {
        (&mut self.face, &mut self.eye)
    }

    /// Whether slots are still being loaded
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    /// Stop every running tracker and wait for the loader
    pub fn shutdown(&mut self) {
        self.face.shutdown();
        self.eye.shutdown();
        if let Some(mut loader) = self.loader.take() {
            loader.join();
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("relative_face_size", &self.relative_face_size)
            .field("absolute_face_size", &self.absolute_face_size)
            .field("face", &self.face)
            .field("eye", &self.eye)
            .field("loading", &self.loader.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::TrackerConfig;
    use crate::detector::{tracker::BackgroundTracker, CascadeMatcher, MultiScaleParams, ObjectTracker};
    use crate::frame::GrayRegion;
    use crate::geometry::DetectionSet;

    struct NoMatches;

    impl CascadeMatcher for NoMatches {
        fn detect_multi_scale(&self, _image: &GrayRegion<'_>, _params: &MultiScaleParams) -> Result<DetectionSet> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "no-matches"
        }
    }

    #[test]
    fn test_mode_parse_and_toggle() {
        assert_eq!("tracked".parse::<Mode>().unwrap(), Mode::Tracked);
        assert_eq!("Cascade".parse::<Mode>().unwrap(), Mode::Cascade);
        assert!("native".parse::<Mode>().is_err());
        assert_eq!(Mode::Cascade.toggled(), Mode::Tracked);
        assert_eq!(Mode::default(), Mode::Cascade);
    }

    #[test]
    fn test_threshold_derived_once() {
        let mut session = Session::new();
        assert_eq!(session.absolute_face_size(), FACE_SIZE_UNSET);
        assert_eq!(session.ensure_face_threshold(480), 96);
        assert_eq!(session.ensure_face_threshold(1000), 96);
    }

    #[test]
    fn test_threshold_reset_on_fraction_change() {
        let mut session = Session::new();
        session.ensure_face_threshold(480);
        session.set_relative_face_size(0.5).unwrap();
        assert_eq!(session.absolute_face_size(), FACE_SIZE_UNSET);
        assert_eq!(session.ensure_face_threshold(480), 240);
    }

    #[test]
    fn test_threshold_rounding_to_zero_stays_unset() {
        let mut session = Session::new();
        session.set_relative_face_size(0.2).unwrap();
        assert_eq!(session.ensure_face_threshold(2), FACE_SIZE_UNSET);
        assert_eq!(session.ensure_face_threshold(0), FACE_SIZE_UNSET);
    }

    #[test]
    fn test_zero_threshold_clears_tracker_floor() {
        let mut session = Session::new();
        let (face, _) = session.slots_mut();
        let mut tracker = BackgroundTracker::new("face-tracker", Arc::new(NoMatches), &TrackerConfig::default());
        tracker.set_min_object_size(96).unwrap();
        *face = DetectorSlot::new(SlotRole::Face, None, Some(Box::new(tracker)));

        session.set_relative_face_size(0.0).unwrap();
        assert_eq!(session.ensure_face_threshold(480), FACE_SIZE_UNSET);
        assert_eq!(session.face_slot().tracker().map(|tracker| tracker.min_object_size()), Some(0));
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let mut session = Session::new();
        assert!(session.set_relative_face_size(f32::NAN).is_err());
        assert!(session.set_relative_face_size(1.2).is_err());
        assert!((session.relative_face_size() - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_mode_reports_change() {
        let mut session = Session::new();
        assert!(!session.set_mode(Mode::Cascade).unwrap());
        assert!(session.set_mode(Mode::Tracked).unwrap());
        assert!(!session.set_mode(Mode::Tracked).unwrap());
        assert_eq!(session.mode(), Mode::Tracked);
    }
}
