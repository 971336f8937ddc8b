//! Detector adapters: one uniform `detect` over stateless cascades and stateful trackers.
//!
//! Each logical role (face, eye) owns a [`DetectorSlot`] holding both a
//! stateless [`CascadeDetector`] and a stateful [`ObjectTracker`]. The session
//! mode picks which of the two answers for a frame through [`ActiveDetector`].

/// Classifier loading and the asynchronous slot loader
pub mod loader;

/// Background-scanning tracker built on any cascade matcher
pub mod tracker;

/// Cascade matcher backed by `OpenCV`
#[cfg(feature = "opencv")]
pub mod opencv;

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    config::TrackerConfig,
    constants::{CASCADE_FLAGS, CASCADE_MIN_NEIGHBORS, CASCADE_SCALE_FACTOR},
    frame::GrayRegion,
    geometry::DetectionSet,
    session::Mode,
    Result,
};

use self::tracker::BackgroundTracker;

/// Parameters for one multi-scale cascade evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiScaleParams {
    /// Scale step between pyramid levels
    pub scale_factor: f64,
    /// Neighbour hits required to keep a candidate
    pub min_neighbors: i32,
    /// Matcher flags
    pub flags: i32,
    /// Smallest square object size in pixels, 0 for no floor
    pub min_size: i32,
    /// Largest square object size in pixels, `None` for unbounded
    pub max_size: Option<i32>,
}

impl MultiScaleParams {
    /// Standard parameters with the given minimum object size and no maximum
    #[must_use]
    pub const fn with_min_size(min_size: i32) -> Self {
        Self {
            scale_factor: CASCADE_SCALE_FACTOR,
            min_neighbors: CASCADE_MIN_NEIGHBORS,
            flags: CASCADE_FLAGS,
            min_size,
            max_size: None,
        }
    }
}

/// Stateless multi-scale classifier supplied by a detection library
pub trait CascadeMatcher: Send + Sync {
    /// Return every retained match in `image`
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying library fails on this image.
    fn detect_multi_scale(&self, image: &GrayRegion<'_>, params: &MultiScaleParams) -> Result<DetectionSet>;

    /// True when no classifier data was loaded
    fn is_empty(&self) -> bool {
        false
    }

    /// Human readable classifier name for logs
    fn name(&self) -> &str;
}

/// Stateful detector blending fresh scans with continuity from earlier frames
pub trait ObjectTracker: Send {
    /// Begin active tracking; returns `false` when already running
    ///
    /// # Errors
    ///
    /// Returns an error when the background scanning task cannot be started.
    fn start(&mut self) -> Result<bool>;

    /// End active tracking; returns `false` when already stopped
    ///
    /// # Errors
    ///
    /// Returns an error when the background scanning task cannot be joined.
    fn stop(&mut self) -> Result<bool>;

    /// Whether tracking is currently active
    fn is_running(&self) -> bool;

    /// Whether the tracker has a usable classifier
    fn is_ready(&self) -> bool;

    /// Update the minimum object size, in place if already running
    ///
    /// # Errors
    ///
    /// Returns an error when the shared tracker state is unusable.
    fn set_min_object_size(&mut self, size: i32) -> Result<()>;

    /// Current minimum object size
    fn min_object_size(&self) -> i32;

    /// Submit `image` and return the currently tracked objects
    ///
    /// # Errors
    ///
    /// Returns an error when the shared tracker state is unusable or a scan fails.
    fn detect(&mut self, image: &GrayRegion<'_>) -> Result<DetectionSet>;

    /// Human readable tracker name for logs
    fn name(&self) -> &str;
}

/// Stateless detector running a cascade over one image at a time
#[derive(Clone)]
pub struct CascadeDetector {
    matcher: Arc<dyn CascadeMatcher>,
}

impl CascadeDetector {
    /// Wrap a cascade matcher
    #[must_use]
    pub fn new(matcher: Arc<dyn CascadeMatcher>) -> Self {
        Self { matcher }
    }

    /// Whether the classifier loaded
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.matcher.is_empty()
    }

    /// Run the cascade with the standard parameters
    ///
    /// # Errors
    ///
    /// Propagates matcher failures.
    pub fn detect(&self, image: &GrayRegion<'_>, min_object_size: i32) -> Result<DetectionSet> {
        self.matcher
            .detect_multi_scale(image, &MultiScaleParams::with_min_size(min_object_size))
    }
}

impl fmt::Debug for CascadeDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeDetector")
            .field("matcher", &self.matcher.name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// The detector answering for a slot in the current mode
pub enum ActiveDetector<'a> {
    /// Stateless cascade, evaluated synchronously
    Stateless(&'a CascadeDetector),
    /// Stateful tracker, answering from its latest internal result
    Stateful(&'a mut dyn ObjectTracker),
}

impl ActiveDetector<'_> {
    /// Whether `detect` may be called
    #[must_use]
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Stateless(detector) => detector.is_ready(),
            Self::Stateful(tracker) => tracker.is_ready(),
        }
    }

    /// Detect objects in `image`.
    ///
    /// `min_object_size` applies to the stateless path; a tracker uses the
    /// minimum it was configured with.
    ///
    /// # Errors
    ///
    /// Propagates failures from the underlying detector.
    pub fn detect(&mut self, image: &GrayRegion<'_>, min_object_size: i32) -> Result<DetectionSet> {
        match self {
            Self::Stateless(detector) => detector.detect(image, min_object_size),
            Self::Stateful(tracker) => tracker.detect(image),
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stateless(_) => "cascade",
            Self::Stateful(_) => "tracker",
        }
    }
}

/// Logical detection role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotRole {
    /// Full-frame face detection
    Face,
    /// Eye detection inside a face region
    Eye,
}

impl SlotRole {
    /// Role name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Face => "face",
            Self::Eye => "eye",
        }
    }
}

impl fmt::Display for SlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Both detector variants for one role.
///
/// Either variant may be missing when its classifier failed to load; the
/// slot then contributes no boxes in the corresponding mode.
pub struct DetectorSlot {
    role: SlotRole,
    cascade: Option<CascadeDetector>,
    tracker: Option<Box<dyn ObjectTracker>>,
    // Mode whose not-ready state was already warned about.
    not_ready_warned: Option<Mode>,
}

impl DetectorSlot {
    /// Assemble a slot from explicit parts
    #[must_use]
    pub fn new(role: SlotRole, cascade: Option<CascadeDetector>, tracker: Option<Box<dyn ObjectTracker>>) -> Self {
        Self {
            role,
            cascade,
            tracker,
            not_ready_warned: None,
        }
    }

    /// Slot with neither detector, reporting not-ready in every mode
    #[must_use]
    pub fn unloaded(role: SlotRole) -> Self {
        Self::new(role, None, None)
    }

    /// Build both variants over one loaded matcher
    #[must_use]
    pub fn from_matcher(role: SlotRole, matcher: Arc<dyn CascadeMatcher>, config: &TrackerConfig) -> Self {
        let tracker = BackgroundTracker::new(format!("{role}-tracker"), Arc::clone(&matcher), config);
        Self::new(role, Some(CascadeDetector::new(matcher)), Some(Box::new(tracker)))
    }

    /// Role of this slot
    #[must_use]
    pub fn role(&self) -> SlotRole {
        self.role
    }

    /// Whether any detector variant is present
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cascade.is_some() || self.tracker.is_some()
    }

    /// Detector answering in `mode`, if present
    pub fn active(&mut self, mode: Mode) -> Option<ActiveDetector<'_>> {
        match mode {
            Mode::Cascade => self.cascade.as_ref().map(ActiveDetector::Stateless),
            Mode::Tracked => match self.tracker.as_mut() {
                Some(tracker) => Some(ActiveDetector::Stateful(&mut **tracker)),
                None => None,
            },
        }
    }

    /// Record that the `mode` detector skipped a frame as not ready.
    ///
    /// Warns once per mode, then logs at debug level; returns `true` when
    /// this call warned.
    pub fn mark_not_ready(&mut self, mode: Mode) -> bool {
        let kind = match mode {
            Mode::Cascade => "cascade",
            Mode::Tracked => "tracker",
        };
        if self.not_ready_warned == Some(mode) {
            debug!("{} {kind} is not ready, skipping", self.role);
            return false;
        }
        warn!("{} {kind} is not ready, skipping", self.role);
        self.not_ready_warned = Some(mode);
        true
    }

    /// Record that the `mode` detector is ready again
    pub fn mark_ready(&mut self, mode: Mode) {
        if self.not_ready_warned == Some(mode) {
            info!("{} detector ready in {mode} mode", self.role);
            self.not_ready_warned = None;
        }
    }

    /// Stateless detector, if loaded
    #[must_use]
    pub fn cascade(&self) -> Option<&CascadeDetector> {
        self.cascade.as_ref()
    }

    /// Stateful tracker, if loaded
    #[must_use]
    pub fn tracker(&self) -> Option<&(dyn ObjectTracker + 'static)> {
        self.tracker.as_deref()
    }

    /// Start the tracker; `Ok(false)` when absent or already running
    ///
    /// # Errors
    ///
    /// Propagates tracker start failures.
    pub fn start_tracker(&mut self) -> Result<bool> {
        match self.tracker.as_mut() {
            Some(tracker) => {
                let started = tracker.start()?;
                if started {
                    info!("{} tracker started", self.role);
                }
                Ok(started)
            }
            None => Ok(false),
        }
    }

    /// Stop the tracker; `Ok(false)` when absent or already stopped
    ///
    /// # Errors
    ///
    /// Propagates tracker stop failures.
    pub fn stop_tracker(&mut self) -> Result<bool> {
        match self.tracker.as_mut() {
            Some(tracker) => {
                let stopped = tracker.stop()?;
                if stopped {
                    info!("{} tracker stopped", self.role);
                }
                Ok(stopped)
            }
            None => Ok(false),
        }
    }

    /// Set the tracker's minimum object size, ignored when no tracker is loaded
    ///
    /// # Errors
    ///
    /// Propagates tracker failures.
    pub fn set_tracker_min_size(&mut self, size: i32) -> Result<()> {
        match self.tracker.as_mut() {
            Some(tracker) => tracker.set_min_object_size(size),
            None => Ok(()),
        }
    }

    /// Stop any running tracker before the slot is released
    pub fn shutdown(&mut self) {
        if let Err(e) = self.stop_tracker() {
            warn!("Failed to stop {} tracker: {}", self.role, e);
        }
    }
}

impl Drop for DetectorSlot {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for DetectorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorSlot")
            .field("role", &self.role)
            .field("cascade", &self.cascade)
            .field("tracker", &self.tracker.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}
