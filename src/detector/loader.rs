//! Classifier loading and the background slot loader.
//!
//! Loading never fails the session: a classifier that cannot be loaded yields
//! an unloaded slot, which reports not-ready for the rest of the session.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::{CascadeMatcher, DetectorSlot, SlotRole};
use crate::{
    config::{CascadeConfig, TrackerConfig},
    Result,
};

/// Load a cascade classifier from `path` with the compiled-in backend
///
/// # Errors
///
/// Returns `ClassifierLoad` when the file cannot be used, or
/// `BackendUnavailable` when the crate was built without a cascade backend.
#[cfg(feature = "opencv")]
pub fn load_cascade(path: &Path) -> Result<Arc<dyn CascadeMatcher>> {
    Ok(Arc::new(super::opencv::OpenCvCascade::load(path)?))
}

/// Load a cascade classifier from `path` with the compiled-in backend
///
/// # Errors
///
/// Always returns `BackendUnavailable`: this build has no cascade backend.
#[cfg(not(feature = "opencv"))]
pub fn load_cascade(path: &Path) -> Result<Arc<dyn CascadeMatcher>> {
    Err(crate::Error::BackendUnavailable(format!(
        "cannot load {}: built without the `opencv` feature",
        path.display()
    )))
}

/// Load the classifier for `role` and build both of its detectors
#[must_use]
pub fn load_slot(role: SlotRole, path: &Path, tracker: &TrackerConfig) -> DetectorSlot {
    if !path.exists() {
        warn!("{} classifier not found at {}", role, path.display());
    }

    match load_cascade(path) {
        Ok(matcher) => {
            info!("Loaded {} cascade classifier from {}", role, path.display());
            DetectorSlot::from_matcher(role, matcher, tracker)
        }
        Err(e) => {
            error!("Failed to load {} cascade classifier: {}", role, e);
            DetectorSlot::unloaded(role)
        }
    }
}

/// Loads detector slots on a worker thread and hands them over as they finish
pub struct SlotLoader {
    receiver: Receiver<DetectorSlot>,
    handle: Option<JoinHandle<()>>,
    remaining: usize,
}

impl SlotLoader {
    /// Load the face and eye slots described by `cascades`
    ///
    /// # Errors
    ///
    /// Returns an error when the loader thread cannot be spawned.
    pub fn spawn(cascades: &CascadeConfig, tracker: &TrackerConfig) -> Result<Self> {
        let cascades = cascades.clone();
        let tracker = tracker.clone();
        Self::spawn_with(vec![SlotRole::Face, SlotRole::Eye], move |role| {
            let path = match role {
                SlotRole::Face => &cascades.face,
                SlotRole::Eye => &cascades.eye,
            };
            load_slot(role, path, &tracker)
        })
    }

    /// Run `load` for each role in order on a worker thread
    ///
    /// # Errors
    ///
    /// Returns an error when the loader thread cannot be spawned.
    pub fn spawn_with<F>(roles: Vec<SlotRole>, load: F) -> Result<Self>
    where
        F: Fn(SlotRole) -> DetectorSlot + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let remaining = roles.len();

        let handle = thread::Builder::new()
            .name("slot-loader".to_string())
            .spawn(move || {
                for role in roles {
                    let slot = load(role);
                    if sender.send(slot).is_err() {
                        debug!("Session gone, abandoning slot loading");
                        return;
                    }
                }
            })?;

        Ok(Self {
            receiver,
            handle: Some(handle),
            remaining,
        })
    }

    /// True once every slot was handed over or the loader gave up
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Take the next finished slot without blocking
    pub fn try_next(&mut self) -> Option<DetectorSlot> {
        if self.is_finished() {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(slot) => {
                self.remaining -= 1;
                Some(slot)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.remaining = 0;
                None
            }
        }
    }

    /// Take the next finished slot, waiting until `deadline` at most
    pub fn next_before(&mut self, deadline: Instant) -> Option<DetectorSlot> {
        if self.is_finished() {
            return None;
        }
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.receiver.recv_timeout(timeout) {
            Ok(slot) => {
                self.remaining -= 1;
                Some(slot)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.remaining = 0;
                None
            }
        }
    }

    /// Wait for the loader thread to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Slot loader thread panicked");
            }
        }
    }
}

impl Drop for SlotLoader {
    fn drop(&mut self) {
        self.join();
    }
}

/// Default wait used by callers that need the slots before their first frame
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);
