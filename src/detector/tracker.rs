//! Stateful tracker: a background scanning loop plus IoU continuity.
//!
//! While started, a worker thread scans the most recently submitted image of
//! every region at most once per scan interval and folds each result into
//! that region's object list. `detect` only hands the worker a new image and
//! returns the region's current list, so objects persist through a few missed
//! scans. While stopped, `detect` scans synchronously on the caller's thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::GrayImage;
use log::{debug, error, warn};

use super::{CascadeMatcher, MultiScaleParams, ObjectTracker};
use crate::{
    config::TrackerConfig,
    frame::GrayRegion,
    geometry::{DetectionBox, DetectionSet},
    utils::clip_boxes,
    Error, Result,
};

#[derive(Debug, Clone, Copy)]
struct TrackedObject {
    bbox: DetectionBox,
    missed: u32,
}

/// Objects carried across scans.
///
/// Each scan result is greedily matched to the existing objects by IoU. A
/// matched object takes the fresh box, unmatched scan boxes become new objects
/// and unmatched objects survive until they miss more than `max_missed` scans.
#[derive(Debug, Clone)]
pub struct TrackedObjects {
    objects: Vec<TrackedObject>,
    match_iou: f64,
    max_missed: u32,
}

impl TrackedObjects {
    /// Create an empty object list
    #[must_use]
    pub fn new(match_iou: f64, max_missed: u32) -> Self {
        Self {
            objects: Vec::new(),
            match_iou,
            max_missed,
        }
    }

    /// Fold one scan result into the tracked objects
    pub fn update(&mut self, scan: &[DetectionBox]) {
        let mut matched = vec![false; self.objects.len()];
        let mut fresh = Vec::new();

        for bbox in scan {
            let best = self
                .objects
                .iter()
                .enumerate()
                .filter(|(i, _)| !matched[*i])
                .map(|(i, object)| (i, object.bbox.iou(bbox)))
                .filter(|(_, iou)| *iou >= self.match_iou)
                .max_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((i, _)) => {
                    matched[i] = true;
                    self.objects[i] = TrackedObject { bbox: *bbox, missed: 0 };
                }
                None => fresh.push(TrackedObject { bbox: *bbox, missed: 0 }),
            }
        }

        for (object, hit) in self.objects.iter_mut().zip(&matched) {
            if !hit {
                object.missed += 1;
            }
        }
        let max_missed = self.max_missed;
        self.objects.retain(|object| object.missed <= max_missed);
        self.objects.extend(fresh);
    }

    /// Current boxes in tracking order
    #[must_use]
    pub fn boxes(&self) -> DetectionSet {
        self.objects.iter().map(|object| object.bbox).collect()
    }

    /// Number of tracked objects
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

// One submitted region and the objects tracked inside it.
struct RegionTrack {
    id: u64,
    // Latest bounds in source coordinates.
    bounds: DetectionBox,
    // Latest image submitted for this region, consumed by the worker.
    pending: Option<GrayImage>,
    objects: TrackedObjects,
    last_submitted: Instant,
}

// State shared between the tracker handle and its worker thread.
struct TrackerState {
    regions: Vec<RegionTrack>,
    next_region: u64,
    match_iou: f64,
    max_missed: u32,
    min_object_size: i32,
    scans: u64,
    // Set by stop(); the worker exits when it sees this.
    stop_request: bool,
}

impl TrackerState {
    // Track whose bounds overlap `bounds` best, or a fresh one.
    fn region_for(&mut self, bounds: DetectionBox) -> &mut RegionTrack {
        let best = self
            .regions
            .iter()
            .enumerate()
            .map(|(i, region)| (i, region.bounds.iou(&bounds)))
            .filter(|(_, iou)| *iou >= self.match_iou)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let index = match best {
            Some(i) => i,
            None => {
                let id = self.next_region;
                self.next_region += 1;
                debug!("Tracking new region {id} at {bounds:?}");
                self.regions.push(RegionTrack {
                    id,
                    bounds,
                    pending: None,
                    objects: TrackedObjects::new(self.match_iou, self.max_missed),
                    last_submitted: Instant::now(),
                });
                self.regions.len() - 1
            }
        };

        let region = &mut self.regions[index];
        region.bounds = bounds;
        region.last_submitted = Instant::now();
        region
    }

    // Forget regions nobody submitted within `timeout`.
    fn prune(&mut self, timeout: Duration) {
        self.regions.retain(|region| region.last_submitted.elapsed() <= timeout);
    }

    fn take_pending(&mut self) -> Vec<(u64, GrayImage)> {
        self.regions
            .iter_mut()
            .filter_map(|region| region.pending.take().map(|image| (region.id, image)))
            .collect()
    }
}

struct Shared {
    state: Mutex<TrackerState>,
    // Signalled on new pending images, completed scans and stop requests.
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, TrackerState>> {
        self.state
            .lock()
            .map_err(|_| Error::TrackerError("tracker state poisoned".to_string()))
    }
}

/// Tracker running cascade scans on a background thread.
///
/// Objects are tracked separately for every submitted region: a region is
/// matched to an earlier one by overlap of its bounds in the source image,
/// so results found in one face are never returned for another.
pub struct BackgroundTracker {
    name: String,
    matcher: Arc<dyn CascadeMatcher>,
    scan_interval: Duration,
    region_timeout: Duration,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundTracker {
    /// Create a stopped tracker over `matcher`
    #[must_use]
    pub fn new(name: impl Into<String>, matcher: Arc<dyn CascadeMatcher>, config: &TrackerConfig) -> Self {
        Self {
            name: name.into(),
            matcher,
            scan_interval: config.scan_interval(),
            region_timeout: config.region_timeout(),
            shared: Arc::new(Shared {
                state: Mutex::new(TrackerState {
                    regions: Vec::new(),
                    next_region: 0,
                    match_iou: config.match_iou,
                    max_missed: config.max_missed_scans,
                    min_object_size: 0,
                    scans: 0,
                    stop_request: false,
                }),
                signal: Condvar::new(),
            }),
            worker: None,
        }
    }

    /// Number of region scans completed since creation
    #[must_use]
    pub fn scans_completed(&self) -> u64 {
        self.shared.lock().map(|state| state.scans).unwrap_or(0)
    }

    /// Number of regions currently tracked
    #[must_use]
    pub fn tracked_regions(&self) -> usize {
        self.shared.lock().map(|state| state.regions.len()).unwrap_or(0)
    }

    /// Block until at least `count` scans completed or `timeout` elapsed
    pub fn wait_for_scans(&self, count: u64, timeout: Duration) -> bool {
        let Ok(state) = self.shared.lock() else {
            return false;
        };
        match self
            .shared
            .signal
            .wait_timeout_while(state, timeout, |state| state.scans < count)
        {
            Ok((state, _)) => state.scans >= count,
            Err(_) => false,
        }
    }
}

fn scan_region(matcher: &dyn CascadeMatcher, region: &GrayRegion<'_>, min_object_size: i32) -> Result<DetectionSet> {
    let boxes = matcher.detect_multi_scale(region, &MultiScaleParams::with_min_size(min_object_size))?;
    Ok(clip_boxes(boxes, region.width(), region.height()))
}

fn scan_loop(name: &str, shared: &Shared, matcher: &dyn CascadeMatcher, interval: Duration) {
    debug!("{name} scan loop running");
    loop {
        let (batch, min_object_size) = {
            let Ok(mut state) = shared.state.lock() else {
                error!("{name} state poisoned, stopping scan loop");
                return;
            };
            loop {
                if state.stop_request {
                    debug!("{name} scan loop stopping");
                    return;
                }
                let batch = state.take_pending();
                if !batch.is_empty() {
                    break (batch, state.min_object_size);
                }
                state = match shared.signal.wait(state) {
                    Ok(state) => state,
                    Err(_) => {
                        error!("{name} state poisoned, stopping scan loop");
                        return;
                    }
                };
            }
        };

        let scans: Vec<_> = batch
            .iter()
            .map(|(id, image)| (*id, scan_region(matcher, &GrayRegion::full(image), min_object_size)))
            .collect();

        {
            let Ok(mut state) = shared.state.lock() else {
                error!("{name} state poisoned, stopping scan loop");
                return;
            };
            for (id, scan) in scans {
                match scan {
                    Ok(boxes) => {
                        // The region may have been pruned while scanning.
                        if let Some(region) = state.regions.iter_mut().find(|region| region.id == id) {
                            region.objects.update(&boxes);
                        }
                    }
                    Err(e) => warn!("{name} scan of region {id} failed: {e}"),
                }
                state.scans += 1;
            }
        }
        shared.signal.notify_all();

        // Throttle to the scan interval unless asked to stop.
        let Ok(state) = shared.state.lock() else {
            return;
        };
        match shared.signal.wait_timeout_while(state, interval, |state| !state.stop_request) {
            Ok((state, _)) if !state.stop_request => {}
            _ => return,
        }
    }
}

impl ObjectTracker for BackgroundTracker {
    fn start(&mut self) -> Result<bool> {
        if self.worker.is_some() {
            return Ok(false);
        }

        {
            let mut state = self.shared.lock()?;
            state.stop_request = false;
            state.regions.clear();
        }

        let shared = Arc::clone(&self.shared);
        let matcher = Arc::clone(&self.matcher);
        let interval = self.scan_interval;
        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || scan_loop(&name, &shared, matcher.as_ref(), interval))?;

        self.worker = Some(handle);
        Ok(true)
    }

    fn stop(&mut self) -> Result<bool> {
        let Some(handle) = self.worker.take() else {
            return Ok(false);
        };

        self.shared.lock()?.stop_request = true;
        self.shared.signal.notify_all();

        handle
            .join()
            .map_err(|_| Error::TrackerError(format!("{} worker panicked", self.name)))?;
        Ok(true)
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn is_ready(&self) -> bool {
        !self.matcher.is_empty()
    }

    fn set_min_object_size(&mut self, size: i32) -> Result<()> {
        self.shared.lock()?.min_object_size = size;
        Ok(())
    }

    fn min_object_size(&self) -> i32 {
        self.shared.lock().map(|state| state.min_object_size).unwrap_or(0)
    }

    fn detect(&mut self, image: &GrayRegion<'_>) -> Result<DetectionSet> {
        let (width, height) = (image.width(), image.height());

        if self.worker.is_some() {
            let boxes = {
                let mut state = self.shared.lock()?;
                state.prune(self.region_timeout);
                let region = state.region_for(image.bounds());
                region.pending = Some(image.to_image());
                region.objects.boxes()
            };
            self.shared.signal.notify_all();
            // Objects may come from an earlier image of a different size.
            return Ok(clip_boxes(boxes, width, height));
        }

        let min_object_size = self.min_object_size();
        let scan = scan_region(self.matcher.as_ref(), image, min_object_size)?;
        let boxes = {
            let mut state = self.shared.lock()?;
            state.prune(self.region_timeout);
            let region = state.region_for(image.bounds());
            region.objects.update(&scan);
            let boxes = region.objects.boxes();
            state.scans += 1;
            boxes
        };
        self.shared.signal.notify_all();
        Ok(clip_boxes(boxes, width, height))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BackgroundTracker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop {}: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_objects_new_and_matched() {
        let mut objects = TrackedObjects::new(0.3, 2);

        objects.update(&[DetectionBox::new(100, 100, 50, 50), DetectionBox::new(300, 100, 50, 50)]);
        assert_eq!(objects.len(), 2);

        // Slight motion keeps the same object and takes the fresh box
        objects.update(&[DetectionBox::new(105, 102, 50, 50), DetectionBox::new(300, 100, 50, 50)]);
        assert_eq!(
            objects.boxes(),
            vec![DetectionBox::new(105, 102, 50, 50), DetectionBox::new(300, 100, 50, 50)]
        );
    }

    #[test]
    fn test_tracked_objects_survive_missed_scans() {
        let mut objects = TrackedObjects::new(0.3, 2);
        objects.update(&[DetectionBox::new(100, 100, 50, 50)]);

        objects.update(&[]);
        objects.update(&[]);
        assert_eq!(objects.len(), 1);

        objects.update(&[]);
        assert!(objects.is_empty());
    }

    #[test]
    fn test_tracked_objects_reacquire_resets_misses() {
        let mut objects = TrackedObjects::new(0.3, 1);
        objects.update(&[DetectionBox::new(0, 0, 40, 40)]);
        objects.update(&[]);
        objects.update(&[DetectionBox::new(2, 2, 40, 40)]);
        objects.update(&[]);
        assert_eq!(objects.boxes(), vec![DetectionBox::new(2, 2, 40, 40)]);
    }

    #[test]
    fn test_tracked_objects_disjoint_box_is_new() {
        let mut objects = TrackedObjects::new(0.3, 2);
        objects.update(&[DetectionBox::new(0, 0, 10, 10)]);
        objects.update(&[DetectionBox::new(50, 50, 10, 10)]);
        assert_eq!(objects.len(), 2);
    }
}
