//! Constants used throughout the detection pipeline

use image::Rgba;

/// Scale step between successive cascade evaluation scales
pub const CASCADE_SCALE_FACTOR: f64 = 1.1;

/// Minimum neighbouring hits for a cascade candidate to be retained
pub const CASCADE_MIN_NEIGHBORS: i32 = 2;

/// `CASCADE_SCALE_IMAGE` flag passed to the multi-scale matcher
pub const CASCADE_FLAGS: i32 = 2;

/// Minimum eye size in pixels, independent of face size and mode
pub const EYE_MIN_SIZE: i32 = 30;

/// Default face size as a fraction of frame height
pub const DEFAULT_RELATIVE_FACE_SIZE: f32 = 0.2;

/// Absolute face size meaning "not yet derived for this frame size"
pub const FACE_SIZE_UNSET: i32 = 0;

/// Divisor bounding how far the pupil may wander from the iris center
pub const PUPIL_OFFSET_DIVISOR: f32 = 1.4;

/// Default thickness of the face rectangle in pixels
pub const DEFAULT_FACE_RECT_THICKNESS: u32 = 3;

/// Face rectangle color
pub const FACE_RECT_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Iris fill color
pub const IRIS_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pupil fill color
pub const PUPIL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Default interval between background tracker scans in milliseconds
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 100;

/// Default number of scans a tracked object survives without a match
pub const DEFAULT_MAX_MISSED_SCANS: u32 = 2;

/// Default overlap required to continue a tracked object
pub const DEFAULT_MATCH_IOU: f64 = 0.3;

/// Time a tracked region survives without a new submission
pub const DEFAULT_REGION_TIMEOUT_MS: u64 = 1000;
