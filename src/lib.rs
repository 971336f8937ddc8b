//! Hierarchical face and eye detection with a wandering-pupil overlay.
//!
//! Each frame goes through two nested detection stages:
//! 1. Face detection over the full grayscale frame, with a minimum face size
//!    derived from the frame height
//! 2. Eye detection inside each face region only, with a fixed 30 px minimum
//!
//! Every face is outlined and every eye gets a randomized iris and pupil
//! drawn over it. Detection runs either as a stateless multi-scale cascade or
//! as a stateful tracker scanning on a background thread; the session mode
//! picks one per frame and can be switched between frames.
//!
//! # Examples
//!
//! ## Processing frames
//!
//! ```no_run
//! use face_eye_detect::{config::Config, frame::Frame, pipeline::FramePipeline};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut pipeline = FramePipeline::from_config(&config)?;
//! pipeline.session_mut().wait_for_slots(Duration::from_secs(5));
//!
//! let color = image::open("frame.png")?.to_rgba8();
//! let annotated = pipeline.process_frame(Frame::from_color(color));
//! annotated.save("annotated.png")?;
//!
//! if let Some(report) = pipeline.last_report() {
//!     println!("{} faces, {} eyes", report.faces, report.eyes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Controls from another thread
//!
//! ```no_run
//! use face_eye_detect::{config::Config, controls::FaceSizePreset, pipeline::FramePipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = FramePipeline::from_config(&Config::default())?;
//! let controls = pipeline.control_handle();
//!
//! std::thread::spawn(move || {
//!     // Applied before the next frame
//!     let _ = controls.set_face_size(FaceSizePreset::Percent30);
//!     let _ = controls.toggle_mode();
//! });
//! # Ok(())
//! # }
//! ```

/// Detection boxes and box arithmetic
pub mod geometry;

/// Frame containers and grayscale region views
pub mod frame;

/// Detector adapters, the background tracker and classifier loading
pub mod detector;

/// Session state: mode, face-size threshold and detector slots
pub mod session;

/// User control actions and the cross-thread control queue
pub mod controls;

/// Iris and pupil overlay synthesis and drawing
pub mod overlay;

/// Per-frame detection and annotation
pub mod pipeline;

/// Box clipping and numeric conversion helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the pipeline
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
