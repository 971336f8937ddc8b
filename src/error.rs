//! Error types for the face and eye detection library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cascade classifier could not be loaded
    #[error("Classifier load error: {0}")]
    ClassifierLoad(String),

    /// The binary was built without a cascade backend
    #[error("Detection backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Stateful tracker start, stop or detection failed
    #[error("Tracker error: {0}")]
    TrackerError(String),

    /// The frame pipeline owning the control queue has been dropped
    #[error("Control channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
