//! Cascade matcher backed by `OpenCV`'s `objdetect` module.

use std::path::Path;
use std::sync::Mutex;

use opencv::core::{Mat, Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;

use super::{CascadeMatcher, MultiScaleParams};
use crate::{
    frame::GrayRegion,
    geometry::{DetectionBox, DetectionSet},
    utils::safe_cast::u32_to_i32,
    Error, Result,
};

/// Cascade classifier loaded from an `OpenCV` XML file.
///
/// `detect_multi_scale` needs exclusive access to the classifier, so calls
/// from the frame thread and a tracker worker are serialized.
pub struct OpenCvCascade {
    name: String,
    classifier: Mutex<CascadeClassifier>,
}

impl OpenCvCascade {
    /// Load a classifier, failing when the file is missing or yields an empty cascade
    ///
    /// # Errors
    ///
    /// Returns `ClassifierLoad` when the classifier cannot be used.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::ClassifierLoad(format!("Non UTF-8 path: {}", path.display())))?;

        let classifier = CascadeClassifier::new(path_str)
            .map_err(|e| Error::ClassifierLoad(format!("{}: {e}", path.display())))?;
        if classifier.empty()? {
            return Err(Error::ClassifierLoad(format!("{} holds no cascade", path.display())));
        }

        Ok(Self {
            name: path
                .file_stem()
                .map_or_else(|| path_str.to_string(), |stem| stem.to_string_lossy().into_owned()),
            classifier: Mutex::new(classifier),
        })
    }
}

fn region_to_mat(image: &GrayRegion<'_>) -> Result<Mat> {
    let rows = u32_to_i32(image.height())?;
    let cols = u32_to_i32(image.width())?;
    let data = image.to_image().into_raw();
    let mat = Mat::new_rows_cols_with_data(rows, cols, data.as_slice())?;
    Ok(mat.try_clone()?)
}

impl CascadeMatcher for OpenCvCascade {
    fn detect_multi_scale(&self, image: &GrayRegion<'_>, params: &MultiScaleParams) -> Result<DetectionSet> {
        let mat = region_to_mat(image)?;
        let mut found = Vector::<Rect>::new();
        let max_size = params.max_size.map_or_else(Size::default, |size| Size::new(size, size));

        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| Error::TrackerError(format!("{} classifier poisoned", self.name)))?;
        classifier.detect_multi_scale(
            &mat,
            &mut found,
            params.scale_factor,
            params.min_neighbors,
            params.flags,
            Size::new(params.min_size, params.min_size),
            max_size,
        )?;

        Ok(found
            .iter()
            .map(|rect| DetectionBox::new(rect.x, rect.y, rect.width, rect.height))
            .collect())
    }

    fn is_empty(&self) -> bool {
        self.classifier
            .lock()
            .map_or(true, |classifier| classifier.empty().unwrap_or(true))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
