pub mod inference;
pub mod model_manager;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::error::AppError;
use crate::models::classify_types::Prediction;
use ndarray::Array3;
use std::sync::Arc;

/// Decoded image, shape `(height, width, 3)`, RGB values in `0.0..=255.0`.
pub type Tensor3D = Array3<f32>;

/// A loaded, ready-to-query classifier.
///
/// Implementations are called from blocking threads and may be called again
/// before a previous call returned (a superseded photo still finishing), so
/// they must serialize internally if the runtime requires it.
pub trait Classifier: Send + Sync {
    /// Returns at most `top_k` predictions sorted by descending probability.
    fn classify(&self, image: &Tensor3D, top_k: usize) -> Result<Vec<Prediction>, AppError>;
}

pub type ModelHandle = Arc<dyn Classifier>;
