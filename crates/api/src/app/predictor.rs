//! Boundary to the pre-trained image models.
//!
//! Inference itself is an external collaborator; this module only defines
//! the interface the route handlers call and the class labels each model can
//! produce.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Which pre-trained model a prediction request targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModelKind {
    /// X-ray classification of respiratory diseases.
    Respiratory,
    /// Mammography nodule detection.
    BreastCancer,
    /// X-ray tuberculosis classification.
    Tuberculosis,
    /// X-ray osteoporosis classification.
    Osteoporosis,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Respiratory => "respiratory",
            ModelKind::BreastCancer => "breast",
            ModelKind::Tuberculosis => "tuberculosis",
            ModelKind::Osteoporosis => "osteoporosis",
        }
    }

    /// The class labels the model can produce.
    pub fn classes(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Respiratory => {
                &["Pneumonia Viral", "Normal", "Covid-19", "Pneumonia Bacteriana"]
            }
            ModelKind::Tuberculosis => &["negative", "positive"],
            ModelKind::Osteoporosis => &["Normal", "Osteopenia", "Osteoporosis"],
            ModelKind::BreastCancer => &["nódulo encontrado", "nódulo não encontrado"],
        }
    }
}

/// A classification/detection outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("image could not be decoded")]
    BadImage,

    #[error("model is not available")]
    Unavailable,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Pre-trained model invocation boundary.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, model: ModelKind, image: &[u8]) -> Result<Prediction, PredictError>;
}

/// Predictor used when no model backend is wired (tests, stripped deploys);
/// every request reports the models as unavailable.
#[derive(Debug, Default)]
pub struct UnavailablePredictor;

#[async_trait]
impl Predictor for UnavailablePredictor {
    async fn predict(&self, _model: ModelKind, _image: &[u8]) -> Result<Prediction, PredictError> {
        Err(PredictError::Unavailable)
    }
}
