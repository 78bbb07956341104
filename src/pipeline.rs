//! Request → feature vector → scaler → classifier → label.

use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{ModelError, PredictError};
use crate::model::ModelBundle;
use crate::types::{FeatureVector, OutcomeLabel, PredictionRequest, FEATURE_ORDER};

/// Stateless between calls; the only shared data is the read-only model
/// bundle, so one `Predictor` can serve any number of threads.
pub struct Predictor {
    models: Option<ModelBundle>,
    log_features: bool,
}

impl Predictor {
    pub fn new(models: ModelBundle) -> Self {
        Self {
            models: Some(models),
            log_features: false,
        }
    }

    /// A predictor whose model failed to load. Every call answers
    /// [`PredictError::ModelUnavailable`].
    pub fn unavailable() -> Self {
        Self {
            models: None,
            log_features: false,
        }
    }

    pub fn with_feature_logging(mut self, on: bool) -> Self {
        self.log_features = on;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_some()
    }

    /// Validate a request and assemble its feature vector.
    pub fn features(request: &PredictionRequest) -> Result<FeatureVector, PredictError> {
        let game = request.validate()?;
        Ok(FeatureVector::from(&game))
    }

    /// Same as [`Predictor::predict`] but for a raw JSON body. Model
    /// availability is still checked before the body is looked at.
    pub fn predict_value(&self, body: Value) -> Result<OutcomeLabel, PredictError> {
        if !self.is_ready() {
            return Err(PredictError::ModelUnavailable);
        }
        let request = PredictionRequest::from_value(body)?;
        self.predict(&request)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<OutcomeLabel, PredictError> {
        let models = self.models.as_ref().ok_or(PredictError::ModelUnavailable)?;

        let features = Self::features(request)?;
        if self.log_features {
            log_feature_summary(&features);
        }

        let scaled = guarded("scaler", || models.scaler.transform(&[*features.as_row()]))?
            .map_err(scaling_error)?;
        let row = scaled
            .into_iter()
            .next()
            .ok_or_else(|| PredictError::PredictionFailure("scaler returned no rows".into()))?;

        let codes = guarded("classifier", || models.classifier.predict(&[row]))?
            .map_err(|e| PredictError::PredictionFailure(e.to_string()))?;
        let code = codes.first().copied().ok_or_else(|| {
            PredictError::PredictionFailure("classifier returned no predictions".into())
        })?;

        let label = OutcomeLabel::from_code(code);
        if label == OutcomeLabel::Unknown {
            tracing::warn!(code, "classifier returned an unmapped class code");
        }
        Ok(label)
    }
}

fn scaling_error(e: ModelError) -> PredictError {
    if e.is_input_mismatch() {
        PredictError::invalid("features", format!("scaling error: {e}"))
    } else {
        PredictError::PredictionFailure(format!("scaling error: {e}"))
    }
}

/// Run a collaborator call, turning a panic into `PredictionFailure`.
fn guarded<T>(stage: &str, f: impl FnOnce() -> T) -> Result<T, PredictError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        PredictError::PredictionFailure(format!(
            "{stage} panicked: {}",
            panic_message(payload.as_ref())
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

// Debug signal so we can confirm the vector isn't degenerate
fn log_feature_summary(features: &FeatureVector) {
    let v = features.as_row();
    let n = v.len() as f64;
    let nz = v.iter().filter(|x| **x != 0.0).count();
    let mean = v.iter().sum::<f64>() / n;
    let std = (v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt();
    let sample: Vec<String> = FEATURE_ORDER
        .iter()
        .zip(v.iter())
        .take(6)
        .map(|(name, x)| format!("{}={}", name, x))
        .collect();
    tracing::info!(
        "features in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
        v.len(),
        nz,
        mean,
        std,
        sample.join(", ")
    );
}
