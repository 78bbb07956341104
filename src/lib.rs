//! Chess game outcome prediction: input coercion, ECO normalization, feature
//! assembly and model invocation, plus the HTTP surface that serves it.

pub mod config;
pub mod eco;
pub mod error;
pub mod fixtures;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod types;

pub use error::{EcoError, ModelError, PredictError};
pub use model::{Classifier, ModelBundle, Scaler};
pub use pipeline::Predictor;
pub use types::{FeatureVector, OutcomeLabel, PredictionRequest, FEATURE_COUNT, FEATURE_ORDER};
