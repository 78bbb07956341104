use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::eco;
use crate::error::PredictError;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 10;

/// Column order the scaler and classifier were fit on. Reordering this
/// silently corrupts every prediction.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "rated",
    "turns",
    "opening_eco",
    "opening_ply",
    "white_rating",
    "black_rating",
    "base_time",
    "increment",
    "rating_diff",
    "total_rating",
];

/// One model input row.
pub type FeatureRow = [f64; FEATURE_COUNT];

// ---------- Inbound request ----------

/// Untyped request body: the eight named keys, each still a raw JSON value.
/// Coercion happens in [`PredictionRequest::validate`] so that every failure
/// names the offending field.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PredictionRequest {
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl PredictionRequest {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Accepts only JSON objects.
    pub fn from_value(v: Value) -> Result<Self, PredictError> {
        match v {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(PredictError::invalid(
                "body",
                format!("expected a JSON object, got {}", json_kind(&other)),
            )),
        }
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    fn field(&self, name: &'static str) -> Result<&Value, PredictError> {
        self.fields.get(name).ok_or(PredictError::MissingField(name))
    }

    /// Coerce every field, in feature order, stopping at the first failure.
    pub fn validate(&self) -> Result<GameFeatures, PredictError> {
        let rated = coerce_flag("rated", self.field("rated")?)?;
        let turns = coerce_count("turns", self.field("turns")?)?;
        let opening_eco = eco::normalize(self.field("opening_eco")?)?;
        let opening_ply = coerce_count("opening_ply", self.field("opening_ply")?)?;
        let white_rating = coerce_rating("white_rating", self.field("white_rating")?)?;
        let black_rating = coerce_rating("black_rating", self.field("black_rating")?)?;
        let base_time = coerce_count("base_time", self.field("base_time")?)?;
        let increment = coerce_count("increment", self.field("increment")?)?;

        Ok(GameFeatures {
            rated,
            turns,
            opening_eco,
            opening_ply,
            white_rating,
            black_rating,
            base_time,
            increment,
        })
    }
}

/// A fully coerced request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFeatures {
    pub rated: i64,
    pub turns: i64,
    pub opening_eco: i64,
    pub opening_ply: i64,
    pub white_rating: i64,
    pub black_rating: i64,
    pub base_time: i64,
    pub increment: i64,
}

impl GameFeatures {
    pub fn rating_diff(&self) -> i64 {
        self.white_rating - self.black_rating
    }

    pub fn total_rating(&self) -> i64 {
        self.white_rating + self.black_rating
    }
}

// ---------- Coercion ----------

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integer coercion: integers as-is, floats truncated toward zero, booleans
/// as 0/1, strings parsed as base-10 after trimming whitespace.
fn coerce_int(field: &'static str, v: &Value) -> Result<i64, PredictError> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                let t = f.trunc();
                if t >= i64::MIN as f64 && t < i64::MAX as f64 {
                    Ok(t as i64)
                } else {
                    Err(PredictError::invalid(field, format!("{n} is out of range")))
                }
            } else {
                Err(PredictError::invalid(field, format!("{n} is out of range")))
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            PredictError::invalid(field, format!("invalid literal for int: {s:?}"))
        }),
        other => Err(PredictError::invalid(
            field,
            format!("expected an integer, got {}", json_kind(other)),
        )),
    }
}

fn coerce_flag(field: &'static str, v: &Value) -> Result<i64, PredictError> {
    if let Value::String(s) = v {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => return Ok(1),
            "false" => return Ok(0),
            _ => {}
        }
    }
    match coerce_int(field, v)? {
        x @ (0 | 1) => Ok(x),
        x => Err(PredictError::invalid(field, format!("expected 0 or 1, got {x}"))),
    }
}

fn coerce_count(field: &'static str, v: &Value) -> Result<i64, PredictError> {
    let x = coerce_int(field, v)?;
    if x < 0 {
        return Err(PredictError::invalid(field, format!("must not be negative, got {x}")));
    }
    Ok(x)
}

/// Upper bound for a rating, so that the sum and difference of two ratings
/// always fit in an `i64`.
pub const MAX_RATING: i64 = i64::MAX / 2;

fn coerce_rating(field: &'static str, v: &Value) -> Result<i64, PredictError> {
    let x = coerce_int(field, v)?;
    if x <= 0 {
        return Err(PredictError::invalid(field, format!("must be positive, got {x}")));
    }
    if x > MAX_RATING {
        return Err(PredictError::invalid(field, format!("{x} is out of range")));
    }
    Ok(x)
}

// ---------- Feature vector ----------

/// The ten model inputs in [`FEATURE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(FeatureRow);

impl FeatureVector {
    pub fn as_row(&self) -> &FeatureRow {
        &self.0
    }

    pub fn into_row(self) -> FeatureRow {
        self.0
    }

    /// Value of a named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_ORDER
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

impl From<&GameFeatures> for FeatureVector {
    fn from(g: &GameFeatures) -> Self {
        // Keep in step with FEATURE_ORDER.
        FeatureVector([
            g.rated as f64,
            g.turns as f64,
            g.opening_eco as f64,
            g.opening_ply as f64,
            g.white_rating as f64,
            g.black_rating as f64,
            g.base_time as f64,
            g.increment as f64,
            g.rating_diff() as f64,
            g.total_rating() as f64,
        ])
    }
}

// ---------- Outcome ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeLabel {
    #[serde(rename = "White Wins")]
    WhiteWins,
    #[serde(rename = "Black Wins")]
    BlackWins,
    #[serde(rename = "Draw")]
    Draw,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl OutcomeLabel {
    /// Class codes outside 0..=2 map to `Unknown`, never to an error.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => OutcomeLabel::WhiteWins,
            1 => OutcomeLabel::BlackWins,
            2 => OutcomeLabel::Draw,
            _ => OutcomeLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeLabel::WhiteWins => "White Wins",
            OutcomeLabel::BlackWins => "Black Wins",
            OutcomeLabel::Draw => "Draw",
            OutcomeLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------- Wire responses ----------

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub prediction: OutcomeLabel,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}
