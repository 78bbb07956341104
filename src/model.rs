use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};
use tch::{kind::Kind, CModule, Device, Tensor};

use crate::error::ModelError;
use crate::types::{FeatureRow, FEATURE_COUNT, FEATURE_ORDER};

// ---------- Collaborator seams ----------

/// Feature scaling fit alongside the classifier. Takes and returns a batch
/// of rows; the pipeline always sends exactly one.
pub trait Scaler: Send + Sync {
    fn transform(&self, batch: &[FeatureRow]) -> Result<Vec<FeatureRow>, ModelError>;
}

/// Outcome classifier. Returns one class code per input row.
pub trait Classifier: Send + Sync {
    fn predict(&self, batch: &[FeatureRow]) -> Result<Vec<i64>, ModelError>;
}

/// Scaler and classifier loaded once at startup and shared read-only.
#[derive(Clone)]
pub struct ModelBundle {
    pub scaler: Arc<dyn Scaler>,
    pub classifier: Arc<dyn Classifier>,
}

impl ModelBundle {
    pub fn new(scaler: Arc<dyn Scaler>, classifier: Arc<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }

    /// Load the JSON scaler and the TorchScript classifier from disk.
    pub fn load(scaler_path: &Path, model_path: &Path) -> Result<Self> {
        let scaler = StandardScaler::load(scaler_path)?;
        let classifier = TorchClassifier::load(model_path)?;
        Ok(Self::new(Arc::new(scaler), Arc::new(classifier)))
    }
}

// ---------- Standard scaler ----------

#[derive(Deserialize)]
struct ScalerJson {
    feat_list: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// `(x - mean) / scale`, column-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: FeatureRow,
    scale: FeatureRow,
}

impl StandardScaler {
    /// Zero scale entries (constant columns at fit time) become 1.0.
    pub fn new(mean: FeatureRow, mut scale: FeatureRow) -> Self {
        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler at {}", path.display()))?;
        Self::from_json_str(&txt)
            .with_context(|| format!("failed to parse scaler {}", path.display()))
    }

    pub fn from_json_str(txt: &str) -> Result<Self> {
        let raw: ScalerJson = serde_json::from_str(txt)?;

        if let Some(feat_list) = &raw.feat_list {
            ensure!(
                feat_list.iter().map(String::as_str).eq(FEATURE_ORDER),
                "scaler feat_list {:?} does not match expected order {:?}",
                feat_list,
                FEATURE_ORDER
            );
        }

        let mean = to_row("mean", raw.mean)?;
        let scale = to_row("scale", raw.scale)?;
        if let Some(bad) = mean.iter().chain(scale.iter()).find(|x| !x.is_finite()) {
            bail!("scaler parameters must be finite, found {}", bad);
        }
        Ok(Self::new(mean, scale))
    }

    pub fn mean(&self) -> &FeatureRow {
        &self.mean
    }

    pub fn scale(&self) -> &FeatureRow {
        &self.scale
    }
}

fn to_row(name: &str, v: Vec<f64>) -> Result<FeatureRow> {
    let len = v.len();
    v.try_into().map_err(|_| {
        anyhow::anyhow!("scaler {} has {} entries, expected {}", name, len, FEATURE_COUNT)
    })
}

impl Scaler for StandardScaler {
    fn transform(&self, batch: &[FeatureRow]) -> Result<Vec<FeatureRow>, ModelError> {
        batch
            .iter()
            .map(|row| {
                let mut out = [0.0; FEATURE_COUNT];
                for (i, x) in row.iter().enumerate() {
                    if !x.is_finite() {
                        return Err(ModelError::InvalidValue(format!(
                            "{} is not finite",
                            FEATURE_ORDER[i]
                        )));
                    }
                    out[i] = (x - self.mean[i]) / self.scale[i];
                }
                Ok(out)
            })
            .collect()
    }
}

// ---------- TorchScript classifier ----------

/// How to read a class code out of the model's output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// `[B]` or `[B, 1]`: the model emits the code itself.
    ClassCode,
    /// `[B, C]`: per-class scores, code = argmax.
    Scores { n_classes: i64 },
}

impl OutputKind {
    /// Decide from the output of a single-row probe.
    pub fn probe(size: &[i64]) -> Result<Self> {
        match size {
            [1] | [1, 1] => Ok(OutputKind::ClassCode),
            [1, c] if *c >= 2 => Ok(OutputKind::Scores { n_classes: *c }),
            _ => bail!("unexpected model output size: {:?}", size),
        }
    }
}

pub struct TorchClassifier {
    model: CModule,
    device: Device,
    pub output: OutputKind,
}

fn runtime(e: tch::TchError) -> ModelError {
    ModelError::Runtime(e.to_string())
}

impl TorchClassifier {
    pub fn load(model_path: &Path) -> Result<Self> {
        let device = Device::Cpu;

        let model = CModule::load_on_device(model_path, device)
            .with_context(|| format!("failed to load TorchScript {}", model_path.display()))?;

        // Probe output shape with a dummy forward
        let dummy = Tensor::zeros([1, FEATURE_COUNT as i64], (Kind::Float, device));
        let t = tch::no_grad(|| model.forward_ts(&[dummy]))
            .with_context(|| "probe forward failed")?;
        let output = OutputKind::probe(&t.size())?;

        Ok(Self {
            model,
            device,
            output,
        })
    }

    fn forward(&self, batch: &[FeatureRow]) -> Result<Tensor, ModelError> {
        let flat: Vec<f32> = batch
            .iter()
            .flat_map(|row| row.iter().map(|x| *x as f32))
            .collect();
        let input = Tensor::from_slice(&flat)
            .f_reshape([batch.len() as i64, FEATURE_COUNT as i64])
            .map_err(runtime)?
            .to_device(self.device);
        tch::no_grad(|| self.model.forward_ts(&[input])).map_err(runtime)
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, batch: &[FeatureRow]) -> Result<Vec<i64>, ModelError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let t = self.forward(batch)?;
        codes_from_output(&t, self.output, batch.len())
    }
}

/// Read one class code per row out of a forward pass result.
fn codes_from_output(t: &Tensor, kind: OutputKind, rows: usize) -> Result<Vec<i64>, ModelError> {
    let codes = match kind {
        OutputKind::ClassCode => t
            .f_reshape([-1i64])
            .and_then(|t| t.f_round())
            .and_then(|t| t.f_to_kind(Kind::Int64))
            .map_err(runtime)?,
        OutputKind::Scores { n_classes } => {
            let sz = t.size();
            if sz.len() != 2 || sz[1] != n_classes {
                return Err(ModelError::Shape {
                    expected: format!("[{}, {}]", rows, n_classes),
                    actual: format!("{:?}", sz),
                });
            }
            t.f_argmax(1i64, false).map_err(runtime)?
        }
    };

    let n = codes.size().first().copied().unwrap_or(0);
    if n != rows as i64 {
        return Err(ModelError::Shape {
            expected: format!("{} predictions", rows),
            actual: format!("{}", n),
        });
    }
    (0..n)
        .map(|i| codes.f_int64_value(&[i]).map_err(runtime))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALER_JSON: &str = r#"{
        "feat_list": ["rated","turns","opening_eco","opening_ply","white_rating",
                      "black_rating","base_time","increment","rating_diff","total_rating"],
        "mean":  [0.5, 60, 200, 4, 1600, 1600, 600, 5, 0, 3200],
        "scale": [0.5, 20, 100, 2,  200,  200, 300, 0, 100, 400]
    }"#;

    #[test]
    fn scaler_standardizes_each_column() {
        let s = StandardScaler::from_json_str(SCALER_JSON).unwrap();
        let row = [1.0, 40.0, 260.0, 5.0, 1500.0, 1400.0, 600.0, 5.0, 100.0, 2900.0];
        let out = s.transform(&[row]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0],
            [1.0, -1.0, 0.6, 0.5, -0.5, -1.0, 0.0, 0.0, 1.0, -0.75]
        );
    }

    #[test]
    fn zero_scale_means_identity_scaling() {
        let s = StandardScaler::from_json_str(SCALER_JSON).unwrap();
        assert_eq!(s.scale()[7], 1.0);
    }

    #[test]
    fn scaler_without_feat_list_loads() {
        let txt = r#"{"mean":[0,0,0,0,0,0,0,0,0,0],"scale":[1,1,1,1,1,1,1,1,1,1]}"#;
        let s = StandardScaler::from_json_str(txt).unwrap();
        assert_eq!(s.mean(), &[0.0; FEATURE_COUNT]);
    }

    #[test]
    fn reordered_feat_list_is_rejected() {
        let txt = SCALER_JSON.replace(r#""rated","turns""#, r#""turns","rated""#);
        let err = StandardScaler::from_json_str(&txt).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn wrong_parameter_length_is_rejected() {
        let txt = r#"{"mean":[0,0,0],"scale":[1,1,1,1,1,1,1,1,1,1]}"#;
        let err = StandardScaler::from_json_str(txt).unwrap_err();
        assert!(err.to_string().contains("expected 10"));
    }

    #[test]
    fn non_finite_input_is_a_value_mismatch() {
        let s = StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]);
        let mut row = [0.0; FEATURE_COUNT];
        row[2] = f64::INFINITY;
        let err = s.transform(&[row]).unwrap_err();
        assert!(err.is_input_mismatch());
        assert!(err.to_string().contains("opening_eco"));
    }

    #[test]
    fn missing_scaler_file_has_context() {
        let err = StandardScaler::load(Path::new("/nonexistent/scaler.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read scaler"));
    }

    #[test]
    fn output_kind_from_probe_shape() {
        assert_eq!(OutputKind::probe(&[1]).unwrap(), OutputKind::ClassCode);
        assert_eq!(OutputKind::probe(&[1, 1]).unwrap(), OutputKind::ClassCode);
        assert_eq!(
            OutputKind::probe(&[1, 3]).unwrap(),
            OutputKind::Scores { n_classes: 3 }
        );
        assert!(OutputKind::probe(&[1, 3, 2]).is_err());
        assert!(OutputKind::probe(&[2, 3]).is_err());
        assert!(OutputKind::probe(&[]).is_err());
    }

    #[test]
    fn scores_decode_to_argmax() {
        let t = Tensor::from_slice(&[0.1f32, 2.0, 0.5]).reshape([1i64, 3]);
        let codes = codes_from_output(&t, OutputKind::Scores { n_classes: 3 }, 1).unwrap();
        assert_eq!(codes, vec![1]);

        let t = Tensor::from_slice(&[0.9f32, 0.05, 0.05, 0.1, 0.2, 0.7]).reshape([2i64, 3]);
        let codes = codes_from_output(&t, OutputKind::Scores { n_classes: 3 }, 2).unwrap();
        assert_eq!(codes, vec![0, 2]);
    }

    #[test]
    fn class_code_output_is_rounded() {
        let t = Tensor::from_slice(&[1.6f32]);
        let codes = codes_from_output(&t, OutputKind::ClassCode, 1).unwrap();
        assert_eq!(codes, vec![2]);

        let t = Tensor::from_slice(&[7.0f32]).reshape([1i64, 1]);
        let codes = codes_from_output(&t, OutputKind::ClassCode, 1).unwrap();
        assert_eq!(codes, vec![7]);
    }

    #[test]
    fn wrong_row_count_is_a_shape_error() {
        let t = Tensor::from_slice(&[0.1f32, 2.0, 0.5]).reshape([1i64, 3]);
        let err = codes_from_output(&t, OutputKind::Scores { n_classes: 3 }, 2).unwrap_err();
        assert!(matches!(err, ModelError::Shape { .. }));

        let t = Tensor::from_slice(&[0.0f32, 1.0]);
        let err = codes_from_output(&t, OutputKind::ClassCode, 1).unwrap_err();
        assert!(matches!(err, ModelError::Shape { .. }));
    }

    #[test]
    fn wrong_class_count_is_a_shape_error() {
        let t = Tensor::from_slice(&[0.1f32, 2.0]).reshape([1i64, 2]);
        let err = codes_from_output(&t, OutputKind::Scores { n_classes: 3 }, 1).unwrap_err();
        assert!(matches!(err, ModelError::Shape { .. }));
    }
}
