//! Model loading and local classification.
//!
//! The ONNX classifier is loaded exactly once per process through a
//! `tokio::sync::OnceCell`: concurrent callers before load completion await
//! the same in-flight load instead of triggering duplicates. A load failure
//! is session-blocking and is not retried automatically.
//!
//! Ranking the raw score vector is kept as a pure function (`rank_scores`)
//! so the sort and tie-break contract can be tested without model weights.

use crate::error::{Result, ScanError};
use crate::labels::LABELS;
use crate::preprocess::InputTensor;
use crate::record::{LabelScore, RankedLabels};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tract_onnx::prelude::*;
use tracing::{info, instrument};

/// Primary disease/label prediction capability. Pure function of the tensor
/// and the model weights: no side effects, no I/O.
pub trait LocalClassifier: Send + Sync {
    fn classify(&self, tensor: &InputTensor) -> Result<RankedLabels>;
}

/// Zip a raw score vector with the fixed label set, scale to percentages
/// with 2-decimal precision, and stable-sort descending. Ties keep the
/// label declaration order.
pub fn rank_scores(scores: &[f32]) -> Result<RankedLabels> {
    if scores.len() < LABELS.len() {
        return Err(ScanError::Inference(format!(
            "expected {} scores, model produced {}",
            LABELS.len(),
            scores.len()
        )));
    }

    let mut ranked: RankedLabels = LABELS
        .iter()
        .zip(scores.iter())
        .map(|(label, &score)| LabelScore {
            label: label.to_string(),
            percentage: (f64::from(score) * 10_000.0).round() / 100.0,
        })
        .collect();

    // sort_by is stable, so equal percentages preserve declaration order.
    ranked.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(ranked)
}

/// Tract-backed ONNX classifier.
#[derive(Debug)]
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
}

impl OnnxClassifier {
    /// Load and optimize the model. Blocking; call from a blocking thread.
    pub fn load(path: &Path) -> Result<Self> {
        let shape = InputTensor::shape();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ScanError::ModelLoad(e.to_string()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(shape[0], shape[1], shape[2], shape[3]),
                ),
            )
            .map_err(|e| ScanError::ModelLoad(e.to_string()))?
            .into_optimized()
            .map_err(|e| ScanError::ModelLoad(e.to_string()))?
            .into_runnable()
            .map_err(|e| ScanError::ModelLoad(e.to_string()))?;

        info!(model_path = %path.display(), "Classifier model loaded");
        Ok(Self { plan })
    }
}

impl LocalClassifier for OnnxClassifier {
    fn classify(&self, tensor: &InputTensor) -> Result<RankedLabels> {
        let timer = crate::metrics::INFERENCE_LATENCY.start_timer();

        let input = Tensor::from_shape(&InputTensor::shape(), tensor.as_slice())
            .map_err(|e| ScanError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ScanError::Inference(e.to_string()))?;

        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ScanError::Inference(e.to_string()))?;
        let scores: Vec<f32> = view.iter().cloned().collect();

        timer.observe_duration();
        rank_scores(&scores)
    }
}

/// Session-wide model holder. Lifetime = lifetime of the process. The load
/// outcome is cached either way: a failed load disables scanning for the
/// session and is never re-attempted behind the caller's back.
pub struct ModelLoader {
    path: PathBuf,
    cell: OnceCell<std::result::Result<Arc<OnnxClassifier>, String>>,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Get the loaded classifier, loading it on first call. The load runs
    /// on a blocking thread; all concurrent callers share one load, and
    /// later callers observe the original outcome without a new attempt.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Arc<OnnxClassifier>> {
        let outcome = self
            .cell
            .get_or_init(|| async {
                let path = self.path.clone();
                match tokio::task::spawn_blocking(move || OnnxClassifier::load(&path)).await {
                    Ok(Ok(classifier)) => Ok(Arc::new(classifier)),
                    Ok(Err(ScanError::ModelLoad(message))) => Err(message),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(e.to_string()),
                }
            })
            .await;

        match outcome {
            Ok(classifier) => Ok(Arc::clone(classifier)),
            Err(message) => Err(ScanError::ModelLoad(message.clone())),
        }
    }

    /// Whether the model loaded successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }
}
