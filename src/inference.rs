// src/inference.rs

use anyhow::{Context, Result};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::{debug, info};

/// One output of a model run, copied out of the session
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTensor {
    F32(Vec<f32>),
    I64(Vec<i64>),
    Strings(Vec<String>),
}

impl OutputTensor {
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            OutputTensor::F32(v) => Some(v),
            _ => None,
        }
    }
}

/// Thin wrapper over an ONNX Runtime session on the CPU provider
pub struct InferenceEngine {
    session: Session,
    model_path: String,
}

impl InferenceEngine {
    pub fn new(model_path: &str, num_threads: usize) -> Result<Self> {
        info!("Loading ONNX model: {}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_threads.max(1))?
            .with_inter_threads(1)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model {}", model_path))?;

        info!("✓ Model ready: {}", model_path);

        Ok(Self {
            session,
            model_path: model_path.to_string(),
        })
    }

    /// Run with a flat input buffer of the given shape
    pub fn infer(&mut self, shape: &[usize], input: &[f32]) -> Result<Vec<OutputTensor>> {
        let input_value = Tensor::from_array((shape, input.to_vec().into_boxed_slice()))?;
        self.run(input_value)
    }

    pub fn run(&mut self, input: Tensor<f32>) -> Result<Vec<OutputTensor>> {
        debug!("Running inference on {}", self.model_path);

        let outputs = self
            .session
            .run(ort::inputs![input])
            .context("Inference failed")?;

        let mut result = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let output = &outputs[i];
            let tensor = if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                OutputTensor::F32(data.to_vec())
            } else if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                OutputTensor::I64(data.to_vec())
            } else {
                let (_, strings) = output
                    .try_extract_strings()
                    .with_context(|| format!("Unsupported output type at index {}", i))?;
                OutputTensor::Strings(strings)
            };
            result.push(tensor);
        }

        Ok(result)
    }
}
