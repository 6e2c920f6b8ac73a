//! ONNX inference through tract
#![cfg(feature = "backend-tract")]

use std::path::Path;

use ndarray::{Array2, Array4};
use tract_onnx::prelude::*;

use crate::detector::neural::InferenceBackend;
use crate::error::{Result, ScanError};

/// Tract-based backend for ONNX inference.
///
/// Loads a local model file once; inference never touches the network or disk.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for `input_size` square inputs.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: usize) -> Result<Self> {
        let path = model_path.as_ref();
        let load_err = |stage: &str, err: TractError| ScanError::ModelLoad {
            path: path.to_path_buf(),
            message: format!("{stage}: {err}"),
        };
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| load_err("failed to read model", e))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, input_size, input_size)),
            )
            .map_err(|e| load_err("failed to set input fact", e))?
            .into_optimized()
            .map_err(|e| load_err("failed to optimize model", e))?
            .into_runnable()
            .map_err(|e| load_err("failed to build runnable model", e))?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, input: Array4<f32>) -> Result<Tensor> {
        let shape = input.shape().to_vec();
        if shape != [1, 3, self.input_size, self.input_size] {
            return Err(ScanError::inference(format!(
                "input shape {:?} does not match model input {}x{}",
                shape, self.input_size, self.input_size
            )));
        }
        let array = tract_ndarray::Array4::from_shape_vec(
            (1, 3, self.input_size, self.input_size),
            input.into_raw_vec(),
        )
        .map_err(|e| ScanError::inference(format!("failed to build input tensor: {e}")))?;
        Ok(array.into_tensor())
    }

    fn extract_prediction(outputs: TVec<TValue>) -> Result<Array2<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| ScanError::inference("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ScanError::inference(format!("model output was not f32: {e}")))?;
        // Drop the batch dimension: [1, rows, cols] -> [rows, cols]
        let (rows, cols) = match view.shape() {
            [1, rows, cols] | [rows, cols] => (*rows, *cols),
            _ => {
                return Err(ScanError::inference(format!(
                    "unexpected output shape {:?}",
                    view.shape()
                )));
            }
        };
        Array2::from_shape_vec((rows, cols), view.iter().copied().collect())
            .map_err(|e| ScanError::inference(format!("failed to reshape output: {e}")))
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn run(&mut self, input: Array4<f32>) -> Result<Array2<f32>> {
        let input = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ScanError::inference(format!("ONNX inference failed: {e}")))?;
        Self::extract_prediction(outputs)
    }
}
