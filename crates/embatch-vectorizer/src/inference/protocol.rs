//! Open Inference Protocol (v2) request and response bodies.

use embatch_core::model::ModelInput;
use embatch_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Output tensor returned by text models.
pub const TEXT_OUTPUT: &str = "text_embeds";

/// Output tensor returned by vision models.
pub const IMAGE_OUTPUT: &str = "image_embeds";

#[derive(Debug, Serialize)]
pub struct InferRequest<'a> {
    pub inputs: Vec<InferInput<'a>>,
    pub outputs: [RequestedOutput; 1],
}

#[derive(Debug, Serialize)]
pub struct InferInput<'a> {
    pub name: &'static str,
    pub shape: Vec<usize>,
    pub datatype: &'static str,
    pub data: TensorData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TensorData<'a> {
    Int64(&'a [i64]),
    Fp32(&'a [f32]),
}

#[derive(Debug, Serialize)]
pub struct RequestedOutput {
    pub name: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct InferResponse {
    pub outputs: Vec<InferOutput>,
}

#[derive(Debug, Deserialize)]
pub struct InferOutput {
    pub name: String,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub datatype: Option<String>,
    pub data: Vec<f32>,
}

impl<'a> InferRequest<'a> {
    /// Builds the request body for a prepared batch.
    pub fn new(input: &'a ModelInput) -> Self {
        match input {
            ModelInput::Text(batch) => {
                let shape = vec![batch.rows(), batch.sequence_length()];
                Self {
                    inputs: vec![
                        InferInput {
                            name: "input_ids",
                            shape: shape.clone(),
                            datatype: "INT64",
                            data: TensorData::Int64(batch.input_ids()),
                        },
                        InferInput {
                            name: "attention_mask",
                            shape,
                            datatype: "INT64",
                            data: TensorData::Int64(batch.attention_mask()),
                        },
                    ],
                    outputs: [RequestedOutput { name: TEXT_OUTPUT }],
                }
            }
            ModelInput::Image(batch) => Self {
                inputs: vec![InferInput {
                    name: "pixel_values",
                    shape: batch.shape().to_vec(),
                    datatype: "FP32",
                    data: TensorData::Fp32(batch.pixel_values()),
                }],
                outputs: [RequestedOutput { name: IMAGE_OUTPUT }],
            },
        }
    }

    /// Name of the output tensor carrying the embeddings.
    pub fn output_name(&self) -> &'static str {
        self.outputs[0].name
    }
}

impl InferResponse {
    /// Extracts `rows` embeddings from the named output tensor.
    pub fn into_rows(self, output: &str, rows: usize) -> Result<Vec<Vec<f32>>> {
        let tensor = self
            .outputs
            .into_iter()
            .find(|tensor| tensor.name == output)
            .ok_or_else(|| {
                Error::model_inference(format!("model response has no '{output}' output"))
            })?;

        if let Some(datatype) = &tensor.datatype
            && datatype != "FP32"
        {
            return Err(Error::model_inference(format!(
                "output '{output}' has datatype {datatype}, expected FP32"
            )));
        }

        let [batch, dimension] = tensor.shape[..] else {
            return Err(Error::model_inference(format!(
                "output '{output}' has shape {:?}, expected [batch, dimension]",
                tensor.shape
            )));
        };

        let expected = batch.checked_mul(dimension);
        if batch != rows || dimension == 0 || expected != Some(tensor.data.len()) {
            return Err(Error::model_inference(format!(
                "output '{output}' has shape {:?} with {} values for {rows} inputs",
                tensor.shape,
                tensor.data.len()
            )));
        }

        Ok(tensor
            .data
            .chunks_exact(dimension)
            .map(<[f32]>::to_vec)
            .collect())
    }
}
