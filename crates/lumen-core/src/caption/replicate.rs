//! Replicate captioning backend.
//!
//! Submits a prediction referencing the image URL, polls the prediction
//! until it reaches a terminal state, then extracts the caption from the
//! output's string form.

use super::parse::CaptionParser;
use super::{CaptionProvider, CaptionResult};
use crate::config::CaptionConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://api.replicate.com/v1";

/// Caption provider backed by the Replicate predictions API.
pub struct ReplicateCaptioner {
    api_token: String,
    model: String,
    poll_interval: Duration,
    parser: CaptionParser,
    base_url: String,
    client: reqwest::Client,
}

// --- Wire types ---

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

impl ReplicateCaptioner {
    pub fn new(config: &CaptionConfig) -> Self {
        Self {
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            parser: config.output_format,
            base_url: API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn caption_error(image_url: &str, message: String) -> PipelineError {
        PipelineError::Caption {
            image_url: image_url.to_string(),
            message,
        }
    }

    async fn submit(&self, image_url: &str) -> Result<Prediction, PipelineError> {
        let body = PredictionRequest {
            version: model_version(&self.model),
            input: PredictionInput { image: image_url },
        };

        let resp = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::caption_error(image_url, format!("submit failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::caption_error(
                image_url,
                format!("submit returned HTTP {status}: {text}"),
            ));
        }

        resp.json().await.map_err(|e| {
            Self::caption_error(image_url, format!("failed to parse prediction: {e}"))
        })
    }

    async fn fetch(&self, id: &str, image_url: &str) -> Result<Prediction, PipelineError> {
        let resp = self
            .client
            .get(format!("{}/predictions/{id}", self.base_url))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Self::caption_error(image_url, format!("status poll failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::caption_error(
                image_url,
                format!("status poll returned HTTP {status}: {text}"),
            ));
        }

        resp.json().await.map_err(|e| {
            Self::caption_error(image_url, format!("failed to parse prediction: {e}"))
        })
    }

    /// Poll until the prediction reaches a terminal state.
    ///
    /// No attempt cap: the remote side bounds prediction lifetime, and a
    /// dropped request future cancels the loop at its next await.
    async fn wait(
        &self,
        mut prediction: Prediction,
        image_url: &str,
    ) -> Result<Prediction, PipelineError> {
        while !prediction.status.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.fetch(&prediction.id, image_url).await?;
        }
        Ok(prediction)
    }
}

#[async_trait]
impl CaptionProvider for ReplicateCaptioner {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn caption(&self, image_url: &str) -> Result<CaptionResult, PipelineError> {
        let prediction = self.submit(image_url).await?;
        tracing::debug!(id = %prediction.id, image_url, "Submitted prediction");

        let prediction = self.wait(prediction, image_url).await?;

        match prediction.status {
            PredictionStatus::Succeeded => {
                let raw = prediction
                    .output
                    .as_ref()
                    .map(output_text)
                    .unwrap_or_default();
                let caption = self.parser.parse(&raw);
                if caption.is_empty() {
                    tracing::warn!(image_url, raw = %raw, "No caption found in prediction output");
                }
                Ok(CaptionResult {
                    image_url: image_url.to_string(),
                    caption,
                })
            }
            status => {
                let detail = prediction
                    .error
                    .as_ref()
                    .map(output_text)
                    .unwrap_or_default();
                Err(Self::caption_error(
                    image_url,
                    format!("prediction ended as {status:?}: {detail}"),
                ))
            }
        }
    }
}

/// Version hash the predictions API expects.
///
/// Model identifiers may be configured as `owner/model:version`; only the
/// part after the last `:` is submitted.
fn model_version(model: &str) -> &str {
    model.rsplit(':').next().unwrap_or(model)
}

/// String form of a prediction's output value.
///
/// Streamed outputs arrive as an array of string fragments which concatenate
/// into the full text; anything else falls back to its JSON rendering.
fn output_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        other => other.to_string(),
    }
}
