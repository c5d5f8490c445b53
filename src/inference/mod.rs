// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound client for the detection models.
//!
//! The service never runs a model itself. Each detector is an external HTTP
//! endpoint that accepts `{"imageUrl": "..."}` and answers with
//! `{"label": "...", "confidence": 0.97}`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::config::ServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("no inference endpoint configured for this detector")]
    NotConfigured,

    #[error("failed to build inference HTTP client: {0}")]
    Client(String),

    #[error("inference request failed: {0}")]
    Request(String),

    #[error("inference endpoint returned status {0}")]
    Status(u16),

    #[error("inference response was invalid: {0}")]
    InvalidResponse(String),
}

/// Which detector to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    BrainTumor,
    Alzheimer,
}

impl Detector {
    pub fn as_str(self) -> &'static str {
        match self {
            Detector::BrainTumor => "brain_tumor",
            Detector::Alzheimer => "alzheimer",
        }
    }
}

/// A single model prediction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Prediction {
    /// Predicted class, e.g. "glioma" or "no_tumor"
    pub label: String,
    /// Model confidence in `[0, 1]`
    pub confidence: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictionRequest<'a> {
    image_url: &'a str,
}

const NEGATIVE_TUMOR_LABELS: &[&str] = &["notumor", "negative", "normal", "healthy", "none"];

/// Whether a brain-tumor label reports a tumor.
///
/// Case and separators are ignored, so `no_tumor`, `No Tumor` and `notumor`
/// are all negative.
pub fn label_indicates_tumor(label: &str) -> bool {
    let normalized: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    !normalized.is_empty() && !NEGATIVE_TUMOR_LABELS.contains(&normalized.as_str())
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    tumor_url: Option<Url>,
    alzheimer_url: Option<Url>,
    http: Client,
}

impl InferenceClient {
    pub fn new(
        tumor_url: Option<Url>,
        alzheimer_url: Option<Url>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Client(e.to_string()))?;

        Ok(Self {
            tumor_url,
            alzheimer_url,
            http,
        })
    }

    /// Build a client from configuration, or `None` if no detector is configured.
    pub fn from_config(config: &ServerConfig) -> Result<Option<Self>, InferenceError> {
        if config.tumor_inference_url.is_none() && config.alzheimer_inference_url.is_none() {
            return Ok(None);
        }
        Self::new(
            config.tumor_inference_url.clone(),
            config.alzheimer_inference_url.clone(),
            config.inference_timeout,
        )
        .map(Some)
    }

    pub fn endpoint(&self, detector: Detector) -> Option<&Url> {
        match detector {
            Detector::BrainTumor => self.tumor_url.as_ref(),
            Detector::Alzheimer => self.alzheimer_url.as_ref(),
        }
    }

    /// Ask `detector` to classify the image at `image_url`.
    pub async fn predict(&self, detector: Detector, image_url: &str) -> Result<Prediction, InferenceError> {
        let endpoint = self.endpoint(detector).ok_or(InferenceError::NotConfigured)?;

        tracing::debug!(detector = detector.as_str(), %endpoint, "Requesting prediction");

        let response = self
            .http
            .post(endpoint.clone())
            .json(&PredictionRequest { image_url })
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InferenceError::Status(response.status().as_u16()));
        }

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        if prediction.label.trim().is_empty() {
            return Err(InferenceError::InvalidResponse("empty label".to_string()));
        }

        Ok(prediction)
    }
}
