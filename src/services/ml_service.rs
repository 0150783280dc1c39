//! ML image classification proxy.
//!
//! Relays a multipart image to the configured inference endpoint and
//! passes the upstream verdict through unchanged.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::UploadedImage;

/// Upstream request timeout in seconds
const PREDICT_TIMEOUT_SECS: u64 = 60;

/// ML proxy service
pub struct MlService {
    predict_url: Option<String>,
}

impl MlService {
    /// Create a new ML proxy service
    pub fn new(config: &Config) -> Self {
        Self {
            predict_url: config.ml_predict_url.clone(),
        }
    }

    /// Forward an image to the inference endpoint. Returns the upstream
    /// status code and JSON body verbatim.
    pub async fn predict(&self, image: UploadedImage) -> Result<(u16, serde_json::Value)> {
        let url = self.predict_url.as_deref().ok_or_else(|| {
            AppError::Upstream("ML inference endpoint is not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(PREDICT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client construction failed: {}", e)))?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Validation(format!("Invalid image content type: {}", e)))?;
        // The inference endpoint expects the upload under the `file` key.
        let form = Form::new().part("file", part);

        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("ML service unreachable: {}", e)))?;

        let status = response.status().as_u16();
        let body = response.json::<serde_json::Value>().await.map_err(|e| {
            AppError::Upstream(format!("ML service returned an invalid response: {}", e))
        })?;

        Ok((status, body))
    }
}
