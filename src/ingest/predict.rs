/// Disease prediction endpoint client
///
/// Uploads a leaf photograph to `POST /predict` as multipart form data and
/// decodes the classification. Response decoding is a pure function of
/// (status, body) so every failure shape can be tested without a server.
///
/// Failure mapping:
/// - transport error, non-2xx without a structured detail, or a body that
///   does not decode            -> `SubmitError::Network`
/// - non-2xx with `{"detail": ...}` -> `SubmitError::Server`
/// - 2xx with `{"error": ...}` (model not loaded) -> `SubmitError::Server`

use reqwest::blocking::multipart::{Form, Part};

use crate::model::{Coordinates, ImageUpload, PredictionResult, SubmitError, ValidationError};

pub const PREDICT_PATH: &str = "/predict";

/// Anything that can classify an uploaded image.
pub trait PredictionService {
    fn predict(&self, image: &ImageUpload, at: Coordinates) -> Result<PredictionResult, SubmitError>;
}

/// Renders a FastAPI-style `detail` value as one message. Validation errors
/// arrive as an array of `{loc, msg, type}` objects.
fn detail_text(detail: &serde_json::Value) -> Option<String> {
    match detail {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        _ => None,
    }
}

/// Decodes a `/predict` response.
pub fn parse_predict_response(status: u16, body: &str) -> Result<PredictionResult, SubmitError> {
    let parsed = serde_json::from_str::<serde_json::Value>(body);

    if !(200..300).contains(&status) {
        let detail = parsed
            .ok()
            .and_then(|v| v.get("detail").and_then(detail_text));
        return Err(match detail {
            Some(detail) => SubmitError::Server { status, detail },
            None => SubmitError::Network(format!("HTTP error: {}", status)),
        });
    }

    let value = parsed.map_err(|e| SubmitError::Network(format!("Parse error: {}", e)))?;

    if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
        return Err(SubmitError::Server {
            status,
            detail: msg.to_string(),
        });
    }

    let result: PredictionResult = serde_json::from_value(value)
        .map_err(|e| SubmitError::Network(format!("Parse error: {}", e)))?;

    if !(0.0..=1.0).contains(&result.confidence) {
        return Err(SubmitError::Network(format!(
            "Parse error: confidence {} outside [0, 1]",
            result.confidence
        )));
    }

    Ok(result)
}

/// Calls the backend's `POST /predict`.
pub struct HttpPredictionService {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpPredictionService {
    pub fn new(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            client,
            url: super::endpoint(base_url, PREDICT_PATH),
        }
    }
}

impl PredictionService for HttpPredictionService {
    fn predict(&self, image: &ImageUpload, at: Coordinates) -> Result<PredictionResult, SubmitError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|_| ValidationError::NotAnImage(image.content_type.clone()))?;

        let form = Form::new()
            .part("file", part)
            .text("lat", at.lat.to_string())
            .text("long", at.long.to_string());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| SubmitError::Network(e.to_string()))?;

        parse_predict_response(status, &body)
    }
}

// ============================================================================
// Tests
// ============================================================================
