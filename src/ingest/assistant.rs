/// Farming assistant chat endpoint (`POST /chat`).
///
/// Thin wrapper: the answer text is produced server-side. Failures reuse the
/// submission taxonomy (validation / network / server).

use serde::{Deserialize, Serialize};

use crate::model::{SubmitError, ValidationError};

pub const CHAT_PATH: &str = "/chat";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// Decodes a `/chat` response body.
pub fn parse_chat_response(status: u16, body: &str) -> Result<String, SubmitError> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from));
        return Err(match detail {
            Some(detail) => SubmitError::Server { status, detail },
            None => SubmitError::Network(format!("HTTP error: {}", status)),
        });
    }

    serde_json::from_str::<ChatResponse>(body)
        .map(|r| r.response)
        .map_err(|e| SubmitError::Network(format!("Parse error: {}", e)))
}

/// Sends one question to the assistant. Blank questions never reach the network.
pub fn ask(
    client: &reqwest::blocking::Client,
    base_url: &str,
    query: &str,
) -> Result<String, SubmitError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery.into());
    }

    let response = client
        .post(super::endpoint(base_url, CHAT_PATH))
        .json(&ChatRequest { query })
        .send()
        .map_err(|e| SubmitError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .map_err(|e| SubmitError::Network(e.to_string()))?;

    parse_chat_response(status, &body)
}
