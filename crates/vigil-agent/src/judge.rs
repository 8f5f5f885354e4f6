//! Gemini-backed compliance judge.
//!
//! Sends the current snapshot plus the user's rule to the Gemini
//! `generateContent` endpoint and parses the reply into a [`Verdict`].
//!
//! The model is instructed to answer with a machine-readable leading marker
//! (`VIOLATION: <reason>` or `COMPLIANT`) instead of free prose, so verdict
//! extraction is an exact prefix match rather than a substring guess.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_core::{Judge, JudgeError, SessionSpec, Snapshot, Verdict};

/// Public Gemini API base URL.
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Per-request HTTP timeout. The core's cycle timeout is the outer bound;
/// this keeps a dead connection from eating the whole cycle budget.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(25);

const VIOLATION_MARKER: &str = "VIOLATION";
const COMPLIANT_MARKER: &str = "COMPLIANT";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Judge implementation over the Gemini REST API.
pub struct GeminiJudge {
    client: reqwest::Client,
    endpoint: String,
    timeout: std::time::Duration,
}

impl GeminiJudge {
    /// Build a judge against the public Gemini endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Build a judge against a custom base URL (proxies, tests).
    ///
    /// The timeout is applied per request, not on the client, so it cannot
    /// be lost to a client-builder failure.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(snapshots: &[Snapshot], rule: &str) -> GenerateContentRequest {
        let mut parts = vec![Part::Text(build_prompt(rule))];
        for snapshot in snapshots {
            parts.push(Part::InlineData(InlineData {
                mime_type: "image/png".to_string(),
                data: BASE64.encode(&snapshot.png),
            }));
        }
        GenerateContentRequest {
            contents: vec![Content { parts }],
        }
    }
}

impl Default for GeminiJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn evaluate(
        &self,
        snapshots: &[Snapshot],
        spec: &SessionSpec,
    ) -> Result<Verdict, JudgeError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, spec.model, spec.api_key
        );
        let body = Self::request_body(snapshots, &spec.rule);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Rejected {
                status: status.as_u16(),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::MalformedResponse(e.to_string()))?;

        let text = extract_text(&parsed)
            .ok_or_else(|| JudgeError::MalformedResponse("no candidate text".to_string()))?;

        let verdict = parse_verdict(&text)?;
        debug!(is_violation = verdict.is_violation, "Judge verdict received");
        Ok(verdict)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> JudgeError {
    if e.is_timeout() {
        JudgeError::Timeout
    } else {
        JudgeError::Network(e.to_string())
    }
}

/// Prompt instructing the model to emit an exact verdict marker.
fn build_prompt(rule: &str) -> String {
    format!(
        "You are a strict activity monitor. The user has declared this rule \
         for their current work session:\n\n{rule}\n\n\
         Look at the attached screenshot of their display and decide whether \
         the visible activity violates the rule.\n\
         Answer on the first line with exactly one of:\n\
         {VIOLATION_MARKER}: <one short sentence naming what violates the rule>\n\
         {COMPLIANT_MARKER}\n\
         Do not add anything before the marker."
    )
}

fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let parts = &response.candidates.first()?.content.parts;
    let text: String = parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse the marker protocol into a verdict.
fn parse_verdict(text: &str) -> Result<Verdict, JudgeError> {
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    if let Some(rest) = first_line.strip_prefix(VIOLATION_MARKER) {
        let detail = rest.trim_start_matches([':', '-']).trim();
        let detail = (!detail.is_empty()).then(|| detail.to_string());
        return Ok(Verdict {
            is_violation: true,
            detail,
        });
    }
    if first_line.starts_with(COMPLIANT_MARKER) {
        return Ok(Verdict::compliant());
    }

    Err(JudgeError::MalformedResponse(format!(
        "missing verdict marker in: {first_line:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_violation_with_detail() {
        let verdict = parse_verdict("VIOLATION: YouTube is open in the foreground").unwrap();
        assert!(verdict.is_violation);
        assert_eq!(
            verdict.detail.as_deref(),
            Some("YouTube is open in the foreground")
        );
    }

    #[test]
    fn test_parse_violation_without_detail() {
        let verdict = parse_verdict("VIOLATION").unwrap();
        assert!(verdict.is_violation);
        assert!(verdict.detail.is_none());
    }

    #[test]
    fn test_parse_compliant() {
        let verdict = parse_verdict("COMPLIANT\nThe screen shows an IDE.").unwrap();
        assert!(!verdict.is_violation);
    }

    #[test]
    fn test_parse_skips_leading_blank_lines() {
        let verdict = parse_verdict("\n\n  COMPLIANT").unwrap();
        assert!(!verdict.is_violation);
    }

    #[test]
    fn test_parse_rejects_free_prose() {
        let err = parse_verdict("The user appears to be working.").unwrap_err();
        assert!(matches!(err, JudgeError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(parse_verdict("").is_err());
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "VIOLATION: a game is running"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let text = extract_text(&response).unwrap();
        let verdict = parse_verdict(&text).unwrap();
        assert!(verdict.is_violation);
        assert_eq!(verdict.detail.as_deref(), Some("a game is running"));
    }

    #[test]
    fn test_empty_candidates_yields_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(&response).is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let snapshots = vec![Snapshot::new(vec![1, 2, 3])];
        let body = GeminiJudge::request_body(&snapshots, "no games");
        let json = serde_json::to_value(&body).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("no games"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], BASE64.encode([1, 2, 3]));
    }

    #[test]
    fn test_prompt_names_both_markers() {
        let prompt = build_prompt("rule");
        assert!(prompt.contains("VIOLATION"));
        assert!(prompt.contains("COMPLIANT"));
    }

    #[tokio::test]
    async fn test_stalled_server_yields_timeout_error() {
        // A listener that accepts connections but never answers: the
        // per-request timeout must fire and map to JudgeError::Timeout.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let judge = GeminiJudge::with_endpoint(format!("http://{addr}"))
            .with_timeout(std::time::Duration::from_millis(100));
        let spec = SessionSpec::new("rule", "model", "key");

        let err = judge.evaluate(&[], &spec).await.unwrap_err();
        assert!(matches!(err, JudgeError::Timeout), "{err:?}");
    }
}
