use std::env;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use wisestudy_contracts::analysis::{response_schema, validate_analysis, AnalysisResult};

use crate::error::{truncate_text, AnalysisError};
use crate::normalize::NormalizedPayload;
use crate::prompt::ANALYSIS_INSTRUCTION;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Low sampling temperature for consistent, analytical output.
pub const ANALYSIS_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_TIMEOUT_SECS: f64 = 90.0;

const CREDENTIAL_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Reads the single service credential; blank values count as absent.
    pub fn from_env() -> Self {
        Self {
            api_key: CREDENTIAL_VARS.iter().find_map(|key| non_empty_env(key)),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        let trimmed = api_base.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.api_base = trimmed.to_string();
        }
        self
    }

    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        let clamped = if seconds.is_finite() {
            seconds.clamp(15.0, 300.0)
        } else {
            DEFAULT_TIMEOUT_SECS
        };
        self.timeout = Duration::from_secs_f64(clamped);
        self
    }

    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// One POST of a JSON body to the generation endpoint.
pub trait GenerateTransport: Send + Sync {
    fn post_json(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, AnalysisError>;
}

pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            http: HttpClient::builder().build()?,
        })
    }
}

impl GenerateTransport for HttpTransport {
    fn post_json(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, AnalysisError> {
        let response = self
            .http
            .post(endpoint)
            .query(&[("key", api_key)])
            .timeout(timeout)
            .json(payload)
            .send()
            .map_err(|err| AnalysisError::Transport(error_chain_text(&err, 512)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| AnalysisError::Transport(error_chain_text(&err, 512)))?;
        Ok(TransportResponse { status, body })
    }
}

/// Sends one payload to the AI service and validates the structured reply.
///
/// Exactly one transport call per [`AnalysisClient::analyze`]; no retries.
pub struct AnalysisClient {
    config: ClientConfig,
    transport: Box<dyn GenerateTransport>,
}

impl AnalysisClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }

    pub fn with_transport<T: GenerateTransport + 'static>(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn analyze(&self, payload: &NormalizedPayload) -> Result<AnalysisResult, AnalysisError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::error!("API key is missing from the environment");
            return Err(AnalysisError::Configuration);
        };
        tracing::info!(
            "API key loaded (starts with {}...)",
            api_key.chars().take(8).collect::<String>()
        );

        let endpoint = self.config.endpoint();
        let request = build_request(payload);
        tracing::info!(
            model = %self.config.model,
            mime_type = %payload.mime_type,
            payload_bytes = payload.byte_len(),
            "sending analysis request"
        );
        let response = self
            .transport
            .post_json(&endpoint, api_key, &request, self.config.timeout)?;

        if !(200..300).contains(&response.status) {
            let err = AnalysisError::from_status(response.status, &response.body);
            tracing::warn!(status = response.status, kind = err.kind(), "analysis request failed");
            return Err(err);
        }

        let envelope: Value = serde_json::from_str(&response.body).map_err(|err| {
            AnalysisError::ResponseFormat(format!("service returned invalid JSON payload: {err}"))
        })?;
        let text = extract_response_text(&envelope)?;
        parse_analysis_text(&text)
    }
}

/// Request body for `generateContent`: image part, instruction, schema.
pub fn build_request(payload: &NormalizedPayload) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": payload.mime_type,
                        "data": payload.data,
                    }
                },
                { "text": ANALYSIS_INSTRUCTION }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
            "temperature": ANALYSIS_TEMPERATURE,
        }
    })
}

/// Concatenated text of the first candidate, skipping thought parts.
pub fn extract_response_text(envelope: &Value) -> Result<String, AnalysisError> {
    let candidate = envelope
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first());
    let Some(candidate) = candidate else {
        let reason = envelope
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .and_then(Value::as_str);
        return Err(AnalysisError::ResponseFormat(match reason {
            Some(reason) => format!("request blocked by the service ({reason})"),
            None => "no response generated from AI".to_string(),
        }));
    };

    let text = candidate
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        return Err(AnalysisError::ResponseFormat(format!(
            "no response generated from AI (finish reason {finish})"
        )));
    }
    Ok(text)
}

/// Parses the model's JSON text and checks it against the analysis schema.
pub fn parse_analysis_text(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::ResponseFormat("empty response text".to_string()));
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|err| {
        AnalysisError::ResponseFormat(format!(
            "response text is not valid JSON ({err}): {}",
            truncate_text(trimmed, 120)
        ))
    })?;
    let result = validate_analysis(&value).map_err(|err| {
        tracing::warn!(violations = err.violations.len(), "{err}");
        AnalysisError::from(err)
    })?;
    Ok(result)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn error_chain_text(err: &(dyn std::error::Error + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}
