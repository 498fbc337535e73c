use std::io;

use wisestudy_contracts::analysis::SchemaError;

const GENERIC_FAILURE: &str = "AI分析服务暂时不可用或无法识别该图片，请重试。";

/// Terminal failure of one analysis request. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("API key is missing; set API_KEY in the environment")]
    Configuration,

    #[error("service rejected the credential ({status}): {detail}")]
    Authorization { status: u16, detail: String },

    #[error("service rate limited the request (429): {detail}")]
    RateLimited { detail: String },

    #[error("service unavailable ({status}): {detail}")]
    ServiceUnavailable { status: u16, detail: String },

    #[error("service request failed ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("request could not be delivered: {0}")]
    Transport(String),

    #[error("malformed analysis response: {0}")]
    ResponseFormat(String),

    #[error("failed reading {path}")]
    InputRead {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl From<SchemaError> for AnalysisError {
    fn from(err: SchemaError) -> Self {
        Self::ResponseFormat(err.to_string())
    }
}

impl AnalysisError {
    /// Maps a non-success HTTP status to its error category.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = service_error_detail(body);
        match status {
            401 | 403 => Self::Authorization { status, detail },
            400 if mentions_invalid_key(body) => Self::Authorization { status, detail },
            429 => Self::RateLimited { detail },
            500 | 502 | 503 | 504 => Self::ServiceUnavailable { status, detail },
            _ => Self::Upstream { status, detail },
        }
    }

    /// Stable code for event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authorization { .. } => "authorization",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Upstream { .. } => "upstream",
            Self::Transport(_) => "transport",
            Self::ResponseFormat(_) => "response_format",
            Self::InputRead { .. } => "input_read",
        }
    }

    /// The one message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration => {
                "配置错误：未检测到 API Key。请在部署环境变量中设置 'API_KEY' 后重试。".to_string()
            }
            Self::Authorization { status, detail } => {
                format!("权限错误：API Key 无效或配额已用完 ({status})。{detail}")
            }
            Self::RateLimited { .. } => "请求过多：请稍后再试 (429 Too Many Requests)。".to_string(),
            Self::ServiceUnavailable { .. } => {
                "服务繁忙：AI 服务暂时不可用，请稍后重试。".to_string()
            }
            Self::ResponseFormat(_) => "分析失败：AI 返回的结果无法解析，请重试。".to_string(),
            Self::InputRead { .. } => "文件读取失败".to_string(),
            Self::Upstream { status, detail } if !detail.is_empty() => {
                format!("分析失败 ({status})：{detail}")
            }
            Self::Upstream { .. } | Self::Transport(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Pulls `error.message` out of a Google API error body, else a trimmed prefix.
fn service_error_detail(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty());
    match message {
        Some(text) => truncate_text(text, 300),
        None => truncate_text(body.trim(), 300),
    }
}

fn mentions_invalid_key(body: &str) -> bool {
    body.contains("API_KEY_INVALID") || body.to_ascii_lowercase().contains("api key not valid")
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(AnalysisError::from_status(403, "").kind(), "authorization");
        assert_eq!(AnalysisError::from_status(401, "").kind(), "authorization");
        assert_eq!(AnalysisError::from_status(429, "").kind(), "rate_limited");
        assert_eq!(
            AnalysisError::from_status(503, "").kind(),
            "service_unavailable"
        );
        assert_eq!(
            AnalysisError::from_status(500, "").kind(),
            "service_unavailable"
        );
        assert_eq!(AnalysisError::from_status(404, "").kind(), "upstream");
    }

    #[test]
    fn bad_request_with_invalid_key_is_authorization() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        let err = AnalysisError::from_status(400, body);
        match err {
            AnalysisError::Authorization { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "API key not valid. Please pass a valid API key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rate_limit_message_mentions_retry_later() {
        let err = AnalysisError::from_status(429, r#"{"error":{"message":"Resource exhausted"}}"#);
        assert!(err.user_message().contains("请稍后再试"));
        assert!(err.user_message().contains("429"));
    }

    #[test]
    fn upstream_without_detail_falls_back_to_generic_message() {
        let err = AnalysisError::from_status(418, "   ");
        assert_eq!(err.user_message(), super::GENERIC_FAILURE);
        let transport = AnalysisError::Transport("connection reset".to_string());
        assert_eq!(transport.user_message(), super::GENERIC_FAILURE);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        match AnalysisError::from_status(502, &body) {
            AnalysisError::ServiceUnavailable { detail, .. } => {
                assert_eq!(detail.chars().count(), 301);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
