use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised before or after a request, never by the transport itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("missing required option(s): {}", .0.join(", "))]
    MissingOptions(Vec<String>),

    #[error("invalid value '{value}' for {flag}: expected a whole number")]
    InvalidValue { flag: String, value: String },

    #[error("unknown met_kind '{given}' (expected one of: {})", .known.join(", "))]
    UnknownMetKind { given: String, known: Vec<String> },

    #[error("mesh '{0}' not found in the mesh catalog")]
    MeshNotFound(String),

    #[error("response has no `{0}` field")]
    MissingField(&'static str),
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
}

/// Human-readable description of a non-success response.
pub(crate) fn describe_failure(status: StatusCode, url: &str, body: &str) -> String {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).unwrap_or_default();
    let message = parsed
        .message
        .as_deref()
        .or(parsed.error.as_deref())
        .unwrap_or_else(|| body.trim());
    let detail = parsed.detail.as_deref().unwrap_or("");

    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            "\n- Check apikey/apisecret under [adcirclive] in asgs-global.conf\n- Check that the system clock is correct (the nonce is time-derived)"
        }
        StatusCode::NOT_FOUND => {
            "\n- The API path may have changed, or the configured base URL is incorrect"
        }
        _ => "",
    };

    let mut out = format!("API request failed: HTTP {} for url ({})", status, url);
    out.push_str(hint);
    if !message.is_empty() {
        out.push_str("\n\nServer message: ");
        out.push_str(message);
    }
    if !detail.is_empty() {
        out.push('\n');
        out.push_str(detail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_options_lists_every_flag() {
        let err = CommandError::MissingOptions(vec!["--gridname".into(), "--ncpu".into()]);
        assert_eq!(err.to_string(), "missing required option(s): --gridname, --ncpu");
    }

    #[test]
    fn test_describe_failure_uses_json_message() {
        let text = describe_failure(
            StatusCode::UNAUTHORIZED,
            "https://tools.adcirc.live/api/meshes",
            r#"{"message":"bad signature","detail":"nonce expired"}"#,
        );
        assert!(text.contains("HTTP 401"));
        assert!(text.contains("apikey/apisecret"));
        assert!(text.contains("Server message: bad signature"));
        assert!(text.contains("nonce expired"));
    }

    #[test]
    fn test_describe_failure_falls_back_to_body() {
        let text = describe_failure(StatusCode::BAD_GATEWAY, "http://x/y", "upstream down\n");
        assert!(text.contains("HTTP 502"));
        assert!(text.ends_with("Server message: upstream down"));
    }
}
