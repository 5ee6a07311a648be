use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Settings;
use crate::error::{CommandError, describe_failure};
use crate::signer::Signer;
use crate::util::urljoin;

pub const MESHES_PATH: &str = "/api/meshes";
pub const ASGS_CONFIG_PATH: &str = "/spa/models/ASGS/api/file/config";
pub const XDMF_STATIC_PATH: &str = "/spa/paraview/XDMF/api/file/static";
pub const XDMF_TIMEVARYING_PATH: &str = "/spa/paraview/XDMF/api/file/timevarying";

/// Signed HTTP client for the ADCIRC Live API.
///
/// Each call samples a new nonce and signs it; nothing is cached between
/// calls and failed requests are not retried.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    signer: Signer,
    progress: bool,
    http: HttpClient,
}

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedFile {
    #[serde(default)]
    content: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).with_context(|| {
            format!(
                "failed to parse API JSON (url={}, status={})",
                self.url, self.status
            )
        })
    }

    /// The generated document carried in the `content` field.
    pub fn content(&self) -> Result<String> {
        let reply: GeneratedFile = self.json()?;
        reply
            .content
            .ok_or_else(|| CommandError::MissingField("content").into())
    }

    /// Diagnostic for a non-success response, `None` on success.
    pub fn failure(&self) -> Option<String> {
        if self.is_success() {
            None
        } else {
            Some(describe_failure(self.status, &self.url, &self.body))
        }
    }
}

impl Client {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("adcirclive-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("adcirclive-rs")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: settings.url.clone(),
            signer: Signer::new(settings.credentials.clone()),
            progress: true,
            http,
        })
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    pub fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request::<()>(Method::GET, path, None)
    }

    pub fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.request(Method::POST, path, Some(body))
    }

    fn request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
    ) -> Result<ApiResponse> {
        let url = urljoin(&self.url, path);
        let signed = self.signer.sign_now();
        debug!(
            %method,
            %url,
            api_key = self.signer.api_key(),
            nonce = %signed.nonce,
            "sending signed request"
        );

        let mut req = self
            .http
            .request(method.clone(), &url)
            .headers(signed.headers()?);
        if let Some(body) = body {
            req = req.json(body);
        }

        let spinner = self.spinner(&method, path);
        let sent = req.send();
        if let Some(pb) = &spinner {
            pb.finish_and_clear();
        }

        let resp = sent.with_context(|| format!("{} {} failed", method, url))?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;
        debug!(%status, bytes = body.len(), "response received");

        Ok(ApiResponse { status, url, body })
    }

    fn spinner(&self, method: &Method, path: &str) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{} {}", method, path));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_only_for_non_success() {
        let ok = ApiResponse {
            status: StatusCode::OK,
            url: "http://x/api/meshes".into(),
            body: "[]".into(),
        };
        assert!(ok.failure().is_none());

        let denied = ApiResponse {
            status: StatusCode::FORBIDDEN,
            ..ok
        };
        assert!(denied.failure().unwrap().contains("HTTP 403"));
    }

    #[test]
    fn test_content_field() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            url: "http://x/spa/paraview/XDMF/api/file/static".into(),
            body: r#"{"content":"<Xdmf Version=\"3.0\"/>","filename":"fort.63.xmf"}"#.into(),
        };
        assert_eq!(resp.content().unwrap(), "<Xdmf Version=\"3.0\"/>");

        let empty = ApiResponse {
            body: r#"{"status":"ok"}"#.into(),
            ..resp
        };
        let err = empty.content().unwrap_err();
        assert_eq!(
            err.downcast_ref::<CommandError>(),
            Some(&CommandError::MissingField("content"))
        );
    }

    #[test]
    fn test_json_error_names_url() {
        let resp = ApiResponse {
            status: StatusCode::OK,
            url: "http://x/api/meshes".into(),
            body: "<html>".into(),
        };
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert!(format!("{err:#}").contains("url=http://x/api/meshes"));
    }
}
