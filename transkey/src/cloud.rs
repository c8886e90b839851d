//! HTTP backends for completion and translation.
//!
//! Both talk to a user-deployed server:
//!
//! - `GET  {base}/complete?input=..&locale=..` -> `["你好", ...]` or `null`
//! - `GET  {base}/ready?metered=..&background=..` -> any 2xx once the model
//!   is available (the server may start downloading it on this call)
//! - `POST {base}/translate` `{"text","source","target"}` ->
//!   `{"translation": "..."}` (`null` when there is no translation)
//!
//! Uses `reqwest` blocking client; translation calls already run on the
//! pipeline's background threads. Network failures come back as errors and
//! the core degrades them (empty list / original text).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use transkey_core::{
    CompletionError, CompletionService, DownloadConditions, TranslateError, Translator,
};

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

fn build_client(timeout_ms: u64) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Parse a completion response body.
pub fn parse_completions(body: &str) -> Result<Option<Vec<String>>, CompletionError> {
    serde_json::from_str(body).map_err(|e| CompletionError::Rejected(format!("bad response: {}", e)))
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation: Option<String>,
}

/// Parse a translation response body.
pub fn parse_translation(body: &str) -> Result<Option<String>, TranslateError> {
    serde_json::from_str::<TranslateResponse>(body)
        .map(|r| r.translation.filter(|t| !t.is_empty()))
        .map_err(|e| TranslateError::Service(format!("bad response: {}", e)))
}

/// Completion service backed by `{base}/complete`.
pub struct CloudCompletion {
    base_url: String,
    client: Client,
}

impl CloudCompletion {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_MS)
    }

    pub fn with_timeout(base_url: &str, timeout_ms: u64) -> reqwest::Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client(timeout_ms)?,
        })
    }

    /// Request URL for `input`.
    pub fn url(&self, input: &str, locale: &str) -> String {
        format!(
            "{}?input={}&locale={}",
            endpoint(&self.base_url, "complete"),
            urlencoding::encode(input),
            urlencoding::encode(locale)
        )
    }
}

impl CompletionService for CloudCompletion {
    fn complete(&self, input: &str, locale: &str) -> Result<Option<Vec<String>>, CompletionError> {
        let url = self.url(input, locale);
        debug!(%url, "cloud completion request");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CompletionError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CompletionError::Rejected(response.status().to_string()));
        }
        let body = response
            .text()
            .map_err(|e| CompletionError::Unreachable(e.to_string()))?;
        parse_completions(&body)
    }
}

/// Translator backed by `{base}/ready` and `{base}/translate`.
pub struct CloudTranslator {
    base_url: String,
    client: Client,
}

impl CloudTranslator {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        // Translation is off the typing path; allow for model cold starts.
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_MS * 10)
    }

    pub fn with_timeout(base_url: &str, timeout_ms: u64) -> reqwest::Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            client: build_client(timeout_ms)?,
        })
    }

    /// Readiness URL carrying the download conditions.
    pub fn ready_url(&self, conditions: &DownloadConditions) -> String {
        format!(
            "{}?metered={}&background={}",
            endpoint(&self.base_url, "ready"),
            conditions.allow_metered_network,
            conditions.allow_background
        )
    }
}

impl Translator for CloudTranslator {
    fn ensure_ready(&self, conditions: &DownloadConditions) -> Result<(), TranslateError> {
        let response = self
            .client
            .get(self.ready_url(conditions))
            .send()
            .map_err(|e| TranslateError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TranslateError::NotReady(response.status().to_string()))
        }
    }

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<Option<String>, TranslateError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "translate"))
            .json(&TranslateRequest {
                text,
                source,
                target,
            })
            .send()
            .map_err(|e| TranslateError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TranslateError::Service(response.status().to_string()));
        }
        let body = response
            .text()
            .map_err(|e| TranslateError::Unavailable(e.to_string()))?;
        parse_translation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_url_is_encoded() {
        let cloud = CloudCompletion::new("http://localhost:8080/").unwrap();
        assert_eq!(
            cloud.url("ni hao", "zh-Hans"),
            "http://localhost:8080/complete?input=ni%20hao&locale=zh-Hans"
        );
    }

    #[test]
    fn test_ready_url_carries_conditions() {
        let cloud = CloudTranslator::new("http://localhost:8080").unwrap();
        assert_eq!(
            cloud.ready_url(&DownloadConditions::default()),
            "http://localhost:8080/ready?metered=false&background=true"
        );
    }

    #[test]
    fn test_parse_completions() {
        assert_eq!(
            parse_completions(r#"["你好","你号"]"#).unwrap(),
            Some(vec!["你好".to_string(), "你号".to_string()])
        );
        assert_eq!(parse_completions("null").unwrap(), None);
        assert!(matches!(
            parse_completions("<html>"),
            Err(CompletionError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_translation() {
        assert_eq!(
            parse_translation(r#"{"translation":"Hello"}"#).unwrap().as_deref(),
            Some("Hello")
        );
        assert_eq!(parse_translation(r#"{"translation":null}"#).unwrap(), None);
        assert_eq!(parse_translation(r#"{"translation":""}"#).unwrap(), None);
        assert!(parse_translation("{}").unwrap().is_none());
        assert!(parse_translation("oops").is_err());
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        // Nothing listens on the discard port locally.
        let cloud = CloudCompletion::with_timeout("http://127.0.0.1:9", 200).unwrap();
        assert!(matches!(
            cloud.complete("ni", "zh-Hans"),
            Err(CompletionError::Unreachable(_))
        ));

        let translator = CloudTranslator::with_timeout("http://127.0.0.1:9", 200).unwrap();
        assert!(matches!(
            translator.ensure_ready(&DownloadConditions::default()),
            Err(TranslateError::Unavailable(_))
        ));
    }

    // Needs a running server.
    #[test]
    #[ignore]
    fn test_real_server() {
        let cloud = CloudCompletion::new("http://localhost:8080").unwrap();
        println!("{:?}", cloud.complete("nihao", "zh-Hans"));
    }
}
