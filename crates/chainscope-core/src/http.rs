//! Default GET-JSON fetcher and the HTTP seam behind it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait HttpClient {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<HttpResponse, FetchError>>;
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: concat!("chainscope/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<HttpResponse, FetchError>> {
        let transport = move |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        async move {
            let response = self.client.get(url).send().await.map_err(transport)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(transport)?;
            Ok(HttpResponse { status, body })
        }
        .boxed_local()
    }
}

/// Canned responses keyed by URL, for offline runs and tests.
#[derive(Default)]
pub struct FixtureClient {
    routes: HashMap<String, HttpResponse>,
    hits: RefCell<HashMap<String, usize>>,
}

impl FixtureClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(
            url.into(),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// How many times `url` was requested.
    pub fn hits(&self, url: &str) -> usize {
        self.hits.borrow().get(url).copied().unwrap_or(0)
    }
}

impl HttpClient for FixtureClient {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<HttpResponse, FetchError>> {
        *self.hits.borrow_mut().entry(url.to_string()).or_default() += 1;
        let response = self.routes.get(url).cloned();
        async move {
            response.ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "no fixture for this URL".to_string(),
            })
        }
        .boxed_local()
    }
}

/// GET `url`, require a 2xx status, parse JSON, unwrap `result` if present,
/// reject empty results, and decode into `T`.
pub async fn get_json<T: DeserializeOwned>(
    client: &dyn HttpClient,
    url: &str,
) -> Result<T, FetchError> {
    log::debug!("GET {url}");
    let response = client.get(url).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }
    let body: Value = serde_json::from_str(&response.body).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })?;
    let resolved = unwrap_result(body);
    if is_empty_json(&resolved) {
        return Err(FetchError::Empty {
            url: url.to_string(),
        });
    }
    serde_json::from_value(resolved).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// The `result` member of an object body, or the body itself.
pub fn unwrap_result(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("result") {
            Some(result) => result,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Null, false, zero, and empty strings, arrays or objects.
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://api.example/v1/block";

    fn fixture(status: u16, body: Value) -> FixtureClient {
        FixtureClient::new().route(URL, status, body.to_string())
    }

    #[test]
    fn result_member_is_unwrapped() {
        let client = fixture(200, json!({ "result": { "n": 42 } }));
        let value: Value = pollster::block_on(get_json(&client, URL)).expect("value");
        assert_eq!(value, json!({ "n": 42 }));
    }

    #[test]
    fn body_without_result_is_used_whole() {
        let client = fixture(200, json!({ "gasPrice": "12" }));
        let value: Value = pollster::block_on(get_json(&client, URL)).expect("value");
        assert_eq!(value, json!({ "gasPrice": "12" }));
    }

    #[test]
    fn non_success_status_is_reported_with_code() {
        let client = fixture(404, json!({ "error": "not found" }));
        let err = pollster::block_on(get_json::<Value>(&client, URL)).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn empty_results_are_rejected() {
        for body in [json!({}), json!({ "result": null }), json!({ "result": "" })] {
            let client = fixture(200, body);
            let err = pollster::block_on(get_json::<Value>(&client, URL)).unwrap_err();
            assert!(matches!(err, FetchError::Empty { .. }), "{err}");
            assert!(err.to_string().contains("empty result"));
        }
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let client = FixtureClient::new().route(URL, 200, "<html>rate limited</html>");
        let err = pollster::block_on(get_json::<Value>(&client, URL)).unwrap_err();
        assert!(matches!(err, FetchError::Json { .. }));
    }

    #[test]
    fn shape_mismatch_is_a_decode_error() {
        let client = fixture(200, json!({ "result": "not a number" }));
        let err = pollster::block_on(get_json::<u64>(&client, URL)).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[test]
    fn fixture_counts_hits() {
        let client = fixture(200, json!({ "result": 1 }));
        let _ = pollster::block_on(get_json::<u64>(&client, URL));
        let _ = pollster::block_on(get_json::<u64>(&client, "https://unknown.example"));
        assert_eq!(client.hits(URL), 1);
        assert_eq!(client.hits("https://unknown.example"), 1);
    }

    #[test]
    fn http_config_defaults_fill_missing_fields() {
        let config: HttpConfig = serde_json::from_value(json!({ "timeout_ms": 2500 })).unwrap();
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.user_agent.starts_with("chainscope/"));
    }
}
