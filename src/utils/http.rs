//! HTTP client utilities shared by all engines.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Query parameters whose values are credentials and must never reach a
/// log line or an error message.
const CREDENTIAL_PARAMS: &[&str] = &["prof", "pwd", "wskey", "user"];

/// A failed HTTP exchange, before it is mapped into the engine error
/// taxonomy. `message` is already credential-redacted.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub message: String,
    pub status: Option<u16>,
}

/// Shared HTTP client with bounded timeouts and a pooled connection set.
///
/// Engines hold this behind an `Arc` so concurrent calls share one pool.
/// No retries happen here: retry policy belongs to whoever composes the
/// engines, not to the core.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client: Arc::new(client),
        }
    }

    /// Create from an existing reqwest client (for tests).
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// GET `url` and return the response body, requiring a 2xx status.
    ///
    /// The returned failure carries the HTTP status when there was one, and
    /// never carries credentials: the URL is redacted and reqwest errors
    /// are stripped of their URL before display.
    pub async fn get_text(&self, url: &Url) -> Result<String, HttpFailure> {
        let redacted = redact_credentials(url.as_str());
        tracing::debug!(url = %redacted, "outbound request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                let status = e.status().map(|s| s.as_u16());
                HttpFailure {
                    message: format!("{}: {}", redacted, e.without_url()),
                    status,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %redacted, status = %status, "backend returned error status");
            return Err(HttpFailure {
                message: format!("{}: returned status {}", redacted, status),
                status: Some(status.as_u16()),
            });
        }

        response.text().await.map_err(|e| HttpFailure {
            message: format!("{}: {}", redacted, e.without_url()),
            status: None,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace credential query-parameter values in `url` so the result is safe
/// to log or embed in an error message. An unparseable input yields a
/// placeholder rather than risking a leak.
pub fn redact_credentials(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<unparseable url>".to_string();
    };

    if parsed.query().is_none() {
        return parsed.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            if CREDENTIAL_PARAMS.contains(&k.as_ref()) {
                (k.into_owned(), "[redacted]".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_every_credential_param() {
        let url = "https://eit.example.com/Search?prof=myprof&pwd=s3cret&query=cancer&db=a9h";
        let redacted = redact_credentials(url);

        assert!(!redacted.contains("s3cret"));
        assert!(!redacted.contains("myprof"));
        assert!(redacted.contains("query=cancer"));
        assert!(redacted.contains("db=a9h"));
    }

    #[test]
    fn redacts_wskey() {
        let url = "https://worldcat.example.com/sru?wskey=APIKEY123&query=x";
        assert!(!redact_credentials(url).contains("APIKEY123"));
    }

    #[test]
    fn redacts_registered_email() {
        let url = "https://journaltocs.example.com/api/journals/12345678?output=articles&user=me%40example.org";
        let redacted = redact_credentials(url);
        assert!(!redacted.contains("me%40example.org"));
        assert!(redacted.contains("output=articles"));
    }

    #[test]
    fn leaves_urls_without_query_untouched() {
        let url = "https://example.com/path";
        assert_eq!(redact_credentials(url), "https://example.com/path");
    }

    #[test]
    fn unparseable_input_is_fully_masked() {
        assert_eq!(redact_credentials("not a url at all"), "<unparseable url>");
    }
}
