//! Shared utilities: the HTTP transport wrapper and credential redaction.

mod http;

pub use http::{redact_credentials, HttpClient, HttpFailure};
