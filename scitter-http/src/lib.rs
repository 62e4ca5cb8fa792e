//! Minimal HTTP transport with safe logging, opt-in retries, and Basic/Bearer auth.
//!
//! - Request options: `Auth`, query params, timeout, retry budget
//! - [`HttpClient::get_raw`] hands back status + body for every HTTP status;
//!   only transport failures are errors
//! - [`HttpClient::get_json`] additionally maps non-2xx to [`HttpError::Api`]
//! - Network failures carry a [`TransportErrorKind`]
//! - Optional *raw* request/response logging via `SCITTER_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), scitter_http::HttpError> {
//! use scitter_http::{Auth, HttpClient, RequestOpts};
//!
//! let client = HttpClient::new("https://api.example.com")?;
//! let raw = client
//!     .get_raw(
//!         "account/verify_credentials.json",
//!         RequestOpts {
//!             auth: Some(Auth::Basic { username: "bob", password: "secret" }),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("{} -> {} bytes", raw.status, raw.body.len());
//! # Ok(()) }
//! ```
//!
//! Security: credentials never reach the logs. Events only carry the auth kind
//! (basic/bearer/none), and secret-looking query keys are redacted.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use uuid::Uuid;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "SCITTER_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;
const USER_AGENT: &str = concat!("scitter/", env!("CARGO_PKG_VERSION"));

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "client_secret",
    "bearer",
    "password",
    "oauth_token",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, auth_kind: &str) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    match auth_kind {
        "basic" => parts.push("-H 'Authorization: Basic <redacted>'".to_string()),
        "bearer" => parts.push("-H 'Authorization: Bearer <redacted>'".to_string()),
        _ => {}
    }
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        shown
            .query_pairs_mut()
            .clear()
            .extend_pairs(pairs.iter().map(|(k, v)| {
                let value = if is_secret_key(k) { "<redacted>" } else { v.as_str() };
                (k.as_str(), value)
            }));
    }
    parts.push(format!("'{}'", shown.as_str().replace('\'', r"'\''")));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie")
            {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_QUERY_KEYS.contains(&lower.as_str())
}

fn redact_query_pairs(query: &[(&str, Cow<'_, str>)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| {
            let value = if is_secret_key(k) {
                "<redacted>".to_string()
            } else {
                v.as_ref().to_string()
            };
            ((*k).to_string(), value)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

/// Coarse classification of a failure that happened before an HTTP status
/// was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    ConnectionRefused,
    DnsFailure,
    Tls,
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::ConnectionRefused => "connection_refused",
            TransportErrorKind::DnsFailure => "dns_failure",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    /// Credentials rejected locally; nothing was sent.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("network error ({kind}): {message}")]
    Network {
        kind: TransportErrorKind,
        message: String,
    },
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// Transport classification, if this is a network-level failure.
    pub fn kind(&self) -> Option<TransportErrorKind> {
        match self {
            HttpError::Network { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client.
///
/// ```
/// use scitter_http::Auth;
///
/// let basic = Auth::Basic { username: "bob", password: "secret" };
/// assert_eq!(basic.kind(), "basic");
/// assert_eq!(Auth::None.kind(), "none");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Basic base64(username:password)
    Basic {
        username: &'a str,
        password: &'a str,
    },
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    None,
}

impl Auth<'_> {
    /// Log-safe label for the strategy.
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Basic { .. } => "basic",
            Auth::Bearer(_) => "bearer",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use scitter_http::RequestOpts;
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(0),
///     query: Some(vec![("count", Cow::Borrowed("5"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("count", "5".into())]
}

/// A response of any HTTP status, body fully buffered.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Server-provided `x-request-id` / `x-correlation-id`, or `-`.
    pub request_id: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Truncated, lossy UTF-8 view of the body for logs and error messages.
    pub fn body_snippet(&self) -> String {
        snip_body(&self.body)
    }

    /// Best-effort human readable error message from the body.
    pub fn error_message(&self) -> String {
        extract_error_message(&self.body)
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// The base path always ends in `/`, so relative request paths are joined
    /// underneath it rather than replacing its last segment.
    ///
    /// ```no_run
    /// use scitter_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/1")?;
    /// assert_eq!(client.base_url().as_str(), "https://api.example.com/1/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(HttpError::Url(format!("{base} cannot be used as a base URL")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the default retry budget returned by [`HttpClient::new`].
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join `path` under the base URL. Paths resolving to another origin
    /// (absolute URLs, `scheme:` prefixes) are rejected.
    pub fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))?;
        if url.origin() != self.base.origin() {
            return Err(HttpError::Url(format!(
                "path {path:?} leaves base {}",
                self.base
            )));
        }
        Ok(url)
    }

    /// GET returning status, headers and body for any HTTP status.
    ///
    /// Only transport-level failures (and URL/auth build failures) are errors.
    pub async fn get_raw(&self, path: &str, opts: RequestOpts<'_>) -> Result<RawResponse, HttpError> {
        self.execute(Method::GET, path, opts).await
    }

    /// GET JSON; non-2xx statuses become [`HttpError::Api`].
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let raw = self.get_raw(path, opts).await?;
        let snippet = raw.body_snippet();

        if !raw.is_success() {
            let message = raw.error_message();
            tracing::warn!(
                status=%raw.status,
                message=%message,
                x_request_id=%raw.request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status: raw.status,
                message,
                request_id: raw.request_id,
            });
        }

        serde_json::from_slice::<T>(&raw.body).map_err(|e| {
            tracing::warn!(
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e.to_string(),
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn execute(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let url = self.resolve(path)?;

        let auth = opts.auth.clone().unwrap_or(Auth::None);
        let bearer = match &auth {
            Auth::Bearer(tok) => Some(sanitize_token(tok)?),
            _ => None,
        };
        if let Auth::Basic { username, .. } = &auth {
            validate_basic_username(username)?;
        }

        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let redacted_q = opts
            .query
            .as_deref()
            .map(redact_query_pairs)
            .unwrap_or_default();
        let req_id = format!("r{}", Uuid::new_v4().simple());
        let mut attempt = 0usize;

        loop {
            // ----- Build request -----
            let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }

            match &auth {
                Auth::Basic { username, password } => {
                    rb = rb.basic_auth(username, Some(password));
                }
                Auth::Bearer(_) => {
                    if let Some(tok) = &bearer {
                        rb = rb.bearer_auth(tok);
                    }
                }
                Auth::None => {}
            }

            let request = rb.build().map_err(|e| HttpError::Build(e.to_string()))?;

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", request.url().host_str().unwrap_or("-"), request.url().path()),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind=auth.kind(),
                "http.request.start"
            );

            if raw_enabled() {
                let curl = make_curl(&method, request.url(), auth.kind());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let resp = match self.inner.execute(request).await {
                Ok(resp) => resp,
                Err(err) => {
                    let kind = classify_reqwest_error(&err);
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            kind=%kind,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        kind=%kind,
                        message=%message,
                        "http.network_error.send"
                    );
                    return Err(HttpError::Network { kind, message });
                }
            };
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let kind = classify_reqwest_error(&err);
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            kind=%kind,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        kind=%kind,
                        message=%message,
                        "http.network_error.body"
                    );
                    return Err(HttpError::Network { kind, message });
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let request_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            let limit = headers
                .get("x-rate-limit-limit")
                .or_else(|| headers.get("x-ratelimit-limit"))
                .and_then(|v| v.to_str().ok());
            let remain = headers
                .get("x-rate-limit-remaining")
                .or_else(|| headers.get("x-ratelimit-remaining"))
                .and_then(|v| v.to_str().ok());
            let reset = headers
                .get("x-rate-limit-reset")
                .or_else(|| headers.get("x-ratelimit-reset"))
                .and_then(|v| v.to_str().ok());

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=body.len(),
                x_request_id=%request_id,
                rate_limit.limit=?limit,
                rate_limit.remaining=?remain,
                rate_limit.reset=?reset,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&headers);
                let mut text = String::from_utf8_lossy(&body).into_owned();
                let truncated = truncate_on_char_boundary(&mut text, RAW_MAX_BODY);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snip_body(&body),
                "http.response.body_snippet"
            );

            // ----- Non-success: maybe retry -----
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let retry_after = retry_after_delay_secs(&headers);
                let delay = match retry_after {
                    Some(secs) => Duration::from_secs(secs),
                    // default floor for 429 when no Retry-After is present
                    None if is_429 => backoff(attempt).max(Duration::from_millis(1100)),
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    retry_after_secs=?retry_after,
                    body_snippet=%snip_body(&body),
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            return Ok(RawResponse {
                status,
                headers,
                body,
                request_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1 << shift))
}

fn classify_reqwest_error(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }
    // The outer message embeds the URL, so only the causes are inspected.
    match err.source() {
        Some(cause) => classify_error_chain(cause),
        None => TransportErrorKind::Other,
    }
}

fn classify_error_chain(err: &(dyn StdError + 'static)) -> TransportErrorKind {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return TransportErrorKind::ConnectionRefused,
                io::ErrorKind::TimedOut => return TransportErrorKind::Timeout,
                _ => {}
            }
        }
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("name or service not known")
        {
            return TransportErrorKind::DnsFailure;
        }
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return TransportErrorKind::Tls;
        }
        current = e.source();
    }
    TransportErrorKind::Other
}

fn extract_error_message(body: &[u8]) -> String {
    // {"errors":[{"message":"...", "code": 32}]}
    #[derive(Deserialize)]
    struct ApiErrors {
        errors: Vec<ApiErr>,
    }
    #[derive(Deserialize)]
    struct ApiErr {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
    }

    // {"error":"Could not authenticate you.","request":"/..."} or {"message":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(list) = serde_json::from_slice::<ApiErrors>(body) {
        if let Some(first) = list.errors.into_iter().next() {
            if !first.message.is_empty() {
                return first.message;
            }
            if !first.detail.is_empty() {
                return first.detail;
            }
        }
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if !m.error.is_empty() {
            return m.error;
        }
        if !m.message.is_empty() {
            return m.message;
        }
        if !m.detail.is_empty() {
            return m.detail;
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if truncate_on_char_boundary(&mut snip, SNIPPET_MAX) {
        snip.push_str("...");
    }
    snip
}

/// Truncate to at most `max` bytes without splitting a UTF-8 sequence.
/// Returns whether anything was cut.
fn truncate_on_char_boundary(s: &mut String, max: usize) -> bool {
    if s.len() <= max {
        return false;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    true
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::InvalidCredentials("bearer token is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::InvalidCredentials("bearer token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::InvalidCredentials(
            "bearer token contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::InvalidCredentials(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

fn validate_basic_username(username: &str) -> Result<(), HttpError> {
    if username.contains(':') {
        return Err(HttpError::InvalidCredentials(
            "basic auth username must not contain ':'".into(),
        ));
    }
    if username.chars().any(char::is_control) {
        return Err(HttpError::InvalidCredentials(
            "basic auth username contains control characters".into(),
        ));
    }
    Ok(())
}
