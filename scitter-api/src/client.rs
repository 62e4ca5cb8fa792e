//! The Scitter client: credential checks and timeline reads.
//!
//! Every call is one GET through [`HttpClient`] with a zero retry budget.
//! 401/403 are interpreted per operation; any other non-2xx status is passed
//! back untouched as a transport error.
use crate::credentials::Credentials;
use crate::decode::{decode_status, decode_timeline, decode_user};
use crate::error::{Result, ScitterError};
use crate::params::{self, QueryParam};
use crate::types::{Status, Timeline};
use scitter_http::{Auth, HttpClient, HttpError, RawResponse, RequestOpts};
use std::borrow::Cow;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://twitter.com/";

/// Paths of the remote operations, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub verify_credentials: String,
    pub friends_timeline: String,
    pub user_timeline: String,
    pub public_timeline: String,
    /// `{id}` is replaced with the requested status id.
    pub show_status: String,
}

impl Endpoints {
    fn paths(&self) -> [&str; 5] {
        [
            self.verify_credentials.as_str(),
            self.friends_timeline.as_str(),
            self.user_timeline.as_str(),
            self.public_timeline.as_str(),
            self.show_status.as_str(),
        ]
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            verify_credentials: "account/verify_credentials.json".into(),
            friends_timeline: "statuses/friends_timeline.json".into(),
            user_timeline: "statuses/user_timeline.json".into(),
            public_timeline: "statuses/public_timeline.json".into(),
            show_status: "statuses/show/{id}.json".into(),
        }
    }
}

pub struct ScitterBuilder {
    credentials: Credentials,
    base_url: String,
    timeout: Option<Duration>,
    endpoints: Endpoints,
}

impl ScitterBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            endpoints: Endpoints::default(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn build(self) -> Result<Scitter> {
        let mut http = HttpClient::new(&self.base_url)
            .map_err(|e| ScitterError::Config(format!("base url {:?}: {e}", self.base_url)))?
            .with_retries(0);
        if let Some(timeout) = self.timeout {
            http = http.with_timeout(timeout);
        }
        for path in self.endpoints.paths() {
            http.resolve(&path.replace("{id}", "0"))
                .map_err(|e| ScitterError::Config(format!("endpoint {path:?}: {e}")))?;
        }
        Ok(Scitter {
            http,
            credentials: self.credentials,
            endpoints: self.endpoints,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Scitter {
    http: HttpClient,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl Scitter {
    /// Client for `username`/`password` against [`DEFAULT_BASE_URL`].
    ///
    /// Nothing is sent until the first call.
    ///
    /// # Panics
    ///
    /// Only if the platform TLS backend cannot be initialised.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_credentials(Credentials::basic(username, password))
    }

    /// Client presenting a bearer token instead of a password.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::with_credentials(Credentials::bearer(token))
    }

    fn with_credentials(credentials: Credentials) -> Self {
        ScitterBuilder::new(credentials)
            .build()
            .expect("default scitter base url")
    }

    pub fn builder(credentials: Credentials) -> ScitterBuilder {
        ScitterBuilder::new(credentials)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `Ok(true)` when the service accepts the credentials, `Ok(false)` on
    /// 401/403 or when they cannot be sent at all (e.g. a `:` in the
    /// username). Failing to reach the service is an error, never `false`.
    pub async fn verify_credentials(&self) -> Result<bool> {
        let sent = self
            .send(
                &self.endpoints.verify_credentials,
                Vec::new(),
                self.credentials.auth(),
            )
            .await;
        let raw = match sent {
            Err(HttpError::InvalidCredentials(reason)) => {
                tracing::info!(
                    reason = %reason,
                    username = ?self.credentials.username(),
                    "scitter.verify_credentials.refused_locally"
                );
                return Ok(false);
            }
            other => other?,
        };

        match raw.status.as_u16() {
            401 | 403 => {
                tracing::info!(
                    status = raw.status.as_u16(),
                    username = ?self.credentials.username(),
                    "scitter.verify_credentials.rejected"
                );
                Ok(false)
            }
            _ if raw.is_success() => {
                let user = decode_user(&raw.body)?;
                tracing::info!(
                    screen_name = %user.screen_name,
                    "scitter.verify_credentials.accepted"
                );
                Ok(true)
            }
            _ => Err(unexpected_status(raw)),
        }
    }

    /// Statuses from accounts the authenticated user follows.
    ///
    /// With no params the service's default page size applies. Fewer items
    /// than a requested `Count` are returned as-is.
    pub async fn friends_timeline(&self, params: &[QueryParam]) -> Result<Timeline> {
        self.timeline(
            "friends_timeline",
            &self.endpoints.friends_timeline,
            params,
            self.credentials.auth(),
        )
        .await
    }

    /// Statuses of one user; the authenticated user unless `UserId` or
    /// `ScreenName` selects another.
    pub async fn user_timeline(&self, params: &[QueryParam]) -> Result<Timeline> {
        self.timeline(
            "user_timeline",
            &self.endpoints.user_timeline,
            params,
            self.credentials.auth(),
        )
        .await
    }

    /// The public timeline. Sent without credentials.
    pub async fn public_timeline(&self) -> Result<Timeline> {
        self.timeline(
            "public_timeline",
            &self.endpoints.public_timeline,
            &[],
            Auth::None,
        )
        .await
    }

    pub async fn show_status(&self, id: u64) -> Result<Status> {
        let path = self.endpoints.show_status.replace("{id}", &id.to_string());
        let raw = self.get(&path, Vec::new(), self.credentials.auth()).await?;
        let raw = require_authorized(raw)?;
        Ok(decode_status(&raw.body)?)
    }

    async fn timeline(
        &self,
        op: &'static str,
        path: &str,
        params: &[QueryParam],
        auth: Auth<'_>,
    ) -> Result<Timeline> {
        let query = params::to_query(params);
        let raw = self.get(path, query, auth).await?;
        let raw = require_authorized(raw)?;
        let timeline = decode_timeline(&raw.body)?;
        tracing::debug!(op, statuses = timeline.len(), "scitter.timeline.fetched");
        Ok(timeline)
    }

    /// GET for data calls: locally refused credentials surface as `Auth`.
    async fn get(
        &self,
        path: &str,
        query: Vec<(&str, Cow<'_, str>)>,
        auth: Auth<'_>,
    ) -> Result<RawResponse> {
        self.send(path, query, auth).await.map_err(|e| match e {
            HttpError::InvalidCredentials(message) => ScitterError::Auth {
                status: 401,
                message,
            },
            other => ScitterError::Transport(other),
        })
    }

    async fn send(
        &self,
        path: &str,
        query: Vec<(&str, Cow<'_, str>)>,
        auth: Auth<'_>,
    ) -> std::result::Result<RawResponse, HttpError> {
        let opts = RequestOpts {
            auth: Some(auth),
            query: (!query.is_empty()).then_some(query),
            retries: Some(0),
            ..Default::default()
        };
        self.http.get_raw(path, opts).await
    }
}

fn require_authorized(raw: RawResponse) -> Result<RawResponse> {
    match raw.status.as_u16() {
        401 | 403 => Err(ScitterError::Auth {
            status: raw.status.as_u16(),
            message: raw.error_message(),
        }),
        _ if raw.is_success() => Ok(raw),
        _ => Err(unexpected_status(raw)),
    }
}

fn unexpected_status(raw: RawResponse) -> ScitterError {
    let message = raw.error_message();
    tracing::warn!(
        status = %raw.status,
        message = %message,
        x_request_id = %raw.request_id,
        "scitter.unexpected_status"
    );
    ScitterError::Transport(HttpError::Api {
        status: raw.status,
        message,
        request_id: raw.request_id,
    })
}
