//! Response body decoding into typed values.
//!
//! Unknown fields are ignored so additions on the service side never break
//! decoding. A missing or mistyped required field fails the whole payload;
//! there are no partially populated values.
use crate::types::{Status, Timeline, User};
use serde::de::DeserializeOwned;
use thiserror::Error;

const SNIPPET_MAX: usize = 200;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason} (body: {body_snippet})")]
pub struct DecodeError {
    pub reason: String,
    pub body_snippet: String,
}

pub fn decode_timeline(body: &[u8]) -> Result<Timeline, DecodeError> {
    decode::<Vec<Status>>(body).map(Timeline::from)
}

pub fn decode_status(body: &[u8]) -> Result<Status, DecodeError> {
    decode(body)
}

pub fn decode_user(body: &[u8]) -> Result<User, DecodeError> {
    decode(body)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(body).map_err(|e| {
        let err = DecodeError {
            reason: e.to_string(),
            body_snippet: snippet(body),
        };
        tracing::debug!(
            reason = %err.reason,
            body_snippet = %err.body_snippet,
            "scitter.decode_error"
        );
        err
    })
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(SNIPPET_MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
