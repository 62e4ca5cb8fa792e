use crate::error::{Result, ScitterError};
use std::borrow::Cow;
use std::num::NonZeroU32;

/// Filters accepted by the timeline endpoints.
///
/// Each variant maps to one query key. When the same key shows up more than
/// once in a request, the last occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Upper bound on returned statuses (`count`).
    Count(NonZeroU32),
    /// Only statuses newer than this id (`since_id`).
    SinceId(u64),
    /// Only statuses at or older than this id (`max_id`).
    MaxId(u64),
    /// 1-based page of results (`page`).
    Page(NonZeroU32),
    /// Select the user for `user_timeline` (`user_id`).
    UserId(u64),
    /// Select the user for `user_timeline` (`screen_name`).
    ScreenName(String),
}

impl QueryParam {
    /// `Count(n)`; `n` must be positive.
    ///
    /// ```
    /// use scitter_api::QueryParam;
    ///
    /// assert_eq!(QueryParam::count(5).unwrap().to_pair().1, "5");
    /// assert!(QueryParam::count(0).is_err());
    /// ```
    pub fn count(n: u32) -> Result<Self> {
        NonZeroU32::new(n)
            .map(QueryParam::Count)
            .ok_or_else(|| ScitterError::InvalidParam("count must be greater than zero".into()))
    }

    /// `Page(n)`; pages start at 1.
    pub fn page(n: u32) -> Result<Self> {
        NonZeroU32::new(n)
            .map(QueryParam::Page)
            .ok_or_else(|| ScitterError::InvalidParam("page must be greater than zero".into()))
    }

    pub fn key(&self) -> &'static str {
        match self {
            QueryParam::Count(_) => "count",
            QueryParam::SinceId(_) => "since_id",
            QueryParam::MaxId(_) => "max_id",
            QueryParam::Page(_) => "page",
            QueryParam::UserId(_) => "user_id",
            QueryParam::ScreenName(_) => "screen_name",
        }
    }

    pub fn to_pair(&self) -> (&'static str, Cow<'_, str>) {
        let value = match self {
            QueryParam::Count(n) | QueryParam::Page(n) => Cow::Owned(n.to_string()),
            QueryParam::SinceId(id) | QueryParam::MaxId(id) | QueryParam::UserId(id) => {
                Cow::Owned(id.to_string())
            }
            QueryParam::ScreenName(name) => Cow::Borrowed(name.as_str()),
        };
        (self.key(), value)
    }
}

/// Query pairs in first-seen key order, later duplicates overriding earlier ones.
pub(crate) fn to_query(params: &[QueryParam]) -> Vec<(&'static str, Cow<'_, str>)> {
    let mut pairs: Vec<(&'static str, Cow<'_, str>)> = Vec::with_capacity(params.len());
    for param in params {
        let (key, value) = param.to_pair();
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => pairs.push((key, value)),
        }
    }
    pairs
}
