//! Limit/offset query parameters

use serde::{Deserialize, Serialize};

/// `limit` and `offset` read from the query string
///
/// Both are optional; values that are zero or negative are ignored, matching
/// the behaviour of an unrestricted listing.
///
/// # Example
/// ```rust,ignore
/// pub async fn list_topics(Query(limits): Query<LimitParams>) -> Json<Vec<Topic>> {
///     Json(limits.apply(load_topics()))
/// }
///
/// // Usage:
/// GET /topics?limit=10
/// GET /topics?limit=10&offset=20
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitParams {
    /// Maximum number of items to return
    pub limit: Option<i64>,

    /// Number of items to skip
    pub offset: Option<i64>,
}

impl LimitParams {
    /// Effective limit, if one applies
    pub fn limit(&self) -> Option<usize> {
        positive(self.limit)
    }

    /// Effective offset, if one applies
    pub fn offset(&self) -> Option<usize> {
        positive(self.offset)
    }

    /// Apply offset then limit to an already materialized listing
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skipped = items.into_iter().skip(self.offset().unwrap_or(0));
        match self.limit() {
            Some(limit) => skipped.take(limit).collect(),
            None => skipped.collect(),
        }
    }
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
}
