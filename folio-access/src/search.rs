//! Search-index collaborators (async)
//!
//! The engine never talks to the search index directly. Callers supply:
//!
//! - [`IndexQueryService`]: existence and count checks for filter expressions
//! - [`RecordLookup`]: the access-condition set of a record or file document
//!
//! Condition checks go through a [`ConditionCache`] scoped to one external
//! request, since file-level checks on the same record repeat the same
//! condition query.
//!
//! The future type aliases handle Send bounds differently for WASM vs native:
//! - Native: `Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>`
//! - WASM: `Pin<Box<dyn Future<Output = Result<T>> + 'a>>` (no Send requirement)

use crate::error::Result;
use crate::types::OPEN_ACCESS;
use core::future::Future;
use core::pin::Pin;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::trace;

#[cfg(not(target_arch = "wasm32"))]
pub type IndexFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

#[cfg(target_arch = "wasm32")]
pub type IndexFut<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

/// Existence checks against the search index.
///
/// Implementations must map transport or index failures to
/// [`AccessError::IndexUnreachable`](crate::AccessError::IndexUnreachable);
/// the engine propagates them untouched.
#[cfg(not(target_arch = "wasm32"))]
pub trait IndexQueryService: Send + Sync {
    /// True if at least one document matches `filter`
    fn exists<'a>(&'a self, filter: &'a str) -> IndexFut<'a, bool>;

    /// Number of documents matching `filter`
    fn count_matches<'a>(&'a self, filter: &'a str) -> IndexFut<'a, u64>;
}

/// WASM version without Send + Sync bounds (single-threaded environment)
#[cfg(target_arch = "wasm32")]
pub trait IndexQueryService {
    fn exists<'a>(&'a self, filter: &'a str) -> IndexFut<'a, bool>;
    fn count_matches<'a>(&'a self, filter: &'a str) -> IndexFut<'a, u64>;
}

/// Access metadata the indexing pipeline attached to a record or file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordAccessInfo {
    /// Identifier of the top-level record
    pub pi: String,
    /// License-type names, possibly including [`OPEN_ACCESS`]
    pub access_conditions: BTreeSet<String>,
    /// Per-record PDF download quota in percent, if configured
    pub pdf_quota: Option<u32>,
}

impl RecordAccessInfo {
    pub fn new<I, S>(pi: impl Into<String>, access_conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pi: pi.into(),
            access_conditions: access_conditions.into_iter().map(Into::into).collect(),
            pdf_quota: None,
        }
    }

    pub fn with_pdf_quota(mut self, quota: u32) -> Self {
        self.pdf_quota = Some(quota);
        self
    }

    /// True if no restriction is recorded, or only the open-access marker
    pub fn is_open_access(&self) -> bool {
        is_open_access(&self.access_conditions)
    }
}

/// Record metadata resolution, supplied by the search layer
#[cfg(not(target_arch = "wasm32"))]
pub trait RecordLookup: Send + Sync {
    /// Access metadata of the record with identifier `pi`, `None` if absent
    fn find_record<'a>(&'a self, pi: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>>;

    /// Access metadata of the first file document matching `filter`
    fn find_file<'a>(&'a self, filter: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>>;
}

#[cfg(target_arch = "wasm32")]
pub trait RecordLookup {
    fn find_record<'a>(&'a self, pi: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>>;
    fn find_file<'a>(&'a self, filter: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>>;
}

/// True if `conditions` is empty or holds nothing but the open-access marker
pub fn is_open_access(conditions: &BTreeSet<String>) -> bool {
    conditions.iter().all(|c| c == OPEN_ACCESS)
}

/// Combine a record existence query with a condition query.
///
/// A blank existence query leaves the condition query on its own.
pub fn combine_condition_query(existence_query: &str, conditions: &str) -> String {
    let existence_query = existence_query.trim();
    if existence_query.is_empty() {
        return format!("+({})", conditions.trim());
    }
    format!("+({}) +({})", existence_query, conditions.trim())
}

/// Request-scoped cache of condition query outcomes.
///
/// Keyed by the combined query string, which already embeds the record
/// identifier. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ConditionCache {
    entries: Arc<RwLock<HashMap<String, bool>>>,
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<bool> {
        self.entries.read().get(query).copied()
    }

    pub fn insert(&self, query: String, matches: bool) {
        self.entries.write().insert(query, matches);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Answer `query` from the cache, or ask the index and remember the result.
    ///
    /// Index failures are propagated and not cached.
    pub async fn matches(&self, index: &dyn IndexQueryService, query: &str) -> Result<bool> {
        if let Some(hit) = self.get(query) {
            trace!(query, hit, "condition cache hit");
            return Ok(hit);
        }
        let matched = index.exists(query).await?;
        trace!(query, matched, "condition query evaluated");
        self.insert(query.to_string(), matched);
        Ok(matched)
    }
}
