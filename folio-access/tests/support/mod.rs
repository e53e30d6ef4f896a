//! Shared test harness for folio-access integration tests.
//!
//! In-memory stand-ins for the search index and record lookup, plus catalog
//! and requester builders.

// Not every integration test crate uses every helper.
#![allow(dead_code)]

use folio_access::{
    combine_condition_query, AccessError, Catalog, IndexFut, IndexQueryService, LicenseType,
    RecordAccessInfo, RecordLookup,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Search index
// =============================================================================

/// Index answering condition queries from a fixed set of matching queries
#[derive(Default)]
pub struct MemoryIndex {
    matching: HashSet<String>,
    match_all: bool,
    unreachable: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MemoryIndex {
    /// Every query matches nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every query matches
    pub fn match_all() -> Self {
        Self {
            match_all: true,
            ..Self::default()
        }
    }

    /// Every query fails with `IndexUnreachable`
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Record `conditions` as matching the document found by `existence_query`
    pub fn with_match(mut self, existence_query: &str, conditions: &str) -> Self {
        self.matching
            .insert(combine_condition_query(existence_query, conditions));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    fn answer(&self, filter: &str) -> Result<bool, AccessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(filter.to_string());
        if self.unreachable {
            return Err(AccessError::index_unreachable("index offline"));
        }
        Ok(self.match_all || self.matching.contains(filter))
    }
}

impl IndexQueryService for MemoryIndex {
    fn exists<'a>(&'a self, filter: &'a str) -> IndexFut<'a, bool> {
        Box::pin(async move { self.answer(filter) })
    }

    fn count_matches<'a>(&'a self, filter: &'a str) -> IndexFut<'a, u64> {
        Box::pin(async move { self.answer(filter).map(u64::from) })
    }
}

// =============================================================================
// Record lookup
// =============================================================================

/// Records keyed by identifier; file documents keyed by their probe query
#[derive(Default)]
pub struct MemoryRecords {
    records: HashMap<String, RecordAccessInfo>,
    files: HashMap<String, RecordAccessInfo>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, info: RecordAccessInfo) -> Self {
        self.records.insert(info.pi.clone(), info);
        self
    }

    /// Register a file document; `pi` is taken from `info`
    pub fn with_file(mut self, file: &str, info: RecordAccessInfo) -> Self {
        let probe = folio_access::generate_access_check_query(&info.pi, file)
            .expect("valid file reference");
        self.files.insert(probe, info);
        self
    }
}

impl RecordLookup for MemoryRecords {
    fn find_record<'a>(&'a self, pi: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>> {
        Box::pin(async move { Ok(self.records.get(pi).cloned()) })
    }

    fn find_file<'a>(&'a self, filter: &'a str) -> IndexFut<'a, Option<RecordAccessInfo>> {
        Box::pin(async move { Ok(self.files.get(filter).cloned()) })
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Access-condition set from names
pub fn conditions(names: &[&str]) -> std::collections::BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Catalog holding only the given license types
pub fn catalog_of(types: Vec<LicenseType>) -> Catalog {
    types
        .into_iter()
        .fold(Catalog::builder(), |b, lt| b.license_type(lt))
        .build()
        .expect("valid catalog")
}

/// Existence query of the record document `pi`
pub fn record_query(pi: &str) -> String {
    folio_access::generate_record_query(pi).expect("valid identifier")
}
