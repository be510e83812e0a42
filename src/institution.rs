//! Memoized institution name resolution.
//!
//! Affiliation strings repeat a lot within a record and across a batch, so the
//! resolver caches each answer for as long as it lives. Keys are the exact
//! input text: `"CERN"` and `"CERN "` are looked up separately.

use std::collections::HashMap;
use tracing::trace;

use crate::lookup::{CandidateSet, SearchEngine, phrase_query};
use crate::Result;

/// Index field queried for institution names.
const INSTITUTION_INDEX: &str = "institution";

/// Resolves institution names against the Institutions collection.
#[derive(Debug, Clone)]
pub struct InstitutionResolver {
    collection: String,
    cache: HashMap<String, CandidateSet>,
}

impl Default for InstitutionResolver {
    fn default() -> Self {
        Self::new("Institutions")
    }
}

impl InstitutionResolver {
    /// Creates a resolver with an empty cache, searching `collection`.
    #[must_use]
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            cache: HashMap::new(),
        }
    }

    /// Candidate institution records for `name`.
    ///
    /// The first call for a given string queries `search`; later calls are
    /// answered from the cache. Failed searches are not cached.
    pub fn resolve(&mut self, search: &dyn SearchEngine, name: &str) -> Result<CandidateSet> {
        if let Some(hit) = self.cache.get(name) {
            trace!(institution = name, "Institution cache hit");
            return Ok(hit.clone());
        }

        let query = phrase_query(INSTITUTION_INDEX, name);
        let ids = search.search(&query, Some(self.collection.as_str()))?;
        self.cache.insert(name.to_string(), ids.clone());
        Ok(ids)
    }

    /// Number of distinct names resolved so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
