//! Interfaces to the external services used during enrichment.
//!
//! The engine never talks to a search index or database directly. Callers
//! provide implementations of [`SearchEngine`], [`IdentifierLookup`] and
//! [`AuthorClaims`]; every method returns a [`Result`] so that a failing
//! service aborts the current record instead of silently producing less
//! enrichment.

use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

use crate::citation::CitationElement;
use crate::{RecordId, Result};

/// Record IDs returned by one lookup.
///
/// Only a set with exactly one member counts as a match; empty and ambiguous
/// sets are treated alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet(BTreeSet<RecordId>);

impl CandidateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sole member, if there is exactly one.
    pub fn single(&self) -> Option<RecordId> {
        self.0.iter().exactly_one().ok().copied()
    }

    /// Drops `id` from the set, if present.
    pub fn remove(&mut self, id: RecordId) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RecordId> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[RecordId; N]> for CandidateSet {
    fn from(ids: [RecordId; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl fmt::Display for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(", "))
    }
}

/// Phrase/boolean search over the catalogue.
pub trait SearchEngine {
    /// Runs `query`, optionally restricted to the named collection.
    fn search(&self, query: &str, collection: Option<&str>) -> Result<CandidateSet>;
}

/// Specialized resolvers for citation evidence.
pub trait IdentifierLookup {
    fn find_doi(&self, element: &CitationElement) -> Result<CandidateSet>;

    /// Resolves `journal_title`, `volume`, `page` and `year`.
    fn find_journal(&self, element: &CitationElement) -> Result<CandidateSet>;

    fn find_report_number(&self, element: &CitationElement) -> Result<CandidateSet>;

    fn find_isbn(&self, element: &CitationElement) -> Result<CandidateSet>;

    /// Title-based book lookup. Only used when the book fallback is enabled.
    fn find_book(&self, _element: &CitationElement) -> Result<CandidateSet> {
        Ok(CandidateSet::new())
    }
}

/// One author signature claim on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub person_id: i64,
    /// Positive when the author claimed the paper, very negative when withdrawn.
    pub flag: i32,
}

/// Author disambiguation store.
pub trait AuthorClaims {
    /// Claims for `name` on `record_id`, in store order.
    fn lookup(&self, record_id: RecordId, name: &str) -> Result<Vec<Claim>>;

    /// Canonical name (for example `J.Smith.1`) of a disambiguated person.
    fn canonical_name(&self, person_id: i64) -> Result<Option<String>>;
}

/// Formats a phrase query on one index field: `field:"value"`.
pub fn phrase_query(field: &str, value: &str) -> String {
    format!("{field}:\"{value}\"")
}
