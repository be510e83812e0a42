//! Recording stubs of the lookup services, shared by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::chain::Strategy;
use crate::citation::CitationElement;
use crate::lookup::{AuthorClaims, CandidateSet, Claim, IdentifierLookup, SearchEngine};
use crate::{EnrichError, RecordId, Result};

/// Answers fixed queries and records every call.
#[derive(Debug, Default)]
pub(crate) struct StubSearch {
    answers: HashMap<String, CandidateSet>,
    failing: HashSet<String>,
    calls: RefCell<Vec<(String, Option<String>)>>,
}

impl StubSearch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, query: &str, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answers
            .insert(query.to_string(), ids.into_iter().collect());
        self
    }

    pub(crate) fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.borrow().clone()
    }

    pub(crate) fn count(&self, query: &str) -> usize {
        self.calls.borrow().iter().filter(|(q, _)| q == query).count()
    }
}

impl SearchEngine for StubSearch {
    fn search(&self, query: &str, collection: Option<&str>) -> Result<CandidateSet> {
        self.calls
            .borrow_mut()
            .push((query.to_string(), collection.map(str::to_string)));
        if self.failing.contains(query) {
            return Err(EnrichError::collaborator("search", "index unavailable"));
        }
        Ok(self.answers.get(query).cloned().unwrap_or_default())
    }
}

/// One fixed answer per strategy; records which strategies ran.
#[derive(Debug, Default)]
pub(crate) struct StubIdentifiers {
    answers: HashMap<&'static str, CandidateSet>,
    failing: Option<Strategy>,
    calls: RefCell<Vec<(Strategy, CitationElement)>>,
}

impl StubIdentifiers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn answer(mut self, key: &'static str, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answers.insert(key, ids.into_iter().collect());
        self
    }

    pub(crate) fn doi(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answer("doi", ids)
    }

    pub(crate) fn journal(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answer("journal", ids)
    }

    pub(crate) fn report(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answer("report", ids)
    }

    pub(crate) fn isbn(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answer("isbn", ids)
    }

    pub(crate) fn book(self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.answer("book", ids)
    }

    pub(crate) fn failing(mut self, strategy: Strategy) -> Self {
        self.failing = Some(strategy);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Strategy> {
        self.calls.borrow().iter().map(|(s, _)| *s).collect()
    }

    pub(crate) fn elements(&self) -> Vec<CitationElement> {
        self.calls.borrow().iter().map(|(_, e)| e.clone()).collect()
    }

    fn run(
        &self,
        strategy: Strategy,
        key: &str,
        element: &CitationElement,
    ) -> Result<CandidateSet> {
        self.calls.borrow_mut().push((strategy, element.clone()));
        if self.failing == Some(strategy) {
            return Err(EnrichError::collaborator("identifier", "resolver timed out"));
        }
        Ok(self.answers.get(key).cloned().unwrap_or_default())
    }
}

impl IdentifierLookup for StubIdentifiers {
    fn find_doi(&self, element: &CitationElement) -> Result<CandidateSet> {
        self.run(Strategy::Doi, "doi", element)
    }

    fn find_journal(&self, element: &CitationElement) -> Result<CandidateSet> {
        self.run(Strategy::Journal, "journal", element)
    }

    fn find_report_number(&self, element: &CitationElement) -> Result<CandidateSet> {
        self.run(Strategy::ReportNumber, "report", element)
    }

    fn find_isbn(&self, element: &CitationElement) -> Result<CandidateSet> {
        self.run(Strategy::Isbn, "isbn", element)
    }

    fn find_book(&self, element: &CitationElement) -> Result<CandidateSet> {
        self.run(Strategy::Book, "book", element)
    }
}

/// In-memory author claims.
#[derive(Debug, Default)]
pub(crate) struct StubClaims {
    claims: HashMap<(RecordId, String), Vec<Claim>>,
    canonical: HashMap<i64, String>,
}

impl StubClaims {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim(
        mut self,
        record_id: RecordId,
        name: &str,
        person_id: i64,
        flag: i32,
    ) -> Self {
        self.claims
            .entry((record_id, name.to_string()))
            .or_default()
            .push(Claim { person_id, flag });
        self
    }

    pub(crate) fn canonical(mut self, person_id: i64, name: &str) -> Self {
        self.canonical.insert(person_id, name.to_string());
        self
    }
}

impl AuthorClaims for StubClaims {
    fn lookup(&self, record_id: RecordId, name: &str) -> Result<Vec<Claim>> {
        Ok(self
            .claims
            .get(&(record_id, name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn canonical_name(&self, person_id: i64) -> Result<Option<String>> {
        Ok(self.canonical.get(&person_id).cloned())
    }
}
