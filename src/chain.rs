//! Ordered fallback resolution of citation evidence.
//!
//! Strategies are tried strongest first. Each one runs only if its evidence is
//! present, and the first strategy returning exactly one record wins. Evidence
//! is never combined across strategies.

use tracing::debug;

use crate::citation::CitationElement;
use crate::lookup::{CandidateSet, IdentifierLookup};
use crate::{RecordId, Result};

/// One way of turning citation evidence into candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Doi,
    /// Journal title plus year
    Journal,
    ReportNumber,
    Isbn,
    /// Title-based book lookup, off by default
    Book,
}

impl Strategy {
    /// Strategies used unless the book fallback is enabled.
    pub const DEFAULT_ORDER: [Strategy; 4] = [
        Strategy::Doi,
        Strategy::Journal,
        Strategy::ReportNumber,
        Strategy::Isbn,
    ];

    /// Whether `element` carries the evidence this strategy needs.
    pub fn applies_to(self, element: &CitationElement) -> bool {
        match self {
            Strategy::Doi => element.doi_string.is_some(),
            Strategy::Journal => element.journal_title.is_some() && element.year.is_some(),
            Strategy::ReportNumber => element.report_num.is_some(),
            Strategy::Isbn => element.isbn.is_some(),
            Strategy::Book => element.title.is_some(),
        }
    }

    fn run(self, lookup: &dyn IdentifierLookup, element: &CitationElement) -> Result<CandidateSet> {
        match self {
            Strategy::Doi => lookup.find_doi(element),
            Strategy::Journal => lookup.find_journal(element),
            Strategy::ReportNumber => lookup.find_report_number(element),
            Strategy::Isbn => lookup.find_isbn(element),
            Strategy::Book => lookup.find_book(element),
        }
    }
}

/// The configured sequence of strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionChain {
    strategies: Vec<Strategy>,
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self {
            strategies: Strategy::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl ResolutionChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the title-based book lookup as the last resort.
    #[must_use]
    pub fn with_book_fallback(mut self) -> Self {
        if !self.strategies.contains(&Strategy::Book) {
            self.strategies.push(Strategy::Book);
        }
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// The record matched by the first strategy with a unique answer.
    pub fn resolve(
        &self,
        lookup: &dyn IdentifierLookup,
        element: &CitationElement,
    ) -> Result<Option<RecordId>> {
        for &strategy in &self.strategies {
            if !strategy.applies_to(element) {
                continue;
            }
            let candidates = strategy.run(lookup, element)?;
            match candidates.single() {
                Some(id) => {
                    debug!(?strategy, id, "Citation resolved");
                    return Ok(Some(id));
                }
                None => debug!(?strategy, candidates = %candidates, "No unique citation match"),
            }
        }
        Ok(None)
    }
}
