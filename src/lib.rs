//! A library for enriching bibliographic records with links to authority records.
//!
//! `biblink` takes MARC-style records whose fields carry loosely-typed text
//! (author names, affiliations, citations, conference numbers, experiment names)
//! and appends subfields holding the numeric IDs of the catalogue records those
//! texts refer to. Existing content is never changed: enrichment only appends.
//!
//! # Key Features
//!
//! - **Append-only record model**: [`DataField::append`] is the only way to
//!   change a field's subfields.
//! - **Citation resolution**: an ordered DOI, journal, report number and ISBN
//!   lookup chain that accepts a match only when it is unique.
//! - **Institution memoization**: repeated affiliation strings hit the search
//!   index once per run.
//! - **MARCXML output**: plain or wrapped in the OAI `marc:` envelope.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use biblink::{RecordEnricher, marcxml};
//!
//! // `search`, `identifiers` and `claims` implement the collaborator traits
//! // from the `lookup` module.
//! let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
//!
//! let mut record = marcxml::parse_record(input)?;
//! let xml = enricher.enhanced_marcxml(&mut record, false)?;
//! println!("{xml}");
//! ```
//!
//! # Error Handling
//!
//! Missing or ambiguous evidence is not an error: the affected field is simply
//! left as it was. Only collaborator failures and unreadable MARCXML surface as
//! [`EnrichError`]:
//!
//! ```rust,ignore
//! match enricher.enrich(&mut record) {
//!     Ok(appended) => println!("Appended {appended} subfields"),
//!     Err(EnrichError::Collaborator { service, message }) => {
//!         eprintln!("{service} failed: {message}")
//!     }
//!     Err(e) => eprintln!("Other error: {e}"),
//! }
//! ```
//!
//! # Thread Safety
//!
//! Enrichment is synchronous and single-threaded. A [`RecordEnricher`] owns
//! its institution cache and should not be shared between threads; create one
//! per worker instead.

#[cfg(feature = "xml")]
use quick_xml::events::attributes::AttrError;
use thiserror::Error;

pub mod chain;
pub mod citation;
pub mod enricher;
pub mod institution;
pub mod lookup;
#[cfg(feature = "xml")]
pub mod marcxml;
pub mod record;
pub mod rules;

#[cfg(test)]
pub(crate) mod testing;

// Reexports
pub use chain::{ResolutionChain, Strategy};
pub use citation::CitationElement;
pub use enricher::{CollectionNames, EnricherConfig, RecordEnricher};
pub use institution::InstitutionResolver;
pub use lookup::{AuthorClaims, CandidateSet, Claim, IdentifierLookup, SearchEngine};
pub use record::{ControlField, DataField, Record, Subfield};

/// Numeric identifier of a record in the catalogue.
pub type RecordId = u64;

/// A specialized Result type for enrichment operations.
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Represents errors that can occur while reading or enriching records.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("{service} lookup failed: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Invalid field value: {field} - {message}")]
    InvalidFieldValue { field: String, message: String },
}

impl EnrichError {
    /// Builds a [`EnrichError::Collaborator`] from any displayable failure.
    pub fn collaborator(service: &'static str, message: impl ToString) -> Self {
        EnrichError::Collaborator {
            service,
            message: message.to_string(),
        }
    }
}

#[cfg(feature = "xml")]
impl From<quick_xml::Error> for EnrichError {
    fn from(err: quick_xml::Error) -> Self {
        EnrichError::InvalidFormat(err.to_string())
    }
}

#[cfg(feature = "xml")]
impl From<AttrError> for EnrichError {
    fn from(err: AttrError) -> Self {
        EnrichError::InvalidFormat(err.to_string())
    }
}
