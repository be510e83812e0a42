//! Record enrichment orchestrator.
//!
//! [`RecordEnricher`] runs every rule from [`crate::rules::RULES`] over a
//! record, in order, and keeps the institution cache alive between records so
//! a batch pays for each distinct affiliation string once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biblink::{EnricherConfig, RecordEnricher};
//!
//! let config = EnricherConfig {
//!     book_fallback: true,
//!     ..Default::default()
//! };
//!
//! let mut enricher = RecordEnricher::new(&search, &identifiers, &claims).with_config(config);
//! let appended = enricher.enrich(&mut record)?;
//! ```
//!
//! ## Failure behaviour
//!
//! Missing, malformed or ambiguous evidence only means less enrichment. An
//! error returned by a lookup service stops the current record and is passed
//! to the caller; subfields appended before the failure stay in place, so the
//! record is still valid.

use serde::{Deserialize, Serialize};
use tracing::{debug_span, info};

use crate::chain::ResolutionChain;
use crate::institution::InstitutionResolver;
use crate::lookup::{AuthorClaims, IdentifierLookup, SearchEngine};
use crate::record::Record;
use crate::rules::{Context, RULES};
use crate::{RecordId, Result};

/// Names of the catalogue collections that searches are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub institutions: String,
    pub journals: String,
    pub experiments: String,
    pub conferences: String,
    /// Author profiles
    pub hep_names: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            institutions: "Institutions".to_string(),
            journals: "Journals".to_string(),
            experiments: "Experiments".to_string(),
            conferences: "Conferences".to_string(),
            hep_names: "HepNames".to_string(),
        }
    }
}

/// Configuration options for [`RecordEnricher`].
///
/// # Examples
///
/// ```
/// use biblink::EnricherConfig;
///
/// let config = EnricherConfig {
///     book_fallback: false,   // keep the title-based book lookup off
///     ..Default::default()
/// };
/// assert_eq!(config.collections.institutions, "Institutions");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnricherConfig {
    pub collections: CollectionNames,
    /// Try a title-based book lookup after every other citation strategy.
    /// Titles collide often, so this is off by default.
    pub book_fallback: bool,
}

/// Applies every enrichment rule to records, one at a time.
pub struct RecordEnricher<'a> {
    search: &'a dyn SearchEngine,
    identifiers: &'a dyn IdentifierLookup,
    claims: &'a dyn AuthorClaims,
    institutions: InstitutionResolver,
    chain: ResolutionChain,
    config: EnricherConfig,
}

impl<'a> RecordEnricher<'a> {
    #[must_use]
    pub fn new(
        search: &'a dyn SearchEngine,
        identifiers: &'a dyn IdentifierLookup,
        claims: &'a dyn AuthorClaims,
    ) -> Self {
        Self::with_parts(search, identifiers, claims, EnricherConfig::default())
    }

    /// Replaces the configuration. Resets the institution cache, since the
    /// collection it searches may have changed.
    #[must_use]
    pub fn with_config(self, config: EnricherConfig) -> Self {
        Self::with_parts(self.search, self.identifiers, self.claims, config)
    }

    fn with_parts(
        search: &'a dyn SearchEngine,
        identifiers: &'a dyn IdentifierLookup,
        claims: &'a dyn AuthorClaims,
        config: EnricherConfig,
    ) -> Self {
        let chain = if config.book_fallback {
            ResolutionChain::new().with_book_fallback()
        } else {
            ResolutionChain::new()
        };
        Self {
            search,
            identifiers,
            claims,
            institutions: InstitutionResolver::new(&config.collections.institutions),
            chain,
            config,
        }
    }

    pub fn config(&self) -> &EnricherConfig {
        &self.config
    }

    pub fn institutions(&self) -> &InstitutionResolver {
        &self.institutions
    }

    /// Enriches `record`, taking its ID from control field `001`.
    ///
    /// Returns the number of subfields appended.
    pub fn enrich(&mut self, record: &mut Record) -> Result<usize> {
        let record_id = record.id();
        self.enrich_with_id(record, record_id)
    }

    /// Enriches `record` as the record `record_id`.
    ///
    /// Without an ID, author signatures are not looked up and proceedings
    /// matches cannot exclude the record itself.
    pub fn enrich_with_id(
        &mut self,
        record: &mut Record,
        record_id: Option<RecordId>,
    ) -> Result<usize> {
        let _span = debug_span!("enrich", record_id).entered();

        let mut ctx = Context {
            record_id,
            search: self.search,
            identifiers: self.identifiers,
            claims: self.claims,
            institutions: &mut self.institutions,
            chain: &self.chain,
            collections: &self.config.collections,
        };

        let mut appended = 0;
        for rule in &RULES {
            appended += rule.apply(record, &mut ctx)?;
        }

        info!(record_id, appended, "Record enriched");
        Ok(appended)
    }

    /// Enriches each record in turn, sharing the institution cache.
    ///
    /// Stops at the first lookup failure.
    pub fn enrich_batch(&mut self, records: &mut [Record]) -> Result<usize> {
        let mut appended = 0;
        for record in records.iter_mut() {
            appended += self.enrich(record)?;
        }
        Ok(appended)
    }

    /// Enriches `record` and renders it as MARCXML, optionally in the OAI
    /// `marc:` envelope.
    #[cfg(feature = "xml")]
    pub fn enhanced_marcxml(&mut self, record: &mut Record, oai: bool) -> Result<String> {
        self.enrich(record)?;
        let xml = crate::marcxml::record_to_xml(record);
        Ok(if oai { crate::marcxml::to_oai(&xml) } else { xml })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DataField, Subfield};
    use crate::testing::{StubClaims, StubIdentifiers, StubSearch};
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    fn citation(code: char, value: &str) -> DataField {
        DataField::new("999", 'C', '5').with_subfield(code, value)
    }

    fn sample_record() -> Record {
        Record::new()
            .with_control_field("001", "10")
            .with_data_field(
                DataField::new("100", ' ', ' ')
                    .with_subfield('a', "Smith, J.")
                    .with_subfield('u', "CERN"),
            )
            .with_data_field(DataField::new("245", ' ', ' ').with_subfield('a', "A Title"))
            .with_data_field(
                DataField::new("700", ' ', ' ')
                    .with_subfield('a', "Doe, J.")
                    .with_subfield('u', "CERN")
                    .with_subfield('u', "DESY"),
            )
            .with_data_field(
                DataField::new("773", ' ', ' ')
                    .with_subfield('w', "C01-01-01")
                    .with_subfield('p', "Phys.Rev."),
            )
            .with_data_field(citation('a', "10.1000/xyz"))
            .with_data_field(
                DataField::new("999", 'C', '5')
                    .with_subfield('s', "Phys.Rev.,D60,073001")
                    .with_subfield('y', "1999"),
            )
            .with_data_field(DataField::new("693", ' ', ' ').with_subfield('e', "CERN-LHC-ATLAS"))
    }

    fn sample_search() -> StubSearch {
        StubSearch::new()
            .with("institution:\"CERN\"", [902725])
            .with("institution:\"DESY\"", [902770])
            .with("111__g:\"C01-01-01\"", [300])
            .with("773__w:\"C01-01-01\" 980:PROCEEDINGS", [10, 55])
            .with("711__a:\"Phys.Rev.\"", [400])
            .with("119__a:\"CERN-LHC-ATLAS\"", [700])
    }

    fn snapshot(record: &Record) -> Vec<Vec<Subfield>> {
        record
            .data_fields()
            .iter()
            .map(|f| f.subfields().to_vec())
            .collect_vec()
    }

    #[test]
    fn test_scenario_doi_citation() {
        let search = StubSearch::new();
        let identifiers = StubIdentifiers::new().doi([42]);
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new().with_data_field(citation('a', "10.1000/xyz"));

        assert_eq!(enricher.enrich(&mut record).unwrap(), 1);

        let subfields = record.data_fields()[0].subfields();
        assert_eq!(
            subfields,
            &[
                Subfield {
                    code: 'a',
                    value: "10.1000/xyz".to_string()
                },
                Subfield {
                    code: '0',
                    value: "42".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_scenario_title_and_year_without_journal_reference() {
        let search = StubSearch::new();
        let identifiers = StubIdentifiers::new().journal([7, 9]);
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new().with_data_field(
            DataField::new("999", 'C', '5')
                .with_subfield('t', "Phys Rev D")
                .with_subfield('y', "1999"),
        );

        assert_eq!(enricher.enrich(&mut record).unwrap(), 0);
        assert!(identifiers.calls().is_empty());
        assert_eq!(record.data_fields()[0].len(), 2);
    }

    #[test]
    fn test_scenario_ambiguous_journal_match() {
        let search = StubSearch::new();
        let identifiers = StubIdentifiers::new().journal([7, 9]);
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new().with_data_field(
            DataField::new("999", 'C', '5')
                .with_subfield('s', "Phys.Rev.,D60,073001")
                .with_subfield('y', "1999"),
        );

        assert_eq!(enricher.enrich(&mut record).unwrap(), 0);
        assert_eq!(identifiers.calls(), vec![crate::Strategy::Journal]);
        assert!(!record.data_fields()[0].contains('0'));
    }

    #[test]
    fn test_scenario_institution_searched_once_per_record() {
        let search = StubSearch::new().with("institution:\"CERN\"", [902725]);
        let identifiers = StubIdentifiers::new();
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new()
            .with_data_field(DataField::new("371", ' ', ' ').with_subfield('a', "CERN"))
            .with_data_field(DataField::new("110", ' ', ' ').with_subfield('a', "CERN"));

        assert_eq!(enricher.enrich(&mut record).unwrap(), 2);
        assert_eq!(search.count("institution:\"CERN\""), 1);
    }

    #[test]
    fn test_scenario_proceedings_excludes_self() {
        let search =
            StubSearch::new().with("773__w:\"C01-01-01\" 980:PROCEEDINGS", [10, 55]);
        let identifiers = StubIdentifiers::new();
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new()
            .with_control_field("001", "10")
            .with_data_field(DataField::new("773", ' ', ' ').with_subfield('w', "C01-01-01"));

        enricher.enrich(&mut record).unwrap();

        let field = &record.data_fields()[0];
        assert_eq!(field.first('0'), Some("55"));
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn test_enrichment_only_appends() {
        let search = sample_search();
        let identifiers = StubIdentifiers::new().doi([42]).journal([43]);
        let claims = StubClaims::new()
            .claim(10, "Smith, J.", 77, 1)
            .canonical(77, "J.Smith.1");
        let search = search.with("035__a:\"J.Smith.1\"", [1001]);
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = sample_record();
        let before = snapshot(&record);

        let appended = enricher.enrich(&mut record).unwrap();

        let after = snapshot(&record);
        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.as_slice(), &new[..old.len()]);
        }
        let added: usize = after.iter().map(Vec::len).sum::<usize>()
            - before.iter().map(Vec::len).sum::<usize>();
        assert_eq!(added, appended);
        // x, y, z / z, z / 2, 0, 1 / 0 / 0 / 0
        assert_eq!(appended, 11);
        assert_eq!(record.control_fields()[0].value, "10");
    }

    #[test]
    fn test_citation_rule_is_idempotent() {
        let search = StubSearch::new();
        let identifiers = StubIdentifiers::new().doi([42]);
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new().with_data_field(citation('a', "10.1000/xyz"));

        enricher.enrich(&mut record).unwrap();
        let once = record.clone();
        assert_eq!(enricher.enrich(&mut record).unwrap(), 0);

        assert_eq!(record, once);
        assert_eq!(identifiers.calls().len(), 1);
    }

    #[test]
    fn test_other_rules_are_not_idempotent() {
        let search = StubSearch::new().with("institution:\"CERN\"", [902725]);
        let identifiers = StubIdentifiers::new();
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new()
            .with_data_field(DataField::new("371", ' ', ' ').with_subfield('a', "CERN"));

        enricher.enrich(&mut record).unwrap();
        enricher.enrich(&mut record).unwrap();

        // a second pass links the same institution again
        assert_eq!(
            record.data_fields()[0].values('z').collect_vec(),
            vec!["902725", "902725"]
        );
    }

    #[test]
    fn test_batch_shares_institution_cache() {
        let search = StubSearch::new().with("institution:\"CERN\"", [902725]);
        let identifiers = StubIdentifiers::new();
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let field = DataField::new("100", ' ', ' ')
            .with_subfield('a', "Smith, J.")
            .with_subfield('u', "CERN");
        let mut records = vec![
            Record::new().with_control_field("001", "1").with_data_field(field.clone()),
            Record::new().with_control_field("001", "2").with_data_field(field),
        ];

        assert_eq!(enricher.enrich_batch(&mut records).unwrap(), 2);
        assert_eq!(search.count("institution:\"CERN\""), 1);
        assert_eq!(enricher.institutions().len(), 1);
    }

    #[test]
    fn test_lookup_failure_keeps_earlier_appends() {
        let search = StubSearch::new()
            .with("institution:\"CERN\"", [902725])
            .failing("119__a:\"ALICE\"");
        let identifiers = StubIdentifiers::new();
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new()
            .with_data_field(DataField::new("110", ' ', ' ').with_subfield('a', "CERN"))
            .with_data_field(DataField::new("693", ' ', ' ').with_subfield('e', "ALICE"));

        assert!(enricher.enrich(&mut record).is_err());
        assert_eq!(record.data_fields()[0].first('z'), Some("902725"));
        assert_eq!(record.data_fields()[1].len(), 1);
    }

    #[test]
    fn test_config_collections_and_book_fallback() {
        let search = StubSearch::new().with("119__a:\"ALICE\"", [5]);
        let identifiers = StubIdentifiers::new().book([11]);
        let claims = StubClaims::new();
        let config = EnricherConfig {
            collections: CollectionNames {
                experiments: "Expts".to_string(),
                ..Default::default()
            },
            book_fallback: true,
        };
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims).with_config(config);
        let mut record = Record::new()
            .with_data_field(DataField::new("693", ' ', ' ').with_subfield('e', "ALICE"))
            .with_data_field(citation('t', "Quantum Field Theory"));

        assert_eq!(enricher.enrich(&mut record).unwrap(), 2);
        assert_eq!(search.calls()[0].1.as_deref(), Some("Expts"));
        assert_eq!(record.data_fields()[1].first('0'), Some("11"));
    }

    #[test]
    fn test_enhanced_marcxml() {
        let search = StubSearch::new();
        let identifiers = StubIdentifiers::new().doi([42]);
        let claims = StubClaims::new();
        let mut enricher = RecordEnricher::new(&search, &identifiers, &claims);
        let mut record = Record::new()
            .with_control_field("001", "10")
            .with_data_field(citation('a', "10.1000/xyz"));

        let xml = enricher.enhanced_marcxml(&mut record, false).unwrap();

        assert_eq!(
            xml,
            "<record>\n  <controlfield tag=\"001\">10</controlfield>\n  <datafield tag=\"999\" ind1=\"C\" ind2=\"5\">\n    <subfield code=\"a\">10.1000/xyz</subfield>\n    <subfield code=\"0\">42</subfield>\n  </datafield>\n</record>"
        );
    }
}
