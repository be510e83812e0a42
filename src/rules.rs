//! Per-family field enrichment rules.
//!
//! Each [`Rule`] covers one family of fields and appends identifier subfields
//! to every matching field of a record. Rules read the field as it was before
//! they started appending, so their own output never feeds back into them.
//!
//! | Family | Tags | Reads | Appends |
//! |--------|------|-------|---------|
//! | Authors | `100`, `700` | `a`, `u` | `x` person record, `y` claimed flag, `z` institution |
//! | Thesis institution | `502` | `c` (when `u` is present) | `z` |
//! | Institutions | `371`, `110` | `a` | `z` |
//! | Citations | `999C5` | whole field, unless `0` exists | `0` |
//! | Host item | `773` | `w`, `p`, `z` | `2` conference, `0` proceedings or book, `1` journal |
//! | Experiments | `693` / `710` | `e` / `g` | `0` |

use tracing::debug;

use crate::chain::ResolutionChain;
use crate::citation::CitationElement;
use crate::enricher::CollectionNames;
use crate::institution::InstitutionResolver;
use crate::lookup::{AuthorClaims, IdentifierLookup, SearchEngine, phrase_query};
use crate::record::{DataField, Record};
use crate::{RecordId, Result};

/// Claims with a flag at or below this value were withdrawn.
const WITHDRAWN_CLAIM_FLAG: i32 = -2;

/// Everything a rule needs besides the record itself.
pub struct Context<'a> {
    /// ID of the record being enriched, when known
    pub record_id: Option<RecordId>,
    pub search: &'a dyn SearchEngine,
    pub identifiers: &'a dyn IdentifierLookup,
    pub claims: &'a dyn AuthorClaims,
    pub institutions: &'a mut InstitutionResolver,
    pub chain: &'a ResolutionChain,
    pub collections: &'a CollectionNames,
}

/// An enrichment rule for one family of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Author signatures and affiliations.
    Authors { tags: &'static [&'static str] },
    /// Institution names under `code`, optionally only when `guard` is present.
    Institutions {
        tags: &'static [&'static str],
        code: char,
        guard: Option<char>,
    },
    /// References resolved through the citation chain.
    Citations {
        tag: &'static str,
        ind1: char,
        ind2: char,
    },
    /// Conference numbers, journal titles and ISBNs of the host item.
    HostItem { tag: &'static str },
    /// Experiment names under `code`.
    Experiments { tag: &'static str, code: char },
}

/// All rules, in the order they are applied.
pub const RULES: [Rule; 7] = [
    Rule::Authors {
        tags: &["100", "700"],
    },
    // thesis institution
    Rule::Institutions {
        tags: &["502"],
        code: 'c',
        guard: Some('u'),
    },
    // HepNames and Jobs affiliations
    Rule::Institutions {
        tags: &["371", "110"],
        code: 'a',
        guard: None,
    },
    Rule::Citations {
        tag: "999",
        ind1: 'C',
        ind2: '5',
    },
    Rule::HostItem { tag: "773" },
    Rule::Experiments {
        tag: "693",
        code: 'e',
    },
    Rule::Experiments {
        tag: "710",
        code: 'g',
    },
];

impl Rule {
    /// Tags of the fields this rule looks at.
    pub fn tags(&self) -> &[&'static str] {
        match self {
            Rule::Authors { tags } | Rule::Institutions { tags, .. } => tags,
            Rule::Citations { tag, .. }
            | Rule::HostItem { tag }
            | Rule::Experiments { tag, .. } => std::slice::from_ref(tag),
        }
    }

    /// Applies the rule to every matching field; returns the number of
    /// subfields appended.
    pub fn apply(&self, record: &mut Record, ctx: &mut Context<'_>) -> Result<usize> {
        let mut appended = 0;
        for field in record.fields_mut(self.tags()) {
            appended += match *self {
                Rule::Authors { .. } => {
                    link_signature(field, ctx)? + link_institutions(field, 'u', ctx)?
                }
                Rule::Institutions { code, guard, .. } => {
                    if guard.is_some_and(|g| !field.contains(g)) {
                        continue;
                    }
                    link_institutions(field, code, ctx)?
                }
                Rule::Citations { ind1, ind2, .. } => {
                    if !field.has_indicators(ind1, ind2) {
                        continue;
                    }
                    link_citation(field, ctx)?
                }
                Rule::HostItem { .. } => link_host_item(field, ctx)?,
                Rule::Experiments { code, .. } => link_experiments(field, code, ctx)?,
            };
        }
        Ok(appended)
    }
}

fn append_id(field: &mut DataField, code: char, id: RecordId) -> usize {
    debug!(tag = field.tag(), %code, id, "Appending identifier");
    field.append(code, id.to_string());
    1
}

/// Snapshot of the values under `code`, taken before anything is appended.
fn owned_values(field: &DataField, code: char) -> Vec<String> {
    field.values(code).map(str::to_string).collect()
}

/// Links the author in `a` to a HepNames record through the claims store.
fn link_signature(field: &mut DataField, ctx: &mut Context<'_>) -> Result<usize> {
    let Some(record_id) = ctx.record_id else {
        return Ok(0);
    };
    let Some(name) = field.first('a').map(str::to_string) else {
        return Ok(0);
    };

    let Some(claim) = ctx
        .claims
        .lookup(record_id, &name)?
        .into_iter()
        .find(|c| c.flag > WITHDRAWN_CLAIM_FLAG)
    else {
        return Ok(0);
    };
    let Some(canonical) = ctx.claims.canonical_name(claim.person_id)? else {
        return Ok(0);
    };

    let query = phrase_query("035__a", &canonical);
    let candidates = ctx.search.search(&query, Some(ctx.collections.hep_names.as_str()))?;
    match candidates.single() {
        Some(id) => {
            append_id(field, 'x', id);
            field.append('y', if claim.flag > 0 { "1" } else { "0" });
            Ok(2)
        }
        None => {
            debug!(
                author = %name,
                %canonical,
                candidates = %candidates,
                "No unique HepNames record"
            );
            Ok(0)
        }
    }
}

fn link_institutions(field: &mut DataField, code: char, ctx: &mut Context<'_>) -> Result<usize> {
    let mut appended = 0;
    for name in owned_values(field, code) {
        if let Some(id) = ctx.institutions.resolve(ctx.search, &name)?.single() {
            appended += append_id(field, 'z', id);
        }
    }
    Ok(appended)
}

fn link_citation(field: &mut DataField, ctx: &mut Context<'_>) -> Result<usize> {
    if field.contains('0') {
        return Ok(0);
    }
    let element = CitationElement::from_subfields(field.subfields());
    match ctx.chain.resolve(ctx.identifiers, &element)? {
        Some(id) => Ok(append_id(field, '0', id)),
        None => Ok(0),
    }
}

fn link_host_item(field: &mut DataField, ctx: &mut Context<'_>) -> Result<usize> {
    let snapshot: Vec<(char, String)> = field
        .subfields()
        .iter()
        .filter(|s| matches!(s.code, 'w' | 'p' | 'z'))
        .map(|s| (s.code, s.value.clone()))
        .collect();

    let mut appended = 0;
    for (code, value) in snapshot {
        match code {
            'w' => {
                let conference = ctx.search.search(
                    &phrase_query("111__g", &value),
                    Some(ctx.collections.conferences.as_str()),
                )?;
                if let Some(id) = conference.single() {
                    appended += append_id(field, '2', id);
                }

                let query = format!("{} 980:PROCEEDINGS", phrase_query("773__w", &value));
                let mut proceedings = ctx.search.search(&query, None)?;
                if let Some(own) = ctx.record_id {
                    // this record may itself be the proceedings
                    proceedings.remove(own);
                }
                if let Some(id) = proceedings.single() {
                    appended += append_id(field, '0', id);
                }
            }
            'p' => {
                let journals = ctx.search.search(
                    &phrase_query("711__a", &value),
                    Some(ctx.collections.journals.as_str()),
                )?;
                if let Some(id) = journals.single() {
                    appended += append_id(field, '1', id);
                }
            }
            _ => {
                let books = ctx.identifiers.find_isbn(&CitationElement::with_isbn(&value))?;
                if let Some(id) = books.single() {
                    appended += append_id(field, '0', id);
                }
            }
        }
    }
    Ok(appended)
}

fn link_experiments(field: &mut DataField, code: char, ctx: &mut Context<'_>) -> Result<usize> {
    let mut appended = 0;
    for name in owned_values(field, code) {
        let experiments = ctx.search.search(
            &phrase_query("119__a", &name),
            Some(ctx.collections.experiments.as_str()),
        )?;
        if let Some(id) = experiments.single() {
            appended += append_id(field, '0', id);
        }
    }
    Ok(appended)
}
