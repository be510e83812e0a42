//! Citation evidence extracted from a reference field.
//!
//! A reference field (`999C5`) carries loosely structured pieces of a citation
//! under fixed subfield codes. [`CitationElement::from_subfields`] reinterprets
//! them as typed evidence for the lookup chain.
//!
//! | Code | Meaning |
//! |------|---------|
//! | `a`  | DOI |
//! | `t`  | title |
//! | `i`  | ISBN |
//! | `r`  | report number |
//! | `y`  | year |
//! | `s`  | `journal,volume,page` |

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Subfield;

/// Structured evidence used to resolve a citation to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationElement {
    pub doi_string: Option<String>,
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub report_num: Option<String>,
    pub year: Option<String>,
    pub journal_title: Option<String>,
    pub volume: Option<String>,
    pub page: Option<String>,
}

impl CitationElement {
    /// Builds an element from `(code, value)` pairs.
    ///
    /// Never fails: unusable pieces of evidence are skipped, so the result may
    /// be only partially populated. When a journal title is derived from an
    /// `s` subfield, `title` is set to it as well, replacing any `t` value.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (char, &'a str)>,
    {
        let mut element = Self::default();
        for (code, value) in pairs {
            match code {
                'a' => element.doi_string = Some(value.to_string()),
                't' => element.title = Some(value.to_string()),
                'i' => element.isbn = Some(value.to_string()),
                'r' => element.report_num = Some(value.to_string()),
                'y' => element.year = Some(value.to_string()),
                's' => match split_pubnote(value) {
                    Some((journal, volume, page)) => {
                        element.journal_title = Some(journal.to_string());
                        element.volume = Some(volume.to_string());
                        element.page = Some(page.to_string());
                    }
                    None => debug!(pubnote = value, "Ignoring malformed journal reference"),
                },
                _ => (),
            }
        }

        if let Some(journal) = &element.journal_title {
            // journal and book lookups share the title slot
            element.title = Some(journal.clone());
        }
        element
    }

    pub fn from_subfields(subfields: &[Subfield]) -> Self {
        Self::from_pairs(subfields.iter().map(|s| (s.code, s.value.as_str())))
    }

    /// An element carrying only an ISBN.
    pub fn with_isbn(isbn: &str) -> Self {
        Self {
            isbn: Some(isbn.to_string()),
            ..Default::default()
        }
    }
}

/// Splits `journal,volume,page`; anything but exactly three parts is rejected.
fn split_pubnote(value: &str) -> Option<(&str, &str, &str)> {
    let mut parts = value.split(',');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(journal), Some(volume), Some(page), None) => Some((journal, volume, page)),
        _ => None,
    }
}
