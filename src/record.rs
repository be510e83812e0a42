//! MARC-style record model.
//!
//! A [`Record`] holds control fields (`001`-`009`) and data fields. Data
//! fields own an ordered list of [`Subfield`]s which can only grow: the sole
//! mutation path is [`DataField::append`].
//!
//! # Example
//!
//! ```
//! use biblink::{DataField, Record};
//!
//! let mut record = Record::new().with_control_field("001", "1234");
//! record.push_data_field(DataField::new("100", ' ', ' ').with_subfield('a', "Smith, J."));
//!
//! assert_eq!(record.id(), Some(1234));
//! assert_eq!(record.fields("100").next().unwrap().first('a'), Some("Smith, J."));
//! ```

use compact_str::CompactString;
use std::collections::HashMap;

use crate::RecordId;

/// Tag of the control field holding the record ID.
pub const RECORD_ID_TAG: &str = "001";

/// A single `(code, value)` pair inside a data field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    /// Subfield code (single character or digit)
    pub code: char,
    /// Free-text value
    pub value: String,
}

/// A control field: a tag with a bare value and no subfields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlField {
    pub tag: CompactString,
    pub value: String,
}

/// A data field with two indicators and an append-only subfield list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    tag: CompactString,
    ind1: char,
    ind2: char,
    subfields: Vec<Subfield>,
    /// Position of the first subfield for each code.
    first_index: HashMap<char, usize>,
}

/// Blank indicators may be written as `_`; they are stored as a space.
fn normalize_indicator(ind: char) -> char {
    if ind == '_' { ' ' } else { ind }
}

impl DataField {
    #[must_use]
    pub fn new(tag: &str, ind1: char, ind2: char) -> Self {
        Self {
            tag: CompactString::new(tag),
            ind1: normalize_indicator(ind1),
            ind2: normalize_indicator(ind2),
            subfields: Vec::new(),
            first_index: HashMap::new(),
        }
    }

    /// Appends a subfield and returns the field, for building fields inline.
    #[must_use]
    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.append(code, value);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn ind1(&self) -> char {
        self.ind1
    }

    pub fn ind2(&self) -> char {
        self.ind2
    }

    /// Whether both indicators equal the given ones (`_` counts as blank).
    pub fn has_indicators(&self, ind1: char, ind2: char) -> bool {
        self.ind1 == normalize_indicator(ind1) && self.ind2 == normalize_indicator(ind2)
    }

    /// All subfields in their original order.
    pub fn subfields(&self) -> &[Subfield] {
        &self.subfields
    }

    /// Value of the first subfield with `code`.
    pub fn first(&self, code: char) -> Option<&str> {
        self.first_index
            .get(&code)
            .map(|&i| self.subfields[i].value.as_str())
    }

    pub fn contains(&self, code: char) -> bool {
        self.first_index.contains_key(&code)
    }

    /// Values of every subfield with `code`, in order.
    pub fn values(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |s| s.code == code)
            .map(|s| s.value.as_str())
    }

    /// Adds a subfield at the end of the field.
    ///
    /// This is the only way to change a field's subfields once it exists.
    pub fn append(&mut self, code: char, value: impl Into<String>) {
        self.first_index.entry(code).or_insert(self.subfields.len());
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }
}

/// A bibliographic record: control fields followed by data fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    control_fields: Vec<ControlField>,
    data_fields: Vec<DataField>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_control_field(mut self, tag: &str, value: impl Into<String>) -> Self {
        self.push_control_field(tag, value);
        self
    }

    #[must_use]
    pub fn with_data_field(mut self, field: DataField) -> Self {
        self.push_data_field(field);
        self
    }

    pub fn push_control_field(&mut self, tag: &str, value: impl Into<String>) {
        self.control_fields.push(ControlField {
            tag: CompactString::new(tag),
            value: value.into(),
        });
    }

    pub fn push_data_field(&mut self, field: DataField) {
        self.data_fields.push(field);
    }

    /// The record ID stored in control field `001`, if it is numeric.
    pub fn id(&self) -> Option<RecordId> {
        self.control_fields
            .iter()
            .find(|f| f.tag == RECORD_ID_TAG)
            .and_then(|f| f.value.trim().parse().ok())
    }

    pub fn control_fields(&self) -> &[ControlField] {
        &self.control_fields
    }

    pub fn data_fields(&self) -> &[DataField] {
        &self.data_fields
    }

    /// Data fields with the given tag, in record order.
    pub fn fields<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |f| f.tag == tag)
    }

    /// Mutable access to every data field whose tag is one of `tags`.
    pub fn fields_mut<'a>(
        &'a mut self,
        tags: &'a [&'a str],
    ) -> impl Iterator<Item = &'a mut DataField> {
        self.data_fields
            .iter_mut()
            .filter(move |f| tags.contains(&f.tag.as_str()))
    }
}
