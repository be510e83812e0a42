//! MARCXML reading and writing.
//!
//! Records are written in the compact layout used by catalogue exports:
//! two-space indented fields, four-space indented subfields, fields in record
//! order. [`to_oai`] turns that output into the `marc:`-prefixed form expected
//! by OAI-PMH harvesters.
//!
//! # Example
//!
//! ```
//! use biblink::marcxml;
//!
//! let input = r#"<record>
//!   <controlfield tag="001">12</controlfield>
//!   <datafield tag="100" ind1=" " ind2=" ">
//!     <subfield code="a">Smith, J.</subfield>
//!   </datafield>
//! </record>"#;
//!
//! let record = marcxml::parse_record(input).unwrap();
//! assert_eq!(record.id(), Some(12));
//! assert_eq!(marcxml::record_to_xml(&record), input);
//! ```

use quick_xml::escape::{escape, partial_escape};

use crate::record::{DataField, Record};
use crate::{EnrichError, Result};

mod parse;

/// Start tag of an OAI record: MARC21 slim namespace plus a fixed leader.
const OAI_RECORD_START: &str = "<marc:record xmlns:marc=\"http://www.loc.gov/MARC21/slim\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"http://www.loc.gov/MARC21/slim http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd\" type=\"Bibliographic\">\n     <marc:leader>00000coc  2200000uu 4500</marc:leader>";

/// Text substitutions applied by [`to_oai`], in order.
const OAI_REPLACEMENTS: [(&str, &str); 9] = [
    ("<record>", OAI_RECORD_START),
    (
        "<record xmlns=\"http://www.loc.gov/MARC21/slim\">",
        OAI_RECORD_START,
    ),
    ("</record", "</marc:record"),
    ("<controlfield", "<marc:controlfield"),
    ("</controlfield", "</marc:controlfield"),
    ("<datafield", "<marc:datafield"),
    ("</datafield", "</marc:datafield"),
    ("<subfield", "<marc:subfield"),
    ("</subfield", "</marc:subfield"),
];

/// Parses a single record, with or without a `<collection>` wrapper.
///
/// Fails if the input holds no record; extra records are ignored.
pub fn parse_record(input: &str) -> Result<Record> {
    parse::parse_marcxml(input)?
        .into_iter()
        .next()
        .ok_or_else(|| EnrichError::InvalidFormat("No record found".into()))
}

/// Parses every `<record>` in the input.
pub fn parse_collection(input: &str) -> Result<Vec<Record>> {
    parse::parse_marcxml(input)
}

/// Serializes a record as MARCXML.
///
/// Control fields come first, then data fields, each in the order they were
/// added to the record. Nothing is reordered, so parsed input written back
/// out keeps its field sequence.
pub fn record_to_xml(record: &Record) -> String {
    let mut lines = vec!["<record>".to_string()];

    for field in record.control_fields() {
        lines.push(format!(
            "  <controlfield tag=\"{}\">{}</controlfield>",
            escape(field.tag.as_str()),
            partial_escape(&field.value)
        ));
    }

    for field in record.data_fields() {
        push_datafield(&mut lines, field);
    }

    lines.push("</record>".to_string());
    lines.join("\n")
}

fn push_datafield(lines: &mut Vec<String>, field: &DataField) {
    lines.push(format!(
        "  <datafield tag=\"{}\" ind1=\"{}\" ind2=\"{}\">",
        escape(field.tag()),
        escape(&field.ind1().to_string()),
        escape(&field.ind2().to_string()),
    ));
    for subfield in field.subfields() {
        lines.push(format!(
            "    <subfield code=\"{}\">{}</subfield>",
            escape(&subfield.code.to_string()),
            partial_escape(&subfield.value)
        ));
    }
    lines.push("  </datafield>".to_string());
}

/// Serializes records inside a `<collection>` element.
pub fn collection_to_xml(records: &[Record]) -> String {
    let mut out = vec!["<collection>".to_string()];
    out.extend(records.iter().map(record_to_xml));
    out.push("</collection>".to_string());
    out.join("\n")
}

/// Rewrites plain MARCXML into the OAI `marc:` envelope.
///
/// This is a pure text substitution over [`record_to_xml`] output; anything
/// else is passed through unchanged.
pub fn to_oai(xml: &str) -> String {
    OAI_REPLACEMENTS
        .iter()
        .fold(xml.to_string(), |acc, (from, to)| acc.replace(from, to))
}
