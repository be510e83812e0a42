//! MARCXML parsing implementation.
//!
//! Element names are matched on their local part, so both plain and
//! `marc:`-prefixed documents are accepted.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

use crate::record::{DataField, Record};
use crate::{EnrichError, Result};

/// Parse MARCXML content into records.
///
/// `<record>` elements are collected wherever they appear, so a bare record
/// and a `<collection>` are both fine.
pub(crate) fn parse_marcxml(content: &str) -> Result<Vec<Record>> {
    if content.trim().is_empty() {
        return Err(EnrichError::InvalidFormat("Empty input".into()));
    }

    // Text is not trimmed: whitespace inside a value is part of the value.
    let mut reader = Reader::from_str(content);

    let mut records = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"record" => {
                records.push(parse_record(&mut reader, &mut buf)?);
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"record" => {
                records.push(Record::new());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(EnrichError::from(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(records)
}

/// Parse the body of one `<record>` element, up to its closing tag.
fn parse_record<B: BufRead>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Record> {
    let mut record = Record::new();
    let mut current: Option<DataField> = None;

    loop {
        match reader.read_event_into(buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"controlfield" => {
                    let tag = field_tag(e, "controlfield")?;
                    let value = extract_text(reader, buf, b"controlfield")?;
                    record.push_control_field(&tag, value);
                }
                b"datafield" => {
                    current = Some(start_datafield(e)?);
                }
                b"subfield" => {
                    let code = subfield_code(e)?;
                    let value = extract_text(reader, buf, b"subfield")?;
                    open_field(&mut current)?.append(code, value);
                }
                _ => (),
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"controlfield" => {
                    let tag = field_tag(e, "controlfield")?;
                    record.push_control_field(&tag, "");
                }
                b"datafield" => record.push_data_field(start_datafield(e)?),
                b"subfield" => {
                    let code = subfield_code(e)?;
                    open_field(&mut current)?.append(code, "");
                }
                _ => (),
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"datafield" => {
                    if let Some(field) = current.take() {
                        record.push_data_field(field);
                    }
                }
                b"record" => break,
                _ => (),
            },
            Ok(Event::Eof) => {
                return Err(EnrichError::InvalidFormat(
                    "Unexpected EOF while looking for closing tag 'record'".into(),
                ));
            }
            Err(e) => return Err(EnrichError::from(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(record)
}

fn open_field(current: &mut Option<DataField>) -> Result<&mut DataField> {
    current
        .as_mut()
        .ok_or_else(|| EnrichError::InvalidFormat("Subfield outside of a datafield".into()))
}

/// Extracts text content from XML events until the closing tag is found
fn extract_text<B: BufRead>(
    reader: &mut Reader<B>,
    buf: &mut Vec<u8>,
    closing_tag: &[u8],
) -> Result<String> {
    let mut text = String::new();
    let closing_tag_str = String::from_utf8_lossy(closing_tag).into_owned();

    loop {
        match reader.read_event_into(buf) {
            Ok(Event::Text(e)) => {
                text.push_str(&e.unescape().map_err(|e| {
                    EnrichError::InvalidFormat(format!("Invalid XML text content: {}", e))
                })?);
            }
            Ok(Event::CData(e)) => text.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::End(e)) if e.local_name().as_ref() == closing_tag => break,
            Ok(Event::Eof) => {
                return Err(EnrichError::InvalidFormat(format!(
                    "Unexpected EOF while looking for closing tag '{}'",
                    closing_tag_str
                )));
            }
            Err(e) => return Err(EnrichError::from(e)),
            _ => continue,
        }
        buf.clear();
    }

    Ok(text)
}

/// Value of the attribute `name`, if present.
fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn field_tag(e: &BytesStart<'_>, element: &str) -> Result<String> {
    let tag = attribute(e, b"tag")?.ok_or_else(|| {
        EnrichError::InvalidFormat(format!("Missing tag attribute on {element}"))
    })?;
    if tag.chars().count() != 3 {
        return Err(EnrichError::InvalidFieldValue {
            field: "tag".to_string(),
            message: format!("\"{tag}\" is not a three character tag"),
        });
    }
    Ok(tag)
}

fn indicator(e: &BytesStart<'_>, name: &[u8]) -> Result<char> {
    Ok(attribute(e, name)?
        .and_then(|value| value.chars().next())
        .unwrap_or(' '))
}

fn start_datafield(e: &BytesStart<'_>) -> Result<DataField> {
    let tag = field_tag(e, "datafield")?;
    Ok(DataField::new(
        &tag,
        indicator(e, b"ind1")?,
        indicator(e, b"ind2")?,
    ))
}

fn subfield_code(e: &BytesStart<'_>) -> Result<char> {
    let code = attribute(e, b"code")?.unwrap_or_default();
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EnrichError::InvalidFieldValue {
            field: "code".to_string(),
            message: format!("\"{code}\" is not a single character subfield code"),
        }),
    }
}
