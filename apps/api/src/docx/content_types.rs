use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{local_name, DocxError, Result};

pub const HEADER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";

/// Ensures `[Content_Types].xml` carries a `<Default>` for the given
/// extension. Returns the rewritten part, or `None` if it was already
/// present.
pub fn ensure_default(xml: &str, extension: &str, content_type: &str) -> Result<Option<String>> {
    let mut entry = BytesStart::new("Default");
    entry.push_attribute(("Extension", extension));
    entry.push_attribute(("ContentType", content_type));
    insert_if_absent(xml, b"Default", b"Extension", extension, entry)
}

/// Ensures an `<Override>` for the given part name (with leading `/`).
pub fn ensure_override(xml: &str, part_name: &str, content_type: &str) -> Result<Option<String>> {
    let mut entry = BytesStart::new("Override");
    entry.push_attribute(("PartName", part_name));
    entry.push_attribute(("ContentType", content_type));
    insert_if_absent(xml, b"Override", b"PartName", part_name, entry)
}

fn insert_if_absent(
    xml: &str,
    element: &[u8],
    key_attr: &[u8],
    key_value: &str,
    entry: BytesStart<'static>,
) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e)
                if local_name(e.name().as_ref()) == element
                    && has_attr(&e, key_attr, key_value) =>
            {
                return Ok(None);
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"Types" => {
                writer.write_event(Event::Empty(entry))?;
                writer.write_event(Event::End(e))?;
                break;
            }
            Event::Eof => {
                return Err(DocxError::InvalidDocument(
                    "content types part has no Types element".to_string(),
                ))
            }
            event => writer.write_event(event)?,
        }
    }

    // copy the remainder after </Types> (normally nothing)
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map(Some)
        .map_err(|e| DocxError::Utf8(e.utf8_error()))
}

fn has_attr(e: &BytesStart, key: &[u8], value: &str) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == key && a.value.as_ref() == value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#,
    );

    #[test]
    fn test_ensure_default_inserts_new_extension() {
        let out = ensure_default(TYPES, "png", "image/png").unwrap().unwrap();
        assert!(out.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(out.ends_with("</Types>"));
    }

    #[test]
    fn test_ensure_default_is_a_no_op_when_present() {
        assert!(ensure_default(TYPES, "xml", "application/xml")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_ensure_override_inserts_header_part() {
        let out = ensure_override(TYPES, "/word/header1.xml", HEADER_CONTENT_TYPE)
            .unwrap()
            .unwrap();
        assert!(out.contains(r#"PartName="/word/header1.xml""#));
    }

    #[test]
    fn test_ensure_override_is_a_no_op_when_present() {
        assert!(ensure_override(
            TYPES,
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"
        )
        .unwrap()
        .is_none());
    }
}
