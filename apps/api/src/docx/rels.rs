use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{local_name, qname_string, DocxError, Result};

pub const HEADER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
pub const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Contents of a relationship part with no relationships yet.
pub const EMPTY_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"</Relationships>"#,
);

/// Looks up the `Target` of the relationship with the given `Id`.
pub fn find_target(xml: &str, rid: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => {
                            target = Some(String::from_utf8_lossy(&attr.value).to_string())
                        }
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rid) {
                    return Ok(target);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// The next unused `rId<n>` identifier in the part.
pub fn next_rid(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut max = 0u32;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"Id" {
                        let value = String::from_utf8_lossy(&attr.value);
                        if let Some(n) = value
                            .strip_prefix("rId")
                            .and_then(|s| s.parse::<u32>().ok())
                        {
                            max = max.max(n);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(format!("rId{}", max + 1))
}

/// Appends a `<Relationship/>` entry, returning the rewritten part.
pub fn append_relationship(xml: &str, rid: &str, rel_type: &str, target: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let entry = {
        let mut e = BytesStart::new("Relationship");
        e.push_attribute(("Id", rid));
        e.push_attribute(("Type", rel_type));
        e.push_attribute(("Target", target));
        e
    };

    loop {
        match reader.read_event()? {
            Event::End(e) if local_name(e.name().as_ref()) == b"Relationships" => {
                writer.write_event(Event::Empty(entry.clone()))?;
                writer.write_event(Event::End(e))?;
            }
            // a self-closed container has to be expanded first
            Event::Empty(e) if local_name(e.name().as_ref()) == b"Relationships" => {
                let name = qname_string(e.name().as_ref())?;
                writer.write_event(Event::Start(e.clone()))?;
                writer.write_event(Event::Empty(entry.clone()))?;
                writer.write_event(Event::End(quick_xml::events::BytesEnd::new(name)))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| DocxError::Utf8(e.utf8_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_find_target() {
        let xml = append_relationship(EMPTY_RELS, "rId1", HEADER_REL_TYPE, "header1.xml").unwrap();
        assert_eq!(
            find_target(&xml, "rId1").unwrap(),
            Some("header1.xml".to_string())
        );
        assert_eq!(find_target(&xml, "rId2").unwrap(), None);
    }

    #[test]
    fn test_next_rid_skips_existing_ids() {
        assert_eq!(next_rid(EMPTY_RELS).unwrap(), "rId1");
        let xml = append_relationship(EMPTY_RELS, "rId7", IMAGE_REL_TYPE, "media/x.png").unwrap();
        assert_eq!(next_rid(&xml).unwrap(), "rId8");
    }

    #[test]
    fn test_append_expands_self_closed_container() {
        let xml = append_relationship(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#,
            "rId1",
            IMAGE_REL_TYPE,
            "media/logo1.png",
        )
        .unwrap();
        assert_eq!(
            find_target(&xml, "rId1").unwrap(),
            Some("media/logo1.png".to_string())
        );
        assert!(xml.ends_with("</Relationships>"));
    }
}
