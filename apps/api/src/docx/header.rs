use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use super::body::{self, ParagraphEvents};
use super::content_types::{self, HEADER_CONTENT_TYPE};
use super::package::{CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART};
use super::rels::{self, HEADER_REL_TYPE, IMAGE_REL_TYPE};
use super::{local_name, qname_string, DocxError, DocxPackage, Result};

/// Half an inch, in English Metric Units. The logo is always rendered
/// as a square of this size; the source aspect ratio is ignored.
const LOGO_EMU: u32 = 457_200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Infers the format from the upload filename. The allow-list is
    /// fixed: `.png`, `.jpg`, `.jpeg` (case-sensitive, matching the
    /// upload contract).
    pub fn from_filename(name: &str) -> Option<Self> {
        if name.ends_with(".png") {
            Some(Self::Png)
        } else if name.ends_with(".jpg") || name.ends_with(".jpeg") {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// A caller-supplied logo: raw image bytes plus the inferred format.
/// Lives only for the duration of one request.
pub struct LogoAsset {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl LogoAsset {
    pub fn from_upload(filename: &str, bytes: Vec<u8>) -> Option<Self> {
        ImageFormat::from_filename(filename).map(|format| Self { bytes, format })
    }
}

enum SectionHeader {
    /// The document has no section properties at all.
    NoSection,
    /// The first section exists but carries no default header.
    NoHeader,
    /// The first section's default header relationship id.
    Header(String),
}

/// Inserts the logo into the first paragraph of the first section's
/// default header, right-aligned, half an inch square. Creates the
/// header part when the section has none. Later sections are never
/// touched. Not idempotent: calling twice inserts two images.
pub fn insert_logo(package: &mut DocxPackage, logo: &LogoAsset) -> Result<()> {
    let media_part = free_part_name(package, "word/media/logo", logo.format.extension());
    let media_target = relative_to_word(&media_part);

    let section = first_section_header(package.part_str(DOCUMENT_PART)?)?;
    match section {
        SectionHeader::Header(rid) => {
            let doc_rels = package.part_str(DOCUMENT_RELS_PART)?;
            let target = rels::find_target(doc_rels, &rid)?.ok_or_else(|| {
                DocxError::InvalidDocument(format!("dangling header relationship {rid}"))
            })?;
            let header_part = resolve_part_name(&target);
            debug!(part = %header_part, "inserting logo into existing header");

            // relationship from the header part to the image
            let rels_part = rels_part_name(&header_part);
            let rels_xml = match package.part(&rels_part) {
                Some(data) => std::str::from_utf8(data)?.to_string(),
                None => rels::EMPTY_RELS.to_string(),
            };
            let image_rid = rels::next_rid(&rels_xml)?;
            let rels_xml =
                rels::append_relationship(&rels_xml, &image_rid, IMAGE_REL_TYPE, &media_target)?;
            package.set_part(&rels_part, rels_xml.into_bytes());

            let header_xml = package.part_str(&header_part)?;
            let docpr_id = header_xml.matches("<wp:docPr").count() + 1;
            let run = drawing_run_xml(&image_rid, docpr_id);
            let header_xml = append_logo_to_header(header_xml, &run)?;
            package.set_part(&header_part, header_xml.into_bytes());
        }
        SectionHeader::NoSection | SectionHeader::NoHeader => {
            let header_part = free_part_name(package, "word/header", "xml");
            debug!(part = %header_part, "creating header for logo");

            let run = drawing_run_xml("rId1", 1);
            package.set_part(&header_part, new_header_xml(&run).into_bytes());

            let rels_part = rels_part_name(&header_part);
            let rels_xml =
                rels::append_relationship(rels::EMPTY_RELS, "rId1", IMAGE_REL_TYPE, &media_target)?;
            package.set_part(&rels_part, rels_xml.into_bytes());

            // wire the new part into the document: relationship, section
            // reference, content-type override
            let doc_rels = match package.part(DOCUMENT_RELS_PART) {
                Some(data) => std::str::from_utf8(data)?.to_string(),
                None => rels::EMPTY_RELS.to_string(),
            };
            let header_rid = rels::next_rid(&doc_rels)?;
            let doc_rels = rels::append_relationship(
                &doc_rels,
                &header_rid,
                HEADER_REL_TYPE,
                &relative_to_word(&header_part),
            )?;
            package.set_part(DOCUMENT_RELS_PART, doc_rels.into_bytes());

            let doc_xml = add_header_reference(package.part_str(DOCUMENT_PART)?, &header_rid)?;
            package.set_part(DOCUMENT_PART, doc_xml.into_bytes());

            let types = content_types::ensure_override(
                package.part_str(CONTENT_TYPES_PART)?,
                &format!("/{header_part}"),
                HEADER_CONTENT_TYPE,
            )?;
            if let Some(types) = types {
                package.set_part(CONTENT_TYPES_PART, types.into_bytes());
            }
        }
    }

    package.set_part(&media_part, logo.bytes.clone());
    let types = content_types::ensure_default(
        package.part_str(CONTENT_TYPES_PART)?,
        logo.format.extension(),
        logo.format.content_type(),
    )?;
    if let Some(types) = types {
        package.set_part(CONTENT_TYPES_PART, types.into_bytes());
    }

    Ok(())
}

/// Finds the first `sectPr` in document order (mid-document sections
/// live inside `w:pPr`, the final one directly under `w:body`) and
/// reports its default header reference, if any.
fn first_section_header(xml: &str) -> Result<SectionHeader> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sectPr" => {
                return Ok(SectionHeader::NoHeader)
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"sectPr" => loop {
                match reader.read_event()? {
                    Event::Empty(e) | Event::Start(e)
                        if local_name(e.name().as_ref()) == b"headerReference" =>
                    {
                        let mut is_default = false;
                        let mut rid = None;
                        for attr in e.attributes().flatten() {
                            match local_name(attr.key.as_ref()) {
                                b"type" => is_default = attr.value.as_ref() == b"default",
                                b"id" => {
                                    rid = Some(String::from_utf8_lossy(&attr.value).to_string())
                                }
                                _ => {}
                            }
                        }
                        if is_default {
                            if let Some(rid) = rid {
                                return Ok(SectionHeader::Header(rid));
                            }
                        }
                    }
                    Event::End(e) if local_name(e.name().as_ref()) == b"sectPr" => {
                        return Ok(SectionHeader::NoHeader)
                    }
                    Event::Eof => {
                        return Err(DocxError::InvalidDocument(
                            "unterminated sectPr element".to_string(),
                        ))
                    }
                    _ => {}
                }
            },
            Event::Eof => return Ok(SectionHeader::NoSection),
            _ => {}
        }
    }
}

/// Adds a default `w:headerReference` to the first `sectPr`, creating a
/// body-level `sectPr` when the document has none.
fn add_header_reference(xml: &str, rid: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut inserted = false;

    let reference = {
        let mut e = BytesStart::new("w:headerReference");
        e.push_attribute(("w:type", "default"));
        e.push_attribute(("r:id", rid));
        e
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) if !inserted && local_name(e.name().as_ref()) == b"sectPr" => {
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Empty(reference.clone()))?;
                inserted = true;
            }
            Event::Empty(e) if !inserted && local_name(e.name().as_ref()) == b"sectPr" => {
                let name = qname_string(e.name().as_ref())?;
                writer.write_event(Event::Start(e.clone()))?;
                writer.write_event(Event::Empty(reference.clone()))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                inserted = true;
            }
            Event::End(e) if !inserted && local_name(e.name().as_ref()) == b"body" => {
                writer.write_event(Event::Text(BytesText::from_escaped(format!(
                    r#"<w:sectPr><w:headerReference w:type="default" r:id="{rid}"/></w:sectPr>"#
                ))))?;
                writer.write_event(Event::End(e))?;
                inserted = true;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !inserted {
        return Err(DocxError::InvalidDocument(
            "document has no body element".to_string(),
        ));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| DocxError::Utf8(e.utf8_error()))
}

/// Appends the drawing run to the first paragraph of the header part
/// and forces that paragraph right-aligned. Headers without any
/// paragraph gain one.
fn append_logo_to_header(xml: &str, drawing_run: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut done = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if !done && local_name(e.name().as_ref()) == b"p" => {
                let paragraph = body::collect_paragraph(&mut reader, &e)?;
                write_paragraph_with_logo(&mut writer, &paragraph, drawing_run)?;
                done = true;
            }
            Event::Empty(e) if !done && local_name(e.name().as_ref()) == b"p" => {
                let name = qname_string(e.name().as_ref())?;
                writer.write_event(Event::Start(e.clone()))?;
                write_ppr_right_aligned(&mut writer, &[])?;
                writer.write_event(Event::Text(BytesText::from_escaped(
                    drawing_run.to_string(),
                )))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
                done = true;
            }
            Event::End(e) if !done && local_name(e.name().as_ref()) == b"hdr" => {
                writer.write_event(Event::Text(BytesText::from_escaped(format!(
                    r#"<w:p><w:pPr><w:jc w:val="right"/></w:pPr>{drawing_run}</w:p>"#
                ))))?;
                writer.write_event(Event::End(e))?;
                done = true;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !done {
        return Err(DocxError::InvalidDocument(
            "header part has no hdr element".to_string(),
        ));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| DocxError::Utf8(e.utf8_error()))
}

fn write_paragraph_with_logo(
    writer: &mut Writer<Vec<u8>>,
    paragraph: &ParagraphEvents,
    drawing_run: &str,
) -> Result<()> {
    writer.write_event(Event::Start(paragraph.start.clone()))?;
    let ppr = body::leading_ppr(&paragraph.inner);
    write_ppr_right_aligned(writer, ppr)?;
    for event in &paragraph.inner[ppr.len()..] {
        writer.write_event(event.clone())?;
    }
    writer.write_event(Event::Text(BytesText::from_escaped(
        drawing_run.to_string(),
    )))?;
    writer.write_event(Event::End(paragraph.end.clone()))?;
    Ok(())
}

/// Re-emits the paragraph properties with any existing `w:jc` replaced
/// by right alignment; synthesizes a `w:pPr` when there is none.
fn write_ppr_right_aligned(writer: &mut Writer<Vec<u8>>, ppr: &[Event]) -> Result<()> {
    let jc = {
        let mut e = BytesStart::new("w:jc");
        e.push_attribute(("w:val", "right"));
        e
    };

    match ppr.first() {
        None => {
            writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
            writer.write_event(Event::Empty(jc))?;
            writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
        }
        Some(Event::Empty(e)) => {
            let name = qname_string(e.name().as_ref())?;
            writer.write_event(Event::Start(e.clone()))?;
            writer.write_event(Event::Empty(jc))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Some(Event::Start(_)) => {
            let last = ppr.len() - 1;
            writer.write_event(ppr[0].clone())?;
            let mut in_jc = 0usize;
            for event in &ppr[1..last] {
                match event {
                    Event::Start(e) if local_name(e.name().as_ref()) == b"jc" => in_jc += 1,
                    Event::End(e) if local_name(e.name().as_ref()) == b"jc" => {
                        in_jc = in_jc.saturating_sub(1)
                    }
                    Event::Empty(e) if in_jc == 0 && local_name(e.name().as_ref()) == b"jc" => {}
                    event if in_jc == 0 => writer.write_event(event.clone())?,
                    _ => {}
                }
            }
            writer.write_event(Event::Empty(jc))?;
            writer.write_event(ppr[last].clone())?;
        }
        Some(_) => {}
    }
    Ok(())
}

fn drawing_run_xml(rid: &str, docpr_id: usize) -> String {
    format!(
        concat!(
            r#"<w:r><w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="{emu}" cy="{emu}"/>"#,
            r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
            r#"<wp:docPr id="{id}" name="Logo {id}"/>"#,
            r#"<wp:cNvGraphicFramePr/>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="Logo {id}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill>"#,
            r#"<a:blip r:embed="{rid}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
            r#"<a:stretch><a:fillRect/></a:stretch>"#,
            r#"</pic:blipFill>"#,
            r#"<pic:spPr>"#,
            r#"<a:xfrm><a:off x="0" y="0"/><a:ext cx="{emu}" cy="{emu}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#,
            r#"</pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        ),
        emu = LOGO_EMU,
        id = docpr_id,
        rid = rid,
    )
}

fn new_header_xml(drawing_run: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<w:p><w:pPr><w:jc w:val="right"/></w:pPr>{run}</w:p></w:hdr>"#,
        ),
        run = drawing_run,
    )
}

/// `word/header1.xml` -> `word/_rels/header1.xml.rels`.
fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target (relative to `word/`, possibly given
/// package-absolute) to a part name.
fn resolve_part_name(target: &str) -> String {
    let target = target.trim_start_matches('/');
    if target.starts_with("word/") {
        target.to_string()
    } else {
        format!("word/{target}")
    }
}

/// `word/media/logo1.png` -> `media/logo1.png`.
fn relative_to_word(part: &str) -> String {
    part.strip_prefix("word/").unwrap_or(part).to_string()
}

fn free_part_name(package: &DocxPackage, stem: &str, extension: &str) -> String {
    let mut n = 1usize;
    loop {
        let candidate = format!("{stem}{n}.{extension}");
        if !package.has_part(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
