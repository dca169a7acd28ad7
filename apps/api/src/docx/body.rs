use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::package::DOCUMENT_PART;
use super::{local_name, DocxError, DocxPackage, Result};

/// A buffered `w:p` element: the start tag, everything between, and the
/// end tag, collected so the paragraph can be inspected and rewritten
/// as a unit.
pub(crate) struct ParagraphEvents {
    pub start: BytesStart<'static>,
    pub inner: Vec<Event<'static>>,
    pub end: BytesEnd<'static>,
}

/// Applies `transform` to the flattened run text of every paragraph in
/// `word/document.xml`. A `None` return leaves the paragraph untouched
/// (its runs round-trip byte-for-byte); a `Some` return replaces all
/// run-level content with a single run holding the new text. Paragraph
/// properties are kept, run styling collapses to the paragraph default.
/// Returns the number of rewritten paragraphs.
pub fn rewrite_paragraphs<F>(package: &mut DocxPackage, mut transform: F) -> Result<usize>
where
    F: FnMut(&str) -> Option<String>,
{
    let xml = package.part_str(DOCUMENT_PART)?;
    let (rewritten, count) = rewrite_xml(xml, &mut transform)?;
    if count > 0 {
        package.set_part(DOCUMENT_PART, rewritten.into_bytes());
    }
    Ok(count)
}

fn rewrite_xml<F>(xml: &str, transform: &mut F) -> Result<(String, usize)>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut count = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"p" => {
                let paragraph = collect_paragraph(&mut reader, &e)?;
                let text = paragraph_text(&paragraph.inner)?;
                match transform(&text) {
                    Some(new_text) => {
                        write_collapsed(&mut writer, &paragraph, &new_text)?;
                        count += 1;
                    }
                    None => write_verbatim(&mut writer, &paragraph)?,
                }
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    let out = String::from_utf8(writer.into_inner())
        .map_err(|e| DocxError::Utf8(e.utf8_error()))?;
    Ok((out, count))
}

/// Buffers the subtree of an already-consumed `w:p` start tag. Counts
/// nested `w:p` elements (text boxes) so the matching end tag is found.
pub(crate) fn collect_paragraph(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
) -> Result<ParagraphEvents> {
    let start = start.clone().into_owned();
    let mut inner = Vec::new();
    let mut depth = 1usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"p" => {
                depth += 1;
                inner.push(Event::Start(e.into_owned()));
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"p" => {
                depth -= 1;
                if depth == 0 {
                    return Ok(ParagraphEvents {
                        start,
                        inner,
                        end: e.into_owned(),
                    });
                }
                inner.push(Event::End(e.into_owned()));
            }
            Event::Eof => {
                return Err(DocxError::InvalidDocument(
                    "unterminated w:p element".to_string(),
                ))
            }
            event => inner.push(event.into_owned()),
        }
    }
}

/// Concatenates the text of every `w:t` inside the paragraph.
pub(crate) fn paragraph_text(inner: &[Event]) -> Result<String> {
    let mut text = String::new();
    let mut in_t = 0usize;
    for event in inner {
        match event {
            Event::Start(e) if local_name(e.name().as_ref()) == b"t" => in_t += 1,
            Event::End(e) if local_name(e.name().as_ref()) == b"t" => {
                in_t = in_t.saturating_sub(1)
            }
            Event::Text(e) if in_t > 0 => text.push_str(&e.unescape()?),
            _ => {}
        }
    }
    Ok(text)
}

fn write_verbatim(writer: &mut Writer<Vec<u8>>, paragraph: &ParagraphEvents) -> Result<()> {
    writer.write_event(Event::Start(paragraph.start.clone()))?;
    for event in &paragraph.inner {
        writer.write_event(event.clone())?;
    }
    writer.write_event(Event::End(paragraph.end.clone()))?;
    Ok(())
}

fn write_collapsed(
    writer: &mut Writer<Vec<u8>>,
    paragraph: &ParagraphEvents,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(paragraph.start.clone()))?;

    // keep the paragraph properties, drop everything else
    for event in leading_ppr(&paragraph.inner) {
        writer.write_event(event.clone())?;
    }

    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;

    writer.write_event(Event::End(paragraph.end.clone()))?;
    Ok(())
}

/// The `w:pPr` subtree if it opens the paragraph, per the OOXML schema.
pub(crate) fn leading_ppr<'a>(inner: &'a [Event<'a>]) -> &'a [Event<'a>] {
    match inner.first() {
        Some(Event::Empty(e)) if local_name(e.name().as_ref()) == b"pPr" => &inner[..1],
        Some(Event::Start(e)) if local_name(e.name().as_ref()) == b"pPr" => {
            for (i, event) in inner.iter().enumerate().skip(1) {
                if let Event::End(e) = event {
                    if local_name(e.name().as_ref()) == b"pPr" {
                        return &inner[..=i];
                    }
                }
            }
            &inner[..0]
        }
        _ => &inner[..0],
    }
}
