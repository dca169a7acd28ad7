use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{DocxError, Result};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

struct Part {
    name: String,
    data: Vec<u8>,
}

/// An opened DOCX package: the ordered ZIP entries held in memory.
/// Mutations replace whole parts; serialization preserves entry order
/// so untouched parts round-trip as-is.
pub struct DocxPackage {
    parts: Vec<Part>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            parts.push(Part {
                name: entry.name().to_string(),
                data,
            });
        }

        let package = Self { parts };
        if package.part(DOCUMENT_PART).is_none() {
            return Err(DocxError::InvalidDocument(format!(
                "missing {DOCUMENT_PART}"
            )));
        }
        Ok(package)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(parts: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            parts: parts
                .into_iter()
                .map(|(name, data)| Part {
                    name: name.to_string(),
                    data,
                })
                .collect(),
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// The part's contents as UTF-8, or an error naming the missing part.
    pub fn part_str(&self, name: &str) -> Result<&str> {
        let data = self
            .part(name)
            .ok_or_else(|| DocxError::InvalidDocument(format!("missing {name}")))?;
        Ok(std::str::from_utf8(data)?)
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    /// Replaces an existing part or appends a new one.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_docx() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_round_trip_preserves_parts() {
        let package = DocxPackage::from_bytes(&minimal_docx()).unwrap();
        let bytes = package.to_bytes().unwrap();
        let reopened = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.part(DOCUMENT_PART).unwrap(), b"<w:document/>");
    }

    #[test]
    fn test_rejects_archive_without_document_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            DocxPackage::from_bytes(&bytes),
            Err(DocxError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_rejects_non_zip_input() {
        assert!(DocxPackage::from_bytes(b"%PDF-1.7 not a zip").is_err());
    }

    #[test]
    fn test_set_part_replaces_and_appends() {
        let mut package = DocxPackage::from_bytes(&minimal_docx()).unwrap();
        package.set_part(DOCUMENT_PART, b"<w:document>x</w:document>".to_vec());
        package.set_part("word/header1.xml", b"<w:hdr/>".to_vec());
        assert_eq!(
            package.part(DOCUMENT_PART).unwrap(),
            b"<w:document>x</w:document>"
        );
        assert!(package.has_part("word/header1.xml"));
    }
}
