//! PDF to DOCX format bridge. The PDF side is an opaque converter
//! (`pdf-extract`); whatever it reports is wrapped and surfaced as a
//! uniform bridge error. No layout fidelity is promised, only one
//! paragraph per extracted text line.

use std::fs::File;
use std::path::Path;

use docx_rs::{Docx, Paragraph, Run};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("PDF conversion failed: {0}")]
    Convert(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOCX assembly failed: {0}")]
    Assemble(String),
}

/// Converts the PDF at `pdf_path` into a new DOCX written to
/// `docx_path`.
pub fn convert_pdf_to_docx(pdf_path: &Path, docx_path: &Path) -> Result<(), BridgeError> {
    let text =
        pdf_extract::extract_text(pdf_path).map_err(|e| BridgeError::Convert(e.to_string()))?;

    let file = File::create(docx_path)?;
    docx_from_text(&text)
        .build()
        .pack(file)
        .map_err(|e| BridgeError::Assemble(e.to_string()))?;

    info!(target_path = %docx_path.display(), "converted PDF to DOCX");
    Ok(())
}

/// One paragraph per extracted line; blank lines become empty
/// paragraphs so vertical structure survives the conversion.
pub(crate) fn docx_from_text(text: &str) -> Docx {
    let mut docx = Docx::new();
    for line in text.lines() {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line.trim_end())));
    }
    docx
}

/// Test fixture helper: a minimal single-page PDF with one Helvetica
/// text object, assembled with correct xref offsets.
#[cfg(test)]
pub(crate) fn pdf_bytes_from_text(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        concat!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] ",
            "/Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>",
        )
        .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref_offset = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// Test fixture helper: a complete in-memory DOCX built from plain text.
#[cfg(test)]
pub(crate) fn docx_bytes_from_text(text: &str) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    docx_from_text(text)
        .build()
        .pack(&mut cursor)
        .expect("packing an in-memory DOCX cannot fail");
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::DOCUMENT_PART;
    use crate::docx::DocxPackage;

    #[test]
    fn test_bridged_docx_is_a_valid_package() {
        let bytes = docx_bytes_from_text("First line\nSecond line");
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        let xml = package.part_str(DOCUMENT_PART).unwrap();
        assert!(xml.contains("First line"));
        assert!(xml.contains("Second line"));
    }

    #[test]
    fn test_bridged_paragraphs_feed_the_redactor() {
        let bytes = docx_bytes_from_text("Reach me at foo@gmail.com\nExperience");
        let mut package = DocxPackage::from_bytes(&bytes).unwrap();
        let patterns = crate::redaction::PatternSet::new().unwrap();
        let redacted = crate::redaction::redact_document(&mut package, &patterns).unwrap();
        assert_eq!(redacted, 1);
        assert!(!package.part_str(DOCUMENT_PART).unwrap().contains("gmail"));
    }

    #[test]
    fn test_converts_simple_pdf_to_docx() {
        let dir = tempfile::tempdir().unwrap();
        let pdf_path = dir.path().join("resume.pdf");
        let docx_path = dir.path().join("resume.docx");
        std::fs::write(&pdf_path, pdf_bytes_from_text("Experience")).unwrap();

        convert_pdf_to_docx(&pdf_path, &docx_path).unwrap();

        let bytes = std::fs::read(&docx_path).unwrap();
        let package = DocxPackage::from_bytes(&bytes).unwrap();
        assert!(package.part_str(DOCUMENT_PART).unwrap().contains("Experience"));
    }

    #[test]
    fn test_missing_pdf_reports_a_convert_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_pdf_to_docx(&dir.path().join("absent.pdf"), &dir.path().join("out.docx"));
        assert!(matches!(result, Err(BridgeError::Convert(_))));
    }
}
