use std::io::Write;

use anyhow::Context;
use tracing::info;

use crate::bridge;
use crate::docx::{header, DocxPackage, LogoAsset};
use crate::errors::AppError;
use crate::redaction::{redact_document, PatternSet};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const RESUME_EXTENSIONS: [&str; 2] = [".pdf", ".docx"];

pub fn validate_resume_name(name: &str) -> Result<(), AppError> {
    if RESUME_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Ok(())
    } else {
        Err(AppError::Validation("Unsupported file format".to_string()))
    }
}

pub fn is_pdf(name: &str) -> bool {
    name.ends_with(".pdf")
}

/// Suggested download name: the input name with any `.pdf` rewritten to
/// `.docx`, behind the fixed `updated_` prefix.
pub fn output_filename(input: &str) -> String {
    format!("updated_{}", input.replace(".pdf", ".docx"))
}

/// PDF leg of the pipeline: spill the upload to a scoped temporary
/// file, convert next to it, read the converted bytes back. Both
/// temporary files are unique to this request and removed when the
/// guards drop, on success and on every failure path.
pub fn bridge_pdf(pdf_bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut pdf_file = tempfile::Builder::new()
        .prefix("resume-upload-")
        .suffix(".pdf")
        .tempfile()
        .context("creating temporary PDF file")?;
    pdf_file
        .write_all(pdf_bytes)
        .and_then(|_| pdf_file.flush())
        .context("writing temporary PDF file")?;

    let docx_file = tempfile::Builder::new()
        .prefix("resume-upload-")
        .suffix(".docx")
        .tempfile()
        .context("creating temporary DOCX file")?;

    bridge::convert_pdf_to_docx(pdf_file.path(), docx_file.path())?;

    let bytes = std::fs::read(docx_file.path()).context("reading converted DOCX")?;
    info!(bytes = bytes.len(), "bridged PDF input to DOCX");
    Ok(bytes)
}

/// Core document pipeline: load the package, insert the logo, then
/// redact. The order is fixed; redaction only looks at text, so it
/// never sees the header image either way.
pub fn process_docx(
    docx_bytes: &[u8],
    logo: &LogoAsset,
    patterns: &PatternSet,
) -> Result<Vec<u8>, AppError> {
    let mut package = DocxPackage::from_bytes(docx_bytes)?;
    header::insert_logo(&mut package, logo)?;
    redact_document(&mut package, patterns)?;
    Ok(package.to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::DOCUMENT_PART;

    #[test]
    fn test_resume_extension_allow_list() {
        assert!(validate_resume_name("resume.pdf").is_ok());
        assert!(validate_resume_name("resume.docx").is_ok());
        assert!(validate_resume_name("resume.txt").is_err());
        assert!(validate_resume_name("resume.doc").is_err());
        assert!(validate_resume_name("resume").is_err());
    }

    #[test]
    fn test_output_filename_rewrites_pdf_suffix() {
        assert_eq!(output_filename("resume.pdf"), "updated_resume.docx");
        assert_eq!(output_filename("resume.docx"), "updated_resume.docx");
        assert_eq!(output_filename("cv final.pdf"), "updated_cv final.docx");
    }

    #[test]
    fn test_process_docx_inserts_logo_and_redacts() {
        let input = crate::bridge::docx_bytes_from_text(
            "Jane Doe\nContact: foo@gmail.com or visit https://github.com/foo",
        );
        let logo = LogoAsset::from_upload("logo.png", vec![0x89, b'P', b'N', b'G']).unwrap();
        let patterns = PatternSet::new().unwrap();

        let output = process_docx(&input, &logo, &patterns).unwrap();
        let package = DocxPackage::from_bytes(&output).unwrap();

        let xml = package.part_str(DOCUMENT_PART).unwrap();
        assert!(xml.contains("Contact:  or visit"));
        assert!(!xml.contains("gmail.com"));
        assert!(package.has_part("word/media/logo1.png"));
    }

    #[test]
    fn test_process_docx_rejects_garbage_input() {
        let logo = LogoAsset::from_upload("logo.png", vec![0x89]).unwrap();
        let patterns = PatternSet::new().unwrap();
        let result = process_docx(b"not a zip archive", &logo, &patterns);
        assert!(matches!(result, Err(AppError::Processing(_))));
    }
}
