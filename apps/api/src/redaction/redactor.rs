use tracing::{debug, info};

use crate::docx::{self, body, DocxPackage};

use super::patterns::PatternSet;

/// Runs the pattern set over every paragraph of the document body,
/// in place. Paragraphs containing a match have their text replaced
/// with the scrubbed version; matching happens against the flattened
/// paragraph text, so a paragraph with several differently styled runs
/// collapses to a single run in that case.
/// Returns the number of redacted paragraphs.
pub fn redact_document(package: &mut DocxPackage, patterns: &PatternSet) -> docx::Result<usize> {
    let redacted = body::rewrite_paragraphs(package, |text| {
        patterns.redact(text).map(|redaction| {
            debug!(removed = ?redaction.removed, "redacted paragraph");
            redaction.text
        })
    })?;

    if redacted > 0 {
        info!(paragraphs = redacted, "removed sensitive content");
    }
    Ok(redacted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::DOCUMENT_PART;

    fn resume_package() -> DocxPackage {
        let doc = concat!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
            r#"<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Contact: foo@gmail.com or visit </w:t></w:r>"#,
            r#"<w:r><w:t>https://github.com/foo</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Mobile: +1 555 867 5309</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#,
        );
        DocxPackage::from_parts(vec![(DOCUMENT_PART, doc.as_bytes().to_vec())])
    }

    #[test]
    fn test_redacts_matching_paragraphs_only() {
        let patterns = PatternSet::new().unwrap();
        let mut package = resume_package();
        let redacted = redact_document(&mut package, &patterns).unwrap();
        assert_eq!(redacted, 2);

        let xml = package.part_str(DOCUMENT_PART).unwrap();
        assert!(!xml.contains("gmail.com"));
        assert!(!xml.contains("github.com"));
        assert!(!xml.contains("555"));
        // contact details spanning two runs are caught on the flattened text
        assert!(xml.contains(">Contact:  or visit<"));
        // the untouched paragraph keeps its original run
        assert!(xml.contains("<w:t>Jane Doe</w:t>"));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let patterns = PatternSet::new().unwrap();
        let mut package = resume_package();
        redact_document(&mut package, &patterns).unwrap();
        let after_first = package.part_str(DOCUMENT_PART).unwrap().to_string();

        let redacted = redact_document(&mut package, &patterns).unwrap();
        assert_eq!(redacted, 0);
        assert_eq!(package.part_str(DOCUMENT_PART).unwrap(), after_first);
    }

    #[test]
    fn test_paragraph_order_and_count_preserved() {
        let patterns = PatternSet::new().unwrap();
        let mut package = resume_package();
        let before = package.part_str(DOCUMENT_PART).unwrap().to_string();
        redact_document(&mut package, &patterns).unwrap();
        let after = package.part_str(DOCUMENT_PART).unwrap();

        assert_eq!(
            after.matches("<w:p>").count(),
            before.matches("<w:p>").count()
        );
        let jane = after.find("Jane Doe").unwrap();
        let contact = after.find("Contact:").unwrap();
        assert!(jane < contact);
    }
}
