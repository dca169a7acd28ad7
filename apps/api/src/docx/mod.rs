//! Minimal OOXML (DOCX) container handling: enough of the package,
//! body, header, relationship, and content-type plumbing to rewrite
//! paragraph text and stamp an image into a section header. Everything
//! else in the package is passed through untouched.

pub mod body;
pub mod content_types;
pub mod header;
pub mod package;
pub mod rels;

pub use header::{ImageFormat, LogoAsset};
pub use package::DocxPackage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid DOCX: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, DocxError>;

/// Strips the namespace prefix from a qualified XML name
/// (`w:p` -> `p`). DOCX parts use conventional prefixes but only the
/// local name is significant here.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

pub(crate) fn qname_string(name: &[u8]) -> Result<String> {
    Ok(std::str::from_utf8(name)?.to_string())
}
