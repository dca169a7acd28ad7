pub mod patterns;
pub mod redactor;

pub use patterns::PatternSet;
pub use redactor::redact_document;
