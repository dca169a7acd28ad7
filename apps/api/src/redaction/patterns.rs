use regex::Regex;

// Only addresses at this one provider are in scope for removal.
const EMAIL: &str = r"[a-zA-Z0-9._%+-]+@gmail\.com";
const GITHUB: &str = r"(?i)https?://(www\.)?github\.com/[^\s]+";
const LINKEDIN: &str = r"(?i)https?://(www\.)?linkedin\.com/[^\s]+";
// Best-effort heuristic: optional country code plus separator-grouped
// digits. Over- and under-matching are accepted.
const MOBILE: &str = r"\b(\+?\d{1,3}[-.\s]?(\(?\d{1,4}?\)?[-.\s]?)?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9})\b";

/// One redaction rule: a label for observability, the expression, and
/// whether the paragraph is whitespace-trimmed after removal (the URL
/// rules trim, the others do not).
pub struct Pattern {
    label: &'static str,
    regex: Regex,
    trim_after: bool,
}

impl Pattern {
    fn new(label: &'static str, pattern: &str, trim_after: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            regex: Regex::new(pattern)?,
            trim_after,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Removes every match, or returns `None` when nothing matched.
    pub fn scrub(&self, text: &str) -> Option<String> {
        if !self.regex.is_match(text) {
            return None;
        }
        let scrubbed = self.regex.replace_all(text, "");
        Some(if self.trim_after {
            scrubbed.trim().to_string()
        } else {
            scrubbed.into_owned()
        })
    }
}

/// The result of running the full pattern set over one piece of text.
pub struct Redaction {
    pub text: String,
    /// Labels of the patterns that removed something, in application order.
    pub removed: Vec<&'static str>,
}

/// The process-wide set of redaction rules. Compiled once at startup
/// and shared read-only across requests; application order is fixed:
/// email, github, linkedin, mobile, each substitution operating on the
/// previous one's output.
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                Pattern::new("email", EMAIL, false)?,
                Pattern::new("github", GITHUB, true)?,
                Pattern::new("linkedin", LINKEDIN, true)?,
                Pattern::new("mobile", MOBILE, false)?,
            ],
        })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Applies all patterns in order. `None` means the text contained
    /// nothing sensitive and is unchanged.
    pub fn redact(&self, text: &str) -> Option<Redaction> {
        let mut result: Option<Redaction> = None;
        for pattern in &self.patterns {
            let current = result.as_ref().map(|r| r.text.as_str()).unwrap_or(text);
            if let Some(scrubbed) = pattern.scrub(current) {
                match &mut result {
                    Some(r) => {
                        r.text = scrubbed;
                        r.removed.push(pattern.label());
                    }
                    None => {
                        result = Some(Redaction {
                            text: scrubbed,
                            removed: vec![pattern.label()],
                        });
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> PatternSet {
        PatternSet::new().unwrap()
    }

    #[test]
    fn test_email_removed_only_for_fixed_provider() {
        let redaction = set().redact("mail me: jane.doe+cv@gmail.com today").unwrap();
        assert_eq!(redaction.text, "mail me:  today");
        assert_eq!(redaction.removed, vec!["email"]);

        // other providers are out of scope
        assert!(set().redact("mail me: jane@example.com").is_none());
    }

    #[test]
    fn test_github_url_removed_case_insensitively() {
        let redaction = set()
            .redact("code at HTTPS://WWW.GITHUB.COM/jane (open source)")
            .unwrap();
        assert_eq!(redaction.removed, vec!["github"]);
        assert!(!redaction.text.to_lowercase().contains("github"));
    }

    #[test]
    fn test_linkedin_url_removed_and_trimmed() {
        let redaction = set()
            .redact("  https://www.linkedin.com/in/jane-doe  ")
            .unwrap();
        assert_eq!(redaction.text, "");
        assert_eq!(redaction.removed, vec!["linkedin"]);
    }

    #[test]
    fn test_mobile_numbers_removed() {
        for text in [
            "call +1 555 867 5309 now",
            "call 555-867-5309 now",
            "call (0151) 123 4567 now",
            "call +1 (555) 867-5309 now",
            "call 555.867.5309 now",
        ] {
            let redaction = set().redact(text).unwrap();
            assert!(redaction.removed.contains(&"mobile"), "missed: {text}");
            assert!(!redaction.text.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_sequential_substitution_example() {
        // the contract's worked example: email removed, then the GitHub
        // URL removed followed by a whole-text trim
        let redaction = set()
            .redact("Contact: foo@gmail.com or visit https://github.com/foo")
            .unwrap();
        assert_eq!(redaction.text, "Contact:  or visit");
        assert_eq!(redaction.removed, vec!["email", "github"]);
    }

    #[test]
    fn test_untouched_text_returns_none() {
        assert!(set().redact("Led a team of engineers").is_none());
        assert!(set().redact("").is_none());
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let cases = [
            "Contact: foo@gmail.com or visit https://github.com/foo",
            "call +91 98765 43210 or mail x@gmail.com",
            "https://linkedin.com/in/a https://github.com/b",
        ];
        for text in cases {
            let once = set().redact(text).unwrap().text;
            // a second pass must find nothing left to remove
            assert!(set().redact(&once).is_none(), "not idempotent for: {text}");
        }
    }

    #[test]
    fn test_non_matching_text_preserved_verbatim() {
        let redaction = set()
            .redact("Jane Doe <jane@gmail.com>, Senior Engineer")
            .unwrap();
        assert_eq!(redaction.text, "Jane Doe <>, Senior Engineer");
    }
}
