//! Verification-code extraction from email bodies.
//!
//! [`CodeExtractor`] implements the heuristic used by the scanner: a 4–8 digit run
//! shortly after a keyword such as "code" or "código" wins; failing that, bare
//! 6-digit runs are taken. The [`Matcher`] trait and the regex-based matchers it is
//! built from can be used on their own.
//!
//! # Example
//!
//! ```
//! use streamcode_scan::matcher::{CodeExtractor, Matcher, OtpMatcher};
//!
//! let extractor = CodeExtractor::default();
//! assert_eq!(extractor.extract("Your code is 482913 verification"), ["482913"]);
//!
//! let otp = OtpMatcher::six_digit();
//! assert_eq!(otp.find_match("Ref 2024, PIN 123456").as_deref(), Some("123456"));
//! ```

use crate::normalize::fold;
use crate::render::visible_text;
use regex::Regex;
use std::borrow::Cow;

/// Keywords that announce a code, already folded.
pub const CODE_KEYWORDS: [&str; 16] = [
    "code",
    "codigo",
    "verification",
    "verificacao",
    "verify",
    "otp",
    "passcode",
    "password",
    "login",
    "signin",
    "sign-in",
    "sign in",
    "access",
    "acesso",
    "acceso",
    "pin",
];

/// How far (in characters) a code may follow its keyword.
pub const KEYWORD_WINDOW: usize = 20;

/// Maximum number of codes reported per message.
pub const MAX_CODES: usize = 3;

/// Trait for matching and extracting content from email bodies.
pub trait Matcher: Send + Sync {
    /// Attempts to find and extract matching content from the text.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns every match in order of appearance.
    fn find_all<'a>(&self, text: &'a str) -> Vec<Cow<'a, str>> {
        self.find_match(text).into_iter().collect()
    }

    /// Returns a human-readable description of what this matcher looks for.
    fn description(&self) -> &str;
}

/// Regex-based matcher that extracts the first capture group.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    description: String,
}

impl RegexMatcher {
    /// Creates a new regex matcher.
    ///
    /// The regex should contain at least one capture group.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Self::with_description(pattern, format!("regex pattern: {pattern}"))
    }

    /// Creates a new regex matcher with a custom description.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn with_description(
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: description.into(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| Cow::Borrowed(m.as_str()))
    }

    fn find_all<'a>(&self, text: &'a str) -> Vec<Cow<'a, str>> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| Cow::Borrowed(m.as_str()))
            .collect()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Matcher for bare N-digit codes.
///
/// ```
/// use streamcode_scan::matcher::{OtpMatcher, Matcher};
///
/// let otp = OtpMatcher::six_digit();
/// assert_eq!(otp.find_match("Your code is 123456."), Some("123456".into()));
/// assert_eq!(otp.find_match("Code: 12345"), None);
/// ```
#[derive(Debug, Clone)]
pub struct OtpMatcher {
    inner: RegexMatcher,
}

impl OtpMatcher {
    /// Creates a matcher for 6-digit codes.
    #[must_use]
    pub fn six_digit() -> Self {
        Self::n_digit(6)
    }

    /// Creates a matcher for exactly `digits` consecutive digits.
    ///
    /// # Panics
    ///
    /// Panics if `digits` is 0.
    #[must_use]
    pub fn n_digit(digits: usize) -> Self {
        assert!(digits > 0, "digits must be > 0");
        let pattern = format!(r"\b(\d{{{digits}}})\b");
        Self {
            inner: RegexMatcher::with_description(&pattern, format!("{digits}-digit code"))
                .expect("valid regex"),
        }
    }
}

impl Matcher for OtpMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.inner.find_match(text)
    }

    fn find_all<'a>(&self, text: &'a str) -> Vec<Cow<'a, str>> {
        self.inner.find_all(text)
    }

    fn description(&self) -> &str {
        self.inner.description()
    }
}

/// Extracts verification codes from a message body (plain text or HTML).
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    contextual: RegexMatcher,
    fallback: OtpMatcher,
    max_codes: usize,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(CODE_KEYWORDS, MAX_CODES)
    }
}

impl CodeExtractor {
    /// Creates an extractor for the given keyword vocabulary.
    ///
    /// Keywords are folded and regex-escaped. At most `max_codes` codes are returned.
    ///
    /// # Panics
    ///
    /// Panics if `keywords` is empty.
    #[must_use]
    pub fn new<I>(keywords: I, max_codes: usize) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let alternation = keywords
            .into_iter()
            .map(|k| regex::escape(&fold(k.as_ref())))
            .collect::<Vec<_>>()
            .join("|");
        assert!(!alternation.is_empty(), "keywords must not be empty");

        let pattern = format!(r"(?i)\b(?:{alternation})\D{{0,{KEYWORD_WINDOW}}}?\b(\d{{4,8}})\b");

        Self {
            contextual: RegexMatcher::with_description(&pattern, "keyword-anchored code")
                .expect("valid regex"),
            fallback: OtpMatcher::six_digit(),
            max_codes,
        }
    }

    /// Returns the codes found in an HTML body.
    ///
    /// Markup is stripped first so attribute values (colours, widths) are never
    /// mistaken for codes.
    #[must_use]
    pub fn extract_html(&self, html: &str) -> Vec<String> {
        self.extract(&visible_text(html))
    }

    /// Returns the codes found in plain text, deduplicated in order of appearance.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<String> {
        let text = fold(text);

        let mut found = self.contextual.find_all(&text);
        if found.is_empty() {
            found = self.fallback.find_all(&text);
        }

        let mut codes: Vec<String> = Vec::new();
        for code in found {
            if codes.len() == self.max_codes {
                break;
            }
            if !codes.iter().any(|c| c == code.as_ref()) {
                codes.push(code.into_owned());
            }
        }
        codes
    }
}

impl Matcher for CodeExtractor {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.extract(text).into_iter().next().map(Cow::Owned)
    }

    fn find_all<'a>(&self, text: &'a str) -> Vec<Cow<'a, str>> {
        self.extract(text).into_iter().map(Cow::Owned).collect()
    }

    fn description(&self) -> &str {
        "verification code"
    }
}
