//! Translation quality checks.
//!
//! Business text carries tokens a translation must not touch: links, e-mail
//! addresses, template placeholders and amounts. The validator compares the
//! source and the translation and reports what went missing.

use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Tokens that must survive translation verbatim but did not
    pub errors: Vec<String>,

    /// Likely problems that may be legitimate (e.g., reformatted numbers)
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TranslationValidator;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Check that a translation preserves the tokens of its source.
    ///
    /// URLs, e-mail addresses and `{placeholders}` must appear unchanged
    /// (errors). Numbers are compared by their digits only, since locales
    /// format separators differently (warnings).
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let missing_urls = Self::missing(&Self::extract_urls(original), translated);
        if !missing_urls.is_empty() {
            report
                .errors
                .push(format!("URL missing from translation: {:?}", missing_urls));
        }

        let missing_emails = Self::missing(&Self::extract_emails(original), translated);
        if !missing_emails.is_empty() {
            report
                .errors
                .push(format!("E-mail missing from translation: {:?}", missing_emails));
        }

        // Word order differs between languages, so only the set of names matters
        let mut orig_placeholders = Self::extract_placeholders(original);
        let mut trans_placeholders = Self::extract_placeholders(translated);
        orig_placeholders.sort();
        trans_placeholders.sort();
        if orig_placeholders != trans_placeholders {
            report.errors.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        let mut orig_numbers = Self::extract_numbers(original);
        let mut trans_numbers = Self::extract_numbers(translated);
        orig_numbers.sort();
        trans_numbers.sort();
        if orig_numbers != trans_numbers {
            report.warnings.push(format!(
                "Number mismatch: original has {:?}, translation has {:?}",
                orig_numbers, trans_numbers
            ));
        }

        report
    }

    fn missing(tokens: &[String], translated: &str) -> Vec<String> {
        tokens
            .iter()
            .filter(|token| !translated.contains(token.as_str()))
            .cloned()
            .collect()
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]>]+").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
            .collect()
    }

    fn extract_emails(text: &str) -> Vec<String> {
        let regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
                .unwrap()
        });

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// `{name}` and `{{ name }}` style template placeholders, in order
    fn extract_placeholders(text: &str) -> Vec<String> {
        let regex = PLACEHOLDER_REGEX
            .get_or_init(|| Regex::new(r"\{\{?\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}?\}").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    /// Digit runs of every number, with grouping and decimal separators dropped
    fn extract_numbers(text: &str) -> Vec<String> {
        let regex =
            NUMBER_REGEX.get_or_init(|| Regex::new(r"\d+(?:[.,\u{00A0}\u{202F} ]\d+)*").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect())
            .collect()
    }
}
