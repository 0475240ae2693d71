//! Locale identifiers.
//!
//! A `Locale` is a validated, normalized language tag such as `en`, `pt-BR`
//! or `zh-Hant`. Unlike interface locales it is not restricted to the
//! registry: any well-formed tag can be a translation target.

use crate::i18n::{LocaleConfig, LocaleRegistry};
use anyhow::{bail, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// A validated locale identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
    /// Normalized tag: lowercase language, Titlecase script, uppercase region
    tag: String,
}

impl Locale {
    /// Parse and normalize a locale identifier.
    ///
    /// Accepts `-` or `_` as separator and any letter case; `pt_br` becomes
    /// `pt-BR` and `ZH-hant` becomes `zh-Hant`.
    pub fn parse(code: &str) -> Result<Locale> {
        let regex = TAG_REGEX.get_or_init(|| {
            Regex::new(r"^([A-Za-z]{2,3})(?:[-_]([A-Za-z]{4}))?(?:[-_]([A-Za-z]{2}|[0-9]{3}))?$")
                .expect("locale pattern is valid")
        });

        let trimmed = code.trim();
        let Some(caps) = regex.captures(trimmed) else {
            bail!("Invalid locale identifier: '{}'", code);
        };

        let mut tag = caps[1].to_ascii_lowercase();
        if let Some(script) = caps.get(2) {
            let script = script.as_str();
            tag.push('-');
            tag.push_str(&script[..1].to_ascii_uppercase());
            tag.push_str(&script[1..].to_ascii_lowercase());
        }
        if let Some(region) = caps.get(3) {
            tag.push('-');
            tag.push_str(&region.as_str().to_ascii_uppercase());
        }

        Ok(Locale { tag })
    }

    /// The canonical locale from the registry (English).
    pub fn canonical() -> Locale {
        Locale {
            tag: LocaleRegistry::get().canonical().code.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }

    /// Primary language subtag (e.g., "pt" for "pt-BR").
    pub fn language(&self) -> &str {
        self.tag.split('-').next().unwrap_or(&self.tag)
    }

    /// Registry entry for this locale's language, if the interface ships it.
    pub fn config(&self) -> Option<&'static LocaleConfig> {
        LocaleRegistry::get().get_by_code(self.language())
    }

    pub fn is_canonical(&self) -> bool {
        self.config().map(|c| c.is_canonical).unwrap_or(false)
    }

    /// Whether the interface offers this locale in its picker.
    pub fn is_supported(&self) -> bool {
        self.config().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn is_rtl(&self) -> bool {
        self.config().map(|c| c.rtl).unwrap_or(false)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Locale::parse(s)
    }
}
