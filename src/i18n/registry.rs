//! Locale registry: the platform's supported interface locales.
//!
//! Translation itself accepts any well-formed locale; the registry only
//! describes the locales the interface ships with (names, direction, whether
//! they are offered to users). It is immutable once built.

use std::sync::OnceLock;

/// Metadata for one interface locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// Primary language subtag (e.g., "en", "fr", "ar")
    pub code: &'static str,

    /// English name of the language (e.g., "French")
    pub name: &'static str,

    /// Native name of the language (e.g., "Français")
    pub native_name: &'static str,

    /// Whether this is the canonical/source locale (only one should be true)
    pub is_canonical: bool,

    /// Whether the language is written right-to-left
    pub rtl: bool,

    /// Whether the locale is offered in the language picker
    pub enabled: bool,
}

pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the shared registry, building it on first use.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Look up a locale by its primary language subtag.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales
            .iter()
            .find(|locale| locale.code.eq_ignore_ascii_case(code))
    }

    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|locale| locale.enabled).collect()
    }

    pub fn list_all(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().collect()
    }

    /// The canonical locale all interface strings are authored in.
    ///
    /// Falls back to the first entry if none is flagged canonical.
    pub fn canonical(&self) -> &LocaleConfig {
        self.locales
            .iter()
            .find(|locale| locale.is_canonical)
            .unwrap_or(&self.locales[0])
    }
}

fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_canonical: false,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "pt",
            name: "Portuguese",
            native_name: "Português",
            is_canonical: false,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            is_canonical: false,
            rtl: true,
            enabled: true,
        },
        LocaleConfig {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
            is_canonical: false,
            rtl: false,
            enabled: true,
        },
        LocaleConfig {
            code: "tr",
            name: "Turkish",
            native_name: "Türkçe",
            is_canonical: false,
            rtl: false,
            enabled: false,
        },
    ]
}
