//! Internationalization support.
//!
//! - `locale`: validated, normalized locale identifiers
//! - `registry`: the interface locales the platform ships with
//! - `validator`: checks that a translation kept links, placeholders and amounts
//! - `metrics`: per-cache translation counters
//!
//! # Example
//!
//! ```rust,ignore
//! use bizhub::i18n::{Locale, LocaleRegistry};
//!
//! let target = Locale::parse("pt_br")?; // "pt-BR"
//! let offered = LocaleRegistry::get().list_enabled();
//! ```

mod locale;
mod metrics;
mod registry;
mod validator;

pub use locale::Locale;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LocaleConfig, LocaleRegistry};
pub use validator::{TranslationValidator, ValidationReport};
