//! Text translation with memoization and request coalescing.
//!
//! - `cache`: the `TranslationCache` callers talk to
//! - `translator`: the seam to the translation backend (edge function by default)
//! - `store`: durable single-slot storage the cache is persisted to
//!
//! # Example
//!
//! ```rust,ignore
//! use bizhub::translation::TranslationCache;
//!
//! let cache = TranslationCache::from_config(&config);
//! let label = cache.translate("Pending approval", "fr", None).await;
//! ```

mod cache;
mod store;
mod translator;

pub use cache::TranslationCache;
pub use store::{CacheStore, FileStore, MemoryStore, CACHE_SLOT};
pub use translator::{EdgeFunctionTranslator, TranslationRequest, Translator};
