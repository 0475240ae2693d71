use anyhow::{bail, Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Backend
    pub backend_url: String,
    pub backend_anon_key: String,
    pub backend_access_token: Option<String>,

    // Translation
    pub translate_function: String,
    pub default_source_locale: String,
    pub cache_dir: PathBuf,

    // Routing
    pub login_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend_url = std::env::var("BACKEND_URL").context("BACKEND_URL not set")?;
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            bail!("BACKEND_URL must start with http:// or https://, got '{}'", backend_url);
        }

        Ok(Self {
            // Backend
            backend_url: backend_url.trim_end_matches('/').to_string(),
            backend_anon_key: std::env::var("BACKEND_ANON_KEY")
                .context("BACKEND_ANON_KEY not set")?,
            backend_access_token: std::env::var("BACKEND_ACCESS_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            // Translation
            translate_function: std::env::var("TRANSLATE_FUNCTION")
                .unwrap_or_else(|_| "translate".to_string()),
            default_source_locale: std::env::var("DEFAULT_SOURCE_LOCALE")
                .unwrap_or_else(|_| "en".to_string()),
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".bizhub")),

            // Routing
            login_path: std::env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
        })
    }
}
