use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::BackendError;
use crate::retry::RetryConfig;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// One translation request as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
    pub source_language: String,
}

/// Something that can translate text.
///
/// The cache only depends on this seam, so tests and alternative
/// backends can plug in without touching coalescing or persistence.
pub trait Translator: Send + Sync {
    fn translate(&self, request: TranslationRequest) -> BoxFuture<'_, Result<String, BackendError>>;
}

/// Successful body of the translation edge function.
///
/// The function answers `{"translatedText": "..."}` on success and
/// `{"error": "..."}` when it could not translate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationResponse {
    #[serde(default)]
    translated_text: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Translator backed by the backend's translation edge function.
#[derive(Clone)]
pub struct EdgeFunctionTranslator {
    client: BackendClient,
    function: String,
    retry: RetryConfig,
}

impl EdgeFunctionTranslator {
    pub fn new(client: BackendClient, function: &str) -> Self {
        Self {
            client,
            function: function.to_string(),
            retry: RetryConfig::edge_function(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(BackendClient::from_config(config), &config.translate_function)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, request: TranslationRequest) -> Result<String, BackendError> {
        let response: TranslationResponse = self
            .client
            .invoke_with_retry(&self.function, &request, &self.retry)
            .await?;

        if let Some(error) = response.error {
            let message = match error {
                serde_json::Value::String(message) => message,
                other => other.to_string(),
            };
            return Err(BackendError::Unknown {
                status: Some(200),
                message: format!("translation function reported: {}", message),
            });
        }

        match response.translated_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(BackendError::malformed(Some(200), "empty translatedText")),
            None => Err(BackendError::malformed(Some(200), "missing translatedText")),
        }
    }
}

impl Translator for EdgeFunctionTranslator {
    fn translate(&self, request: TranslationRequest) -> BoxFuture<'_, Result<String, BackendError>> {
        self.call(request).boxed()
    }
}
