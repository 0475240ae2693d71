use super::{require_text, Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub struct PlatformIntegrations;

impl Resource for PlatformIntegrations {
    const TABLE: &'static str = "platform_integrations";
    type Record = PlatformIntegration;
    type New = NewIntegration;
    type Patch = IntegrationPatch;
}

pub type IntegrationsHook = ResourceHook<PlatformIntegrations>;

/// A third-party service connected to the platform (payments, shipping, e-signature, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformIntegration {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub enabled: bool,
    /// Provider-specific settings, always a JSON object
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIntegration {
    pub provider: String,
    pub name: String,
    pub enabled: bool,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceHook<PlatformIntegrations> {
    pub async fn all(&self) -> Result<Vec<PlatformIntegration>, BackendError> {
        self.list(&Query::new().order("name", true)).await
    }

    pub async fn enabled(&self) -> Result<Vec<PlatformIntegration>, BackendError> {
        let query = Query::new().eq("enabled", true).order("name", true);
        self.list(&query).await
    }

    /// Register a new integration, disabled until explicitly turned on
    pub async fn register(
        &self,
        provider: &str,
        name: &str,
        config: serde_json::Value,
    ) -> Result<PlatformIntegration, BackendError> {
        require_text("integration provider", provider)?;
        require_text("integration name", name)?;
        check_config(&config)?;
        let integration = NewIntegration {
            provider: provider.to_string(),
            name: name.to_string(),
            enabled: false,
            config,
        };
        self.create(&integration).await
    }

    pub async fn set_enabled(
        &self,
        id: &str,
        enabled: bool,
    ) -> Result<PlatformIntegration, BackendError> {
        let patch = IntegrationPatch {
            enabled: Some(enabled),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        self.update(id, &patch).await
    }

    pub async fn update_config(
        &self,
        id: &str,
        config: serde_json::Value,
    ) -> Result<PlatformIntegration, BackendError> {
        check_config(&config)?;
        let patch = IntegrationPatch {
            config: Some(config),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        self.update(id, &patch).await
    }
}

fn check_config(config: &serde_json::Value) -> Result<(), BackendError> {
    if config.is_object() {
        Ok(())
    } else {
        Err(BackendError::Validation(
            "integration config must be a JSON object".to_string(),
        ))
    }
}
