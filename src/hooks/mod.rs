//! Typed access to the platform's backend tables.
//!
//! Every resource gets the same fetch/mutate contract through
//! [`ResourceHook`]; resource modules add their domain operations on top
//! (sending a message, moving a contract to its next status, ...).
//!
//! # Example
//!
//! ```rust,ignore
//! use bizhub::hooks::{ContractStatus, ContractsHook};
//!
//! let contracts = ContractsHook::new(client.clone());
//! for contract in contracts.for_party(&user.id).await? {
//!     if contract.status == ContractStatus::PendingSignature { /* ... */ }
//! }
//! ```

mod arbitration;
mod contracts;
mod integrations;
mod messages;
mod payments;
mod roles;

pub use arbitration::{ArbitrationCase, ArbitrationCases, ArbitrationHook, CasePatch, CaseStatus, NewCase};
pub use contracts::{Contract, ContractPatch, ContractStatus, Contracts, ContractsHook, NewContract};
pub use integrations::{
    IntegrationPatch, IntegrationsHook, NewIntegration, PlatformIntegration, PlatformIntegrations,
};
pub use messages::{Message, MessagePatch, Messages, MessagesHook, NewMessage};
pub use payments::{NewPaymentOrder, PaymentOrder, PaymentOrderPatch, PaymentOrders, PaymentOrdersHook, PaymentStatus};
pub use roles::{NewUserRole, UserRole, UserRolePatch, UserRoles, UserRolesHook};

use crate::backend::{BackendClient, Query};
use crate::error::BackendError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// A backend table and the shapes used to read and write it.
pub trait Resource {
    const TABLE: &'static str;

    /// Row as read back from the table
    type Record: DeserializeOwned;
    /// Body for inserting a row
    type New: Serialize;
    /// Partial update body; `None` fields are left untouched
    type Patch: Serialize;
}

/// Uniform fetch/mutate handle for one resource.
pub struct ResourceHook<R: Resource> {
    client: BackendClient,
    _resource: PhantomData<R>,
}

impl<R: Resource> Clone for ResourceHook<R> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<R: Resource> ResourceHook<R> {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub async fn list(&self, query: &Query) -> Result<Vec<R::Record>, BackendError> {
        self.client.select(R::TABLE, query).await
    }

    pub async fn get(&self, id: &str) -> Result<R::Record, BackendError> {
        self.client
            .select_one(R::TABLE, &Query::new().eq("id", id))
            .await
    }

    pub async fn create(&self, new: &R::New) -> Result<R::Record, BackendError> {
        debug!("Creating row in {}", R::TABLE);
        self.client.insert(R::TABLE, new).await
    }

    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<R::Record, BackendError> {
        self.update_where(Query::new().eq("id", id), patch)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("{} row {}", R::TABLE, id)))
    }

    pub async fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.client
            .delete(R::TABLE, &Query::new().eq("id", id))
            .await
    }

    /// Patch the first row matching `query`; `None` when nothing matched.
    async fn update_where(
        &self,
        query: Query,
        patch: &R::Patch,
    ) -> Result<Option<R::Record>, BackendError> {
        debug!("Updating {} where {:?}", R::TABLE, query.params());
        let rows: Vec<R::Record> = self.client.update(R::TABLE, &query, patch).await?;
        Ok(rows.into_iter().next())
    }

    /// Patch row `id` only if its status is still `expected`.
    ///
    /// Guards status transitions against a concurrent change made by the
    /// other party between our read and our write.
    async fn update_if_status<S: fmt::Display>(
        &self,
        id: &str,
        expected: S,
        patch: &R::Patch,
    ) -> Result<R::Record, BackendError> {
        let query = Query::new()
            .eq("id", id)
            .eq("status", expected.to_string());
        self.update_where(query, patch).await?.ok_or_else(|| {
            BackendError::Validation(format!(
                "{} row {} is no longer {}",
                R::TABLE,
                id,
                expected
            ))
        })
    }
}

/// Reject a status change the workflow does not allow.
fn check_transition<S: fmt::Display>(
    what: &str,
    from: S,
    to: S,
    allowed: bool,
) -> Result<(), BackendError> {
    if allowed {
        Ok(())
    } else {
        Err(BackendError::Validation(format!(
            "{} cannot move from {} to {}",
            what, from, to
        )))
    }
}

/// Reject blank required text fields.
fn require_text(field: &str, value: &str) -> Result<(), BackendError> {
    if value.trim().is_empty() {
        Err(BackendError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}
