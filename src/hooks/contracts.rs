use super::{check_transition, require_text, Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub struct Contracts;

impl Resource for Contracts {
    const TABLE: &'static str = "contracts";
    type Record = Contract;
    type New = NewContract;
    type Patch = ContractPatch;
}

pub type ContractsHook = ResourceHook<Contracts>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    PendingSignature,
    Active,
    Completed,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingSignature => "pending_signature",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        }
    }

    /// draft -> pending_signature -> active -> completed, and any
    /// non-final status may be terminated.
    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, next),
            (Draft, PendingSignature)
                | (PendingSignature, Draft)
                | (PendingSignature, Active)
                | (Active, Completed)
                | (Draft | PendingSignature | Active, Terminated)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub title: String,
    pub buyer_id: String,
    pub supplier_id: String,
    pub status: ContractStatus,
    /// Contract value in minor currency units
    pub value_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewContract {
    pub title: String,
    pub buyer_id: String,
    pub supplier_id: String,
    pub value_cents: i64,
    pub currency: String,
    pub status: ContractStatus,
}

impl NewContract {
    pub fn draft(title: &str, buyer_id: &str, supplier_id: &str, value_cents: i64, currency: &str) -> Self {
        Self {
            title: title.to_string(),
            buyer_id: buyer_id.to_string(),
            supplier_id: supplier_id.to_string(),
            value_cents,
            currency: currency.to_string(),
            status: ContractStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContractPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContractStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceHook<Contracts> {
    /// Contracts where `user_id` is buyer or supplier, newest first
    pub async fn for_party(&self, user_id: &str) -> Result<Vec<Contract>, BackendError> {
        let query = Query::new()
            .or_eq(&[("buyer_id", user_id), ("supplier_id", user_id)])
            .order("created_at", false);
        self.list(&query).await
    }

    pub async fn draft(&self, contract: NewContract) -> Result<Contract, BackendError> {
        require_text("contract title", &contract.title)?;
        if contract.value_cents <= 0 {
            return Err(BackendError::Validation(
                "contract value must be positive".to_string(),
            ));
        }
        if contract.buyer_id == contract.supplier_id {
            return Err(BackendError::Validation(
                "buyer and supplier must differ".to_string(),
            ));
        }
        self.create(&contract).await
    }

    /// Move `contract` to `next`, failing if the move is not allowed or the
    /// stored status changed since `contract` was read.
    pub async fn transition(
        &self,
        contract: &Contract,
        next: ContractStatus,
    ) -> Result<Contract, BackendError> {
        check_transition(
            "contract",
            contract.status,
            next,
            contract.status.can_transition_to(next),
        )?;

        let patch = ContractPatch {
            status: Some(next),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        self.update_if_status(&contract.id, contract.status, &patch)
            .await
    }
}
