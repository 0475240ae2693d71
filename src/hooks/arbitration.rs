use super::{check_transition, require_text, Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub struct ArbitrationCases;

impl Resource for ArbitrationCases {
    const TABLE: &'static str = "arbitration_cases";
    type Record = ArbitrationCase;
    type New = NewCase;
    type Patch = CasePatch;
}

pub type ArbitrationHook = ResourceHook<ArbitrationCases>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    UnderReview,
    Resolved,
    Dismissed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn can_transition_to(self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, next),
            (Open, UnderReview) | (UnderReview, Resolved) | (Open | UnderReview, Dismissed)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationCase {
    pub id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    pub claimant_id: String,
    pub respondent_id: String,
    #[serde(default)]
    pub arbitrator_id: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: CaseStatus,
    #[serde(default)]
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    pub claimant_id: String,
    pub respondent_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: CaseStatus,
}

impl NewCase {
    pub fn new(claimant_id: &str, respondent_id: &str, subject: &str) -> Self {
        Self {
            contract_id: None,
            claimant_id: claimant_id.to_string(),
            respondent_id: respondent_id.to_string(),
            subject: subject.to_string(),
            description: None,
            status: CaseStatus::Open,
        }
    }

    pub fn for_contract(mut self, contract_id: &str) -> Self {
        self.contract_id = Some(contract_id.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arbitrator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ResourceHook<ArbitrationCases> {
    pub async fn open_case(&self, case: NewCase) -> Result<ArbitrationCase, BackendError> {
        require_text("case subject", &case.subject)?;
        if case.claimant_id == case.respondent_id {
            return Err(BackendError::Validation(
                "claimant and respondent must differ".to_string(),
            ));
        }
        self.create(&case).await
    }

    /// Cases where `user_id` is claimant, respondent or arbitrator
    pub async fn for_party(&self, user_id: &str) -> Result<Vec<ArbitrationCase>, BackendError> {
        let query = Query::new()
            .or_eq(&[
                ("claimant_id", user_id),
                ("respondent_id", user_id),
                ("arbitrator_id", user_id),
            ])
            .order("created_at", false);
        self.list(&query).await
    }

    /// Cases still waiting for a decision
    pub async fn unresolved(&self) -> Result<Vec<ArbitrationCase>, BackendError> {
        let query = Query::new()
            .any_of("status", &[CaseStatus::Open.as_str(), CaseStatus::UnderReview.as_str()])
            .order("created_at", true);
        self.list(&query).await
    }

    /// Hand an open case to an arbitrator and start the review
    pub async fn assign(
        &self,
        case: &ArbitrationCase,
        arbitrator_id: &str,
    ) -> Result<ArbitrationCase, BackendError> {
        self.move_case(
            case,
            CaseStatus::UnderReview,
            CasePatch {
                arbitrator_id: Some(arbitrator_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn resolve(
        &self,
        case: &ArbitrationCase,
        resolution: &str,
    ) -> Result<ArbitrationCase, BackendError> {
        require_text("resolution", resolution)?;
        self.move_case(
            case,
            CaseStatus::Resolved,
            CasePatch {
                resolution: Some(resolution.to_string()),
                resolved_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn dismiss(
        &self,
        case: &ArbitrationCase,
        reason: &str,
    ) -> Result<ArbitrationCase, BackendError> {
        require_text("dismissal reason", reason)?;
        self.move_case(
            case,
            CaseStatus::Dismissed,
            CasePatch {
                resolution: Some(reason.to_string()),
                resolved_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    async fn move_case(
        &self,
        case: &ArbitrationCase,
        next: CaseStatus,
        mut patch: CasePatch,
    ) -> Result<ArbitrationCase, BackendError> {
        check_transition(
            "arbitration case",
            case.status,
            next,
            case.status.can_transition_to(next),
        )?;
        patch.status = Some(next);
        self.update_if_status(&case.id, case.status, &patch).await
    }
}
