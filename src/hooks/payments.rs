use super::{check_transition, Resource, ResourceHook};
use crate::backend::Query;
use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub struct PaymentOrders;

impl Resource for PaymentOrders {
    const TABLE: &'static str = "payment_orders";
    type Record = PaymentOrder;
    type New = NewPaymentOrder;
    type Patch = PaymentOrderPatch;
}

pub type PaymentOrdersHook = ResourceHook<PaymentOrders>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid | Failed | Cancelled) | (Paid, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    pub user_id: String,
    /// Amount in minor currency units
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub description: Option<String>,
    /// Reference assigned by the payment provider once captured
    #[serde(default)]
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentOrder {
    pub user_id: String,
    pub amount_cents: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentOrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
}

/// ISO 4217 style: three uppercase ASCII letters
fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

impl ResourceHook<PaymentOrders> {
    /// Orders placed by `user_id`, newest first
    pub async fn for_user(&self, user_id: &str) -> Result<Vec<PaymentOrder>, BackendError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order("created_at", false);
        self.list(&query).await
    }

    /// Create a pending order for `amount_cents` of `currency`
    pub async fn place(
        &self,
        user_id: &str,
        amount_cents: i64,
        currency: &str,
        description: Option<&str>,
    ) -> Result<PaymentOrder, BackendError> {
        if amount_cents <= 0 {
            return Err(BackendError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        if !is_currency_code(currency) {
            return Err(BackendError::Validation(format!(
                "invalid currency code '{}'",
                currency
            )));
        }

        let order = NewPaymentOrder {
            user_id: user_id.to_string(),
            amount_cents,
            currency: currency.to_string(),
            description: description.map(str::to_string),
            status: PaymentStatus::Pending,
        };
        self.create(&order).await
    }

    pub async fn mark_paid(
        &self,
        order: &PaymentOrder,
        provider_reference: &str,
    ) -> Result<PaymentOrder, BackendError> {
        self.move_order(
            order,
            PaymentStatus::Paid,
            Some(provider_reference.to_string()),
        )
        .await
    }

    pub async fn mark_failed(&self, order: &PaymentOrder) -> Result<PaymentOrder, BackendError> {
        self.move_order(order, PaymentStatus::Failed, None).await
    }

    pub async fn cancel(&self, order: &PaymentOrder) -> Result<PaymentOrder, BackendError> {
        self.move_order(order, PaymentStatus::Cancelled, None).await
    }

    pub async fn refund(&self, order: &PaymentOrder) -> Result<PaymentOrder, BackendError> {
        self.move_order(order, PaymentStatus::Refunded, None).await
    }

    async fn move_order(
        &self,
        order: &PaymentOrder,
        next: PaymentStatus,
        provider_reference: Option<String>,
    ) -> Result<PaymentOrder, BackendError> {
        check_transition(
            "payment order",
            order.status,
            next,
            order.status.can_transition_to(next),
        )?;
        let patch = PaymentOrderPatch {
            status: Some(next),
            provider_reference,
        };
        self.update_if_status(&order.id, order.status, &patch).await
    }
}
