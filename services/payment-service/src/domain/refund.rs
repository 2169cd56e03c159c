use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::utils::validation;
use sqlx::FromRow;

use crate::domain::ledger;
use crate::domain::payment::AmountInput;
use crate::error::{AppError, AppResult};

const MAX_REASON_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema, PartialEq)]
pub struct Refund {
    pub id: i32,
    pub payment_id: i32,
    #[schema(value_type = String, example = "30.00")]
    pub refund_amount: BigDecimal,
    pub refund_reason: String,
    pub refund_method: String,
    pub processed_by: i32,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

// Refund langsung completed, tidak ada flow approval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Completed,
}

#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RefundRequest {
    #[schema(value_type = Option<String>, example = "30.00")]
    pub refund_amount: Option<AmountInput>,
    pub refund_reason: Option<String>,
    #[schema(example = "cash")]
    pub refund_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefundInput {
    pub refund_amount: BigDecimal,
    pub refund_reason: String,
    pub refund_method: String,
}

impl RefundRequest {
    pub fn validate(&self) -> AppResult<RefundInput> {
        let refund_amount = ledger::parse_amount(self.refund_amount.as_ref(), "refund_amount")?;

        let refund_reason = validation::normalize_optional_text(self.refund_reason.as_deref())
            .ok_or_else(|| AppError::validation("refund_reason is required"))?;
        if refund_reason.chars().count() > MAX_REASON_LENGTH {
            return Err(AppError::validation(format!(
                "refund_reason cannot exceed {} characters",
                MAX_REASON_LENGTH
            )));
        }

        let refund_method = validation::normalize_optional_text(self.refund_method.as_deref())
            .map(|m| m.to_ascii_lowercase())
            .ok_or_else(|| AppError::validation("refund_method is required"))?;
        if !validation::is_valid_method_code(&refund_method) {
            return Err(AppError::validation("refund_method has an invalid format"));
        }

        Ok(RefundInput {
            refund_amount,
            refund_reason: validation::sanitize_html(&refund_reason),
            refund_method,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub payment_id: i32,
    pub refund_amount: BigDecimal,
    pub refund_reason: String,
    pub refund_method: String,
    pub processed_by: i32,
}
