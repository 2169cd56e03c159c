use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::ledger;

// Status pembayaran order, selalu diturunkan dari paid_amount vs total_amount
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Unpaid => "unpaid",
            OrderPaymentStatus::Partial => "partial",
            OrderPaymentStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kolom finansial order yang dibaca dan diubah oleh reconciliation core.
/// Order sendiri dibuat oleh order-management, bukan oleh service ini.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema, PartialEq)]
pub struct OrderLedger {
    pub id: i32,
    pub order_number: String,
    pub customer_id: Option<i32>,
    #[schema(value_type = String, example = "100.00")]
    pub total_amount: BigDecimal,
    #[schema(value_type = String, example = "50.00")]
    pub paid_amount: BigDecimal,
    pub payment_status: OrderPaymentStatus,
}

impl OrderLedger {
    /// Sisa tagihan: total_amount - paid_amount
    pub fn outstanding_balance(&self) -> BigDecimal {
        ledger::outstanding_balance(&self.total_amount, &self.paid_amount)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.payment_status == OrderPaymentStatus::Paid
    }
}
