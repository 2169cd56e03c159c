use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::domain::ledger;
use crate::domain::order::OrderLedger;
use crate::domain::payment::Payment;

// Receipt tersimpan, maksimal satu per payment dan tidak pernah di-update
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema, PartialEq)]
pub struct Receipt {
    pub id: i32,
    pub payment_id: i32,
    pub receipt_number: String,
    #[schema(value_type = ReceiptData)]
    pub receipt_data: Json<ReceiptData>,
    pub generated_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Snapshot fakta payment/order/customer saat receipt dibuat
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, PartialEq)]
pub struct ReceiptData {
    pub order_number: String,
    /// Kosong kalau customer tidak ditemukan
    pub customer_name: String,
    #[schema(example = "100.00")]
    pub amount: String,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
    pub processed_by: i32,
    pub generated_at: DateTime<Utc>,
}

impl ReceiptData {
    pub fn snapshot(
        payment: &Payment,
        order: &OrderLedger,
        customer_name: Option<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_number: order.order_number.clone(),
            customer_name: customer_name.unwrap_or_default(),
            amount: ledger::format_money(&payment.amount),
            payment_method: payment.payment_method.clone(),
            reference_number: payment.reference_number.clone(),
            transaction_id: payment.transaction_id.clone(),
            paid_at: payment.created_at,
            processed_by: payment.processed_by,
            generated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub payment_id: i32,
    pub receipt_number: String,
    pub receipt_data: ReceiptData,
    pub generated_by: i32,
}

impl NewReceipt {
    pub fn for_payment(
        payment: &Payment,
        order: &OrderLedger,
        customer_name: Option<String>,
        generated_by: i32,
    ) -> Self {
        Self {
            payment_id: payment.id,
            receipt_number: payment.receipt_number.clone(),
            receipt_data: ReceiptData::snapshot(payment, order, customer_name, Utc::now()),
            generated_by,
        }
    }
}
