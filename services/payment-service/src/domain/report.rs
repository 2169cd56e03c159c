use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::domain::order::{OrderLedger, OrderPaymentStatus};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::receipt::Receipt;
use crate::domain::refund::Refund;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_PAGE: i64 = 1_000_000;

// Query param untuk list payment
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    pub page: Option<i64>,
    /// Maksimal 100
    pub limit: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
    pub order_id: Option<i32>,
}

impl PaymentListQuery {
    /// (page, limit, offset) yang sudah di-clamp
    pub fn pagination(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PaymentListItem {
    pub id: i32,
    pub order_id: i32,
    pub order_number: String,
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub status: PaymentStatus,
    #[schema(value_type = String)]
    pub refund_amount: BigDecimal,
    pub transaction_id: String,
    pub receipt_number: String,
    pub processed_by: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentPage {
    pub payments: Vec<PaymentListItem>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// Detail payment termasuk yang sudah di-void
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDetail {
    pub payment: Payment,
    pub order_number: Option<String>,
    pub refunds: Vec<Refund>,
    pub receipt: Option<Receipt>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPayments {
    pub order: OrderLedger,
    #[schema(value_type = String)]
    pub outstanding_balance: BigDecimal,
    pub is_fully_paid: bool,
    pub payments: Vec<Payment>,
}

impl OrderPayments {
    pub fn new(order: OrderLedger, payments: Vec<Payment>) -> Self {
        Self {
            outstanding_balance: order.outstanding_balance(),
            is_fully_paid: order.is_fully_paid(),
            order,
            payments,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MethodTotal {
    pub payment_method: String,
    pub payment_count: i64,
    #[schema(value_type = String)]
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StatusCount {
    pub payment_status: OrderPaymentStatus,
    pub order_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    #[schema(value_type = String)]
    pub today_collected: BigDecimal,
    pub today_payment_count: i64,
    pub by_method: Vec<MethodTotal>,
    pub orders_by_status: Vec<StatusCount>,
    #[schema(value_type = String)]
    pub total_outstanding: BigDecimal,
    #[schema(value_type = String)]
    pub total_refunded: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = PaymentListQuery::default();
        assert_eq!(query.pagination(), (1, 20, 0));
    }

    #[test]
    fn test_pagination_clamps_limit_and_page() {
        let query = PaymentListQuery {
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (3, 100, 200));

        let query = PaymentListQuery {
            page: Some(0),
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (1, 1, 0));
    }

    #[test]
    fn test_pagination_huge_page_does_not_overflow() {
        let query = PaymentListQuery {
            page: Some(i64::MAX),
            limit: Some(20),
            ..Default::default()
        };
        let (page, limit, offset) = query.pagination();
        assert_eq!((page, limit), (1_000_000, 20));
        assert_eq!(offset, 19_999_980);
        assert!(offset >= 0);

        let query = PaymentListQuery {
            page: Some(i64::MIN),
            limit: Some(i64::MAX),
            ..Default::default()
        };
        assert_eq!(query.pagination(), (1, 100, 0));
    }
}
