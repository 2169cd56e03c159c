use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::types::Json;
use sqlx::{Connection, PgPool, Postgres, Transaction};

use crate::domain::audit::AuditEntry;
use crate::domain::ledger::LedgerChange;
use crate::domain::order::OrderLedger;
use crate::domain::payment::{NewPayment, Payment, PaymentChanges, PaymentMethod, PaymentStatus};
use crate::domain::receipt::{NewReceipt, Receipt};
use crate::domain::refund::{NewRefund, Refund};
use crate::domain::report::{
    DashboardStats, MethodTotal, OrderPayments, PaymentDetail, PaymentListItem, PaymentListQuery,
    PaymentPage, StatusCount,
};
use crate::error::{AppError, AppResult};
use crate::repositories::{LedgerStore, LedgerTx};

const SERVICE_NAME: &str = "payment-service";

const PAYMENT_COLUMNS: &str = r#"
    id, order_id, amount, payment_method, reference_number, notes, status,
    refund_amount, transaction_id, receipt_number, processed_by,
    created_at, updated_at, deleted_at, deleted_by
"#;

const ORDER_COLUMNS: &str =
    "id, order_number, customer_id, total_amount, paid_amount, payment_status";

const REFUND_COLUMNS: &str = r#"
    id, payment_id, refund_amount, refund_reason, refund_method,
    processed_by, status, created_at
"#;

const RECEIPT_COLUMNS: &str =
    "id, payment_id, receipt_number, receipt_data, generated_by, created_at";

// Store Postgres untuk reconciliation core
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> AppResult<PgLedgerTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }
}

/// Wrapper transaksi; kalau di-drop sebelum commit, sqlx otomatis rollback
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_order_for_update(&mut self, order_id: i32) -> AppResult<Option<OrderLedger>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, OrderLedger>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(order)
    }

    async fn update_order_ledger(&mut self, order_id: i32, change: &LedgerChange) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET paid_amount = $1, payment_status = $2, updated_at = NOW()
            WHERE id = $3 AND deleted_at IS NULL
            "#,
        )
        .bind(&change.paid_amount)
        .bind(change.payment_status)
        .bind(order_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Order {} not found", order_id)));
        }

        Ok(())
    }

    async fn find_payment_method(&mut self, code: &str) -> AppResult<Option<PaymentMethod>> {
        let method = sqlx::query_as::<_, PaymentMethod>(
            "SELECT code, name, is_active, sort_order FROM payment_methods WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(method)
    }

    async fn find_payment_for_update(&mut self, payment_id: i32) -> AppResult<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(payment)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        let sql = format!(
            r#"
            INSERT INTO payments (
                order_id, amount, payment_method, reference_number, notes,
                status, refund_amount, transaction_id, receipt_number, processed_by,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, NOW(), NOW())
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        let created = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.order_id)
            .bind(&payment.amount)
            .bind(payment.payment_method.as_str())
            .bind(payment.reference_number.as_deref())
            .bind(payment.notes.as_deref())
            .bind(PaymentStatus::Completed)
            .bind(&payment.transaction_id)
            .bind(&payment.receipt_number)
            .bind(payment.processed_by)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn update_payment(&mut self, payment_id: i32, changes: &PaymentChanges) -> AppResult<Payment> {
        // Option<Option<_>>: flag true berarti kolom ditulis (termasuk NULL)
        let sql = format!(
            r#"
            UPDATE payments SET
                amount = COALESCE($2, amount),
                payment_method = COALESCE($3, payment_method),
                reference_number = CASE WHEN $4 THEN $5 ELSE reference_number END,
                notes = CASE WHEN $6 THEN $7 ELSE notes END,
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .bind(changes.amount.as_ref())
            .bind(changes.payment_method.as_ref().map(|m| m.as_str()))
            .bind(changes.reference_number.is_some())
            .bind(changes.reference_number.clone().flatten())
            .bind(changes.notes.is_some())
            .bind(changes.notes.clone().flatten())
            .bind(changes.status)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))?;

        Ok(updated)
    }

    async fn soft_delete_payment(&mut self, payment_id: i32, deleted_by: i32) -> AppResult<Payment> {
        let sql = format!(
            r#"
            UPDATE payments
            SET deleted_at = NOW(), deleted_by = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        let deleted = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .bind(deleted_by)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))?;

        Ok(deleted)
    }

    async fn add_refunded_amount(&mut self, payment_id: i32, amount: &BigDecimal) -> AppResult<Payment> {
        let sql = format!(
            r#"
            UPDATE payments
            SET refund_amount = refund_amount + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .bind(amount)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))?;

        Ok(updated)
    }

    async fn insert_refund(&mut self, refund: &NewRefund) -> AppResult<Refund> {
        let sql = format!(
            r#"
            INSERT INTO payment_refunds (
                payment_id, refund_amount, refund_reason, refund_method,
                processed_by, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, 'completed', NOW())
            RETURNING {}
            "#,
            REFUND_COLUMNS
        );

        let created = sqlx::query_as::<_, Refund>(&sql)
            .bind(refund.payment_id)
            .bind(&refund.refund_amount)
            .bind(&refund.refund_reason)
            .bind(&refund.refund_method)
            .bind(refund.processed_by)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn find_receipt(&mut self, payment_id: i32) -> AppResult<Option<Receipt>> {
        let sql = format!(
            "SELECT {} FROM payment_receipts WHERE payment_id = $1",
            RECEIPT_COLUMNS
        );
        let receipt = sqlx::query_as::<_, Receipt>(&sql)
            .bind(payment_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(receipt)
    }

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> AppResult<Receipt> {
        let sql = format!(
            r#"
            INSERT INTO payment_receipts (payment_id, receipt_number, receipt_data, generated_by, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {}
            "#,
            RECEIPT_COLUMNS
        );

        let created = sqlx::query_as::<_, Receipt>(&sql)
            .bind(receipt.payment_id)
            .bind(&receipt.receipt_number)
            .bind(Json(receipt.receipt_data.clone()))
            .bind(receipt.generated_by)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn find_customer_name(&mut self, customer_id: i32) -> AppResult<Option<String>> {
        // Jalan di savepoint supaya query yang gagal tidak membatalkan transaksi utama
        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        let name = sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&mut *savepoint)
            .await?;

        savepoint.commit().await?;
        Ok(name)
    }

    async fn write_audit(&mut self, entry: &AuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                user_id, action, entity_type, entity_id,
                old_values, new_values, request_id, service_name, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.table_name)
        .bind(entry.record_id)
        .bind(entry.old_values.as_ref())
        .bind(entry.new_values.as_ref())
        .bind(uuid::Uuid::new_v4())
        .bind(SERVICE_NAME)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

// Repository untuk read projection payment (tanpa transaksi)
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // List payment aktif dengan filter dan pagination
    pub async fn list_payments(&self, query: &PaymentListQuery) -> AppResult<PaymentPage> {
        let (page, limit, offset) = query.pagination();
        let method = query.payment_method.as_deref().map(str::to_ascii_lowercase);

        let payments = sqlx::query_as::<_, PaymentListItem>(
            r#"
            SELECT
                p.id, p.order_id, o.order_number, p.amount, p.payment_method,
                p.reference_number, p.status, p.refund_amount, p.transaction_id,
                p.receipt_number, p.processed_by, p.created_at
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE p.deleted_at IS NULL
              AND ($1::varchar IS NULL OR p.status = $1)
              AND ($2::varchar IS NULL OR p.payment_method = $2)
              AND ($3::int IS NULL OR p.order_id = $3)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(query.status)
        .bind(method.as_deref())
        .bind(query.order_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM payments p
            WHERE p.deleted_at IS NULL
              AND ($1::varchar IS NULL OR p.status = $1)
              AND ($2::varchar IS NULL OR p.payment_method = $2)
              AND ($3::int IS NULL OR p.order_id = $3)
            "#,
        )
        .bind(query.status)
        .bind(method.as_deref())
        .bind(query.order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaymentPage {
            payments,
            total,
            page,
            limit,
        })
    }

    // Detail payment by id, termasuk yang sudah di-void
    pub async fn find_payment_detail(&self, payment_id: i32) -> AppResult<Option<PaymentDetail>> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        let Some(payment) = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let order_number = sqlx::query_scalar::<_, String>(
            "SELECT order_number FROM orders WHERE id = $1",
        )
        .bind(payment.order_id)
        .fetch_optional(&self.pool)
        .await?;

        let refunds_sql = format!(
            "SELECT {} FROM payment_refunds WHERE payment_id = $1 ORDER BY created_at, id",
            REFUND_COLUMNS
        );
        let refunds = sqlx::query_as::<_, Refund>(&refunds_sql)
            .bind(payment_id)
            .fetch_all(&self.pool)
            .await?;

        let receipt_sql = format!(
            "SELECT {} FROM payment_receipts WHERE payment_id = $1",
            RECEIPT_COLUMNS
        );
        let receipt = sqlx::query_as::<_, Receipt>(&receipt_sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(Some(PaymentDetail {
            payment,
            order_number,
            refunds,
            receipt,
        }))
    }

    // Ringkasan ledger order beserta payment yang belum di-void
    pub async fn find_order_payments(&self, order_id: i32) -> AppResult<Option<OrderPayments>> {
        let order_sql = format!(
            "SELECT {} FROM orders WHERE id = $1 AND deleted_at IS NULL",
            ORDER_COLUMNS
        );
        let Some(order) = sqlx::query_as::<_, OrderLedger>(&order_sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let payments_sql = format!(
            "SELECT {} FROM payments WHERE order_id = $1 AND deleted_at IS NULL ORDER BY created_at, id",
            PAYMENT_COLUMNS
        );
        let payments = sqlx::query_as::<_, Payment>(&payments_sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(OrderPayments::new(order, payments)))
    }

    pub async fn find_active_methods(&self) -> AppResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            r#"
            SELECT code, name, is_active, sort_order
            FROM payment_methods
            WHERE is_active = TRUE
            ORDER BY sort_order, code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }

    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let (today_collected, today_payment_count) = sqlx::query_as::<_, (BigDecimal, i64)>(
            r#"
            SELECT COALESCE(SUM(amount), 0), COUNT(*)
            FROM payments
            WHERE deleted_at IS NULL
              AND status = 'completed'
              AND created_at >= date_trunc('day', NOW())
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let by_method = sqlx::query_as::<_, MethodTotal>(
            r#"
            SELECT payment_method, COUNT(*) AS payment_count, COALESCE(SUM(amount), 0) AS total_amount
            FROM payments
            WHERE deleted_at IS NULL AND status = 'completed'
            GROUP BY payment_method
            ORDER BY total_amount DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT payment_status, COUNT(*) AS order_count
            FROM orders
            WHERE deleted_at IS NULL
            GROUP BY payment_status
            ORDER BY payment_status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let total_outstanding = sqlx::query_scalar::<_, BigDecimal>(
            "SELECT COALESCE(SUM(total_amount - paid_amount), 0) FROM orders WHERE deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_refunded = sqlx::query_scalar::<_, BigDecimal>(
            "SELECT COALESCE(SUM(refund_amount), 0) FROM payment_refunds",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            today_collected,
            today_payment_count,
            by_method,
            orders_by_status,
            total_outstanding,
            total_refunded,
        })
    }

    // Cek token yang sudah di-logout
    pub async fn is_token_revoked(&self, jti: &str) -> AppResult<bool> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;

        Ok(revoked)
    }
}
