pub mod payment_repo;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::domain::audit::AuditEntry;
use crate::domain::ledger::LedgerChange;
use crate::domain::order::OrderLedger;
use crate::domain::payment::{NewPayment, Payment, PaymentChanges, PaymentMethod};
use crate::domain::receipt::{NewReceipt, Receipt};
use crate::domain::refund::{NewRefund, Refund};
use crate::error::AppResult;

/// Sumber transaksi untuk reconciliation core
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// Satu transaksi database. Drop tanpa `commit` = rollback.
#[async_trait]
pub trait LedgerTx: Send {
    /// Lock row order (FOR UPDATE), order yang sudah dihapus dianggap tidak ada
    async fn find_order_for_update(&mut self, order_id: i32) -> AppResult<Option<OrderLedger>>;

    async fn update_order_ledger(&mut self, order_id: i32, change: &LedgerChange) -> AppResult<()>;

    async fn find_payment_method(&mut self, code: &str) -> AppResult<Option<PaymentMethod>>;

    /// Lock row payment yang belum di-void
    async fn find_payment_for_update(&mut self, payment_id: i32) -> AppResult<Option<Payment>>;

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment>;

    async fn update_payment(&mut self, payment_id: i32, changes: &PaymentChanges) -> AppResult<Payment>;

    async fn soft_delete_payment(&mut self, payment_id: i32, deleted_by: i32) -> AppResult<Payment>;

    async fn add_refunded_amount(&mut self, payment_id: i32, amount: &BigDecimal) -> AppResult<Payment>;

    async fn insert_refund(&mut self, refund: &NewRefund) -> AppResult<Refund>;

    async fn find_receipt(&mut self, payment_id: i32) -> AppResult<Option<Receipt>>;

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> AppResult<Receipt>;

    /// Best-effort, kegagalan tidak boleh merusak transaksi utama
    async fn find_customer_name(&mut self, customer_id: i32) -> AppResult<Option<String>>;

    async fn write_audit(&mut self, entry: &AuditEntry) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;
}
