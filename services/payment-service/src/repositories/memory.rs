//! Store in-memory untuk test reconciliation core. `begin` mengambil snapshot
//! state, `commit` mempublikasikan snapshot itu, drop tanpa commit membuangnya.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::types::Json;

use crate::domain::audit::AuditEntry;
use crate::domain::ledger::{self, LedgerChange};
use crate::domain::order::OrderLedger;
use crate::domain::payment::{NewPayment, Payment, PaymentChanges, PaymentMethod, PaymentStatus};
use crate::domain::receipt::{NewReceipt, Receipt};
use crate::domain::refund::{NewRefund, Refund, RefundStatus};
use crate::error::{AppError, AppResult};
use crate::repositories::{LedgerStore, LedgerTx};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub orders: HashMap<i32, OrderLedger>,
    pub deleted_orders: HashSet<i32>,
    pub customers: HashMap<i32, String>,
    pub methods: HashMap<String, PaymentMethod>,
    pub payments: BTreeMap<i32, Payment>,
    pub refunds: Vec<Refund>,
    pub receipts: Vec<Receipt>,
    pub audit: Vec<AuditEntry>,
    next_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_audit: AtomicBool,
    fail_customer_lookup: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    /// Store dengan registry cash, mobile_money (aktif) dan cheque (nonaktif)
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (code, active, order) in [("cash", true, 1), ("mobile_money", true, 2), ("cheque", false, 3)] {
                state.methods.insert(
                    code.to_string(),
                    PaymentMethod {
                        code: code.to_string(),
                        name: code.replace('_', " "),
                        is_active: active,
                        sort_order: order,
                    },
                );
            }
        }
        store
    }

    pub fn add_order(&self, id: i32, total: &str, paid: &str, customer_id: Option<i32>) {
        let total_amount = ledger::normalize_money(&total.parse::<BigDecimal>().unwrap());
        let paid_amount = ledger::normalize_money(&paid.parse::<BigDecimal>().unwrap());
        let order = OrderLedger {
            id,
            order_number: format!("ORD-{:04}", id),
            customer_id,
            payment_status: ledger::derive_payment_status(&paid_amount, &total_amount),
            total_amount,
            paid_amount,
        };
        self.state.lock().unwrap().orders.insert(id, order);
    }

    pub fn add_customer(&self, id: i32, name: &str) {
        self.state.lock().unwrap().customers.insert(id, name.to_string());
    }

    pub fn delete_order(&self, id: i32) {
        self.state.lock().unwrap().deleted_orders.insert(id);
    }

    /// Paksa paid_amount untuk mensimulasikan ledger yang rusak
    pub fn corrupt_paid_amount(&self, id: i32, paid: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(&id) {
            order.paid_amount = ledger::normalize_money(&paid.parse::<BigDecimal>().unwrap());
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }

    pub fn order(&self, id: i32) -> OrderLedger {
        self.snapshot().orders.get(&id).cloned().unwrap()
    }

    pub fn payment(&self, id: i32) -> Payment {
        self.snapshot().payments.get(&id).cloned().unwrap()
    }

    pub fn set_fail_audit(&self, fail: bool) {
        self.faults.fail_audit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_customer_lookup(&self, fail: bool) {
        self.faults.fail_customer_lookup.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let working = self.state.lock().unwrap().clone();
        Ok(MemoryTx {
            working,
            shared: Arc::clone(&self.state),
            faults: Arc::clone(&self.faults),
        })
    }
}

pub struct MemoryTx {
    working: MemoryState,
    shared: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl MemoryTx {
    fn active_payment_mut(&mut self, payment_id: i32) -> AppResult<&mut Payment> {
        self.working
            .payments
            .get_mut(&payment_id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn find_order_for_update(&mut self, order_id: i32) -> AppResult<Option<OrderLedger>> {
        if self.working.deleted_orders.contains(&order_id) {
            return Ok(None);
        }
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn update_order_ledger(&mut self, order_id: i32, change: &LedgerChange) -> AppResult<()> {
        let order = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;
        order.paid_amount = change.paid_amount.clone();
        order.payment_status = change.payment_status;
        Ok(())
    }

    async fn find_payment_method(&mut self, code: &str) -> AppResult<Option<PaymentMethod>> {
        Ok(self.working.methods.get(code).cloned())
    }

    async fn find_payment_for_update(&mut self, payment_id: i32) -> AppResult<Option<Payment>> {
        Ok(self
            .working
            .payments
            .get(&payment_id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        let id = self.working.next_id();
        let now = Utc::now();
        let created = Payment {
            id,
            order_id: payment.order_id,
            amount: payment.amount.clone(),
            payment_method: payment.payment_method.as_str().to_string(),
            reference_number: payment.reference_number.clone(),
            notes: payment.notes.clone(),
            status: PaymentStatus::Completed,
            refund_amount: ledger::normalize_money(&BigDecimal::from(0)),
            transaction_id: payment.transaction_id.clone(),
            receipt_number: payment.receipt_number.clone(),
            processed_by: payment.processed_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        };
        self.working.payments.insert(id, created.clone());
        Ok(created)
    }

    async fn update_payment(&mut self, payment_id: i32, changes: &PaymentChanges) -> AppResult<Payment> {
        let payment = self.active_payment_mut(payment_id)?;
        if let Some(amount) = &changes.amount {
            payment.amount = amount.clone();
        }
        if let Some(method) = &changes.payment_method {
            payment.payment_method = method.as_str().to_string();
        }
        if let Some(reference) = &changes.reference_number {
            payment.reference_number = reference.clone();
        }
        if let Some(notes) = &changes.notes {
            payment.notes = notes.clone();
        }
        if let Some(status) = changes.status {
            payment.status = status;
        }
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn soft_delete_payment(&mut self, payment_id: i32, deleted_by: i32) -> AppResult<Payment> {
        let payment = self.active_payment_mut(payment_id)?;
        let now = Utc::now();
        payment.deleted_at = Some(now);
        payment.deleted_by = Some(deleted_by);
        payment.updated_at = now;
        Ok(payment.clone())
    }

    async fn add_refunded_amount(&mut self, payment_id: i32, amount: &BigDecimal) -> AppResult<Payment> {
        let payment = self.active_payment_mut(payment_id)?;
        payment.refund_amount = ledger::normalize_money(&(&payment.refund_amount + amount));
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn insert_refund(&mut self, refund: &NewRefund) -> AppResult<Refund> {
        let created = Refund {
            id: self.working.next_id(),
            payment_id: refund.payment_id,
            refund_amount: refund.refund_amount.clone(),
            refund_reason: refund.refund_reason.clone(),
            refund_method: refund.refund_method.clone(),
            processed_by: refund.processed_by,
            status: RefundStatus::Completed,
            created_at: Utc::now(),
        };
        self.working.refunds.push(created.clone());
        Ok(created)
    }

    async fn find_receipt(&mut self, payment_id: i32) -> AppResult<Option<Receipt>> {
        Ok(self
            .working
            .receipts
            .iter()
            .find(|r| r.payment_id == payment_id)
            .cloned())
    }

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> AppResult<Receipt> {
        // Meniru unique index payment_receipts.payment_id
        if self.working.receipts.iter().any(|r| r.payment_id == receipt.payment_id) {
            return Err(AppError::internal("duplicate receipt for payment"));
        }
        let created = Receipt {
            id: self.working.next_id(),
            payment_id: receipt.payment_id,
            receipt_number: receipt.receipt_number.clone(),
            receipt_data: Json(receipt.receipt_data.clone()),
            generated_by: receipt.generated_by,
            created_at: Utc::now(),
        };
        self.working.receipts.push(created.clone());
        Ok(created)
    }

    async fn find_customer_name(&mut self, customer_id: i32) -> AppResult<Option<String>> {
        if self.faults.fail_customer_lookup.load(Ordering::SeqCst) {
            return Err(AppError::internal("customers lookup failed"));
        }
        Ok(self.working.customers.get(&customer_id).cloned())
    }

    async fn write_audit(&mut self, entry: &AuditEntry) -> AppResult<()> {
        if self.faults.fail_audit.load(Ordering::SeqCst) {
            return Err(AppError::internal("audit write failed"));
        }
        self.working.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        *self.shared.lock().unwrap() = self.working;
        Ok(())
    }
}
