//! Reconciliation core: setiap operasi adalah satu transaksi. Order dan
//! payment yang disentuh di-lock dulu, lalu ledger, receipt dan audit ditulis
//! bersama. Error di langkah mana pun = rollback total.

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::audit::{AuditEntry, PAYMENTS_TABLE, PAYMENT_RECEIPTS_TABLE, PAYMENT_REFUNDS_TABLE};
use crate::domain::ledger;
use crate::domain::order::OrderLedger;
use crate::domain::payment::{
    ActivePaymentMethod, NewPayment, Payment, PaymentChanges, PaymentIdentifiers,
    RecordPaymentRequest, UpdatePaymentRequest,
};
use crate::domain::receipt::{NewReceipt, Receipt};
use crate::domain::refund::{NewRefund, Refund, RefundRequest};
use crate::error::{AppError, AppResult};
use crate::repositories::{LedgerStore, LedgerTx};

#[derive(Debug)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub receipt: Option<Receipt>,
}

#[derive(Debug)]
pub struct RecordedRefund {
    pub refund: Refund,
    pub payment: Payment,
}

#[derive(Debug)]
pub struct GeneratedReceipt {
    pub receipt: Receipt,
    /// false kalau receipt sudah ada sebelumnya
    pub created: bool,
}

#[derive(Clone)]
pub struct ReconciliationService<S: LedgerStore> {
    store: S,
    receipt_prefix: String,
}

impl<S: LedgerStore> ReconciliationService<S> {
    pub fn new(store: S, receipt_prefix: impl Into<String>) -> Self {
        Self {
            store,
            receipt_prefix: receipt_prefix.into(),
        }
    }

    /// Catat payment baru terhadap order dan update ledger-nya
    pub async fn record_payment(
        &self,
        actor_id: i32,
        request: &RecordPaymentRequest,
    ) -> AppResult<RecordedPayment> {
        let intake = request.validate()?;

        let mut tx = self.store.begin().await?;

        let order = find_order(&mut tx, intake.order_id).await?;
        let change = ledger::apply_payment(&order, &intake.amount)?;
        let method = resolve_method(&mut tx, &intake.payment_method).await?;

        let ids = PaymentIdentifiers::generate(&self.receipt_prefix, Utc::now());
        let payment = tx
            .insert_payment(&NewPayment {
                order_id: order.id,
                amount: intake.amount.clone(),
                payment_method: method,
                reference_number: intake.reference_number.clone(),
                notes: intake.notes.clone(),
                transaction_id: ids.transaction_id,
                receipt_number: ids.receipt_number,
                processed_by: actor_id,
            })
            .await?;

        tx.update_order_ledger(order.id, &change).await?;

        let receipt = if intake.generate_receipt {
            Some(store_receipt(&mut tx, &payment, &order, actor_id).await?)
        } else {
            None
        };

        tx.write_audit(&AuditEntry::created(actor_id, PAYMENTS_TABLE, payment.id, &payment)?)
            .await?;
        tx.commit().await?;

        info!(
            "Payment {} recorded for order {}: amount {}, paid {} ({})",
            payment.id,
            order.order_number,
            ledger::format_money(&payment.amount),
            ledger::format_money(&change.paid_amount),
            change.payment_status
        );

        Ok(RecordedPayment { payment, receipt })
    }

    /// Amend payment, selisih amount diterapkan ke paid_amount order
    pub async fn update_payment(
        &self,
        actor_id: i32,
        payment_id: i32,
        request: &UpdatePaymentRequest,
    ) -> AppResult<Payment> {
        let amendment = request.validate()?;

        let mut tx = self.store.begin().await?;

        let payment = find_payment(&mut tx, payment_id).await?;
        let order = find_order(&mut tx, payment.order_id).await?;

        let ledger_change = match &amendment.amount {
            Some(new_amount) => {
                ledger::ensure_amount_covers_refunds(&payment, new_amount)?;
                ledger::apply_amendment(&order, &payment.amount, new_amount)?
            }
            None => None,
        };

        // Method lama yang sudah dinonaktifkan tetap boleh dipertahankan
        let payment_method = match amendment.payment_method.as_deref() {
            Some(code) if code != payment.payment_method => Some(resolve_method(&mut tx, code).await?),
            _ => None,
        };

        let changes = PaymentChanges {
            amount: amendment.amount.clone(),
            payment_method,
            reference_number: amendment.reference_number.clone(),
            notes: amendment.notes.clone(),
            status: amendment.status,
        };

        let updated = tx.update_payment(payment.id, &changes).await?;

        if let Some(change) = &ledger_change {
            tx.update_order_ledger(order.id, change).await?;
        }

        tx.write_audit(&AuditEntry::updated(
            actor_id,
            PAYMENTS_TABLE,
            payment.id,
            &payment,
            &updated,
        )?)
        .await?;
        tx.commit().await?;

        match &ledger_change {
            Some(change) => info!(
                "Payment {} updated, order {} paid {} ({})",
                updated.id,
                order.order_number,
                ledger::format_money(&change.paid_amount),
                change.payment_status
            ),
            None => info!("Payment {} updated, order ledger unchanged", updated.id),
        }

        Ok(updated)
    }

    /// Soft delete payment dan balik efeknya ke ledger order
    pub async fn void_payment(&self, actor_id: i32, payment_id: i32) -> AppResult<Payment> {
        let mut tx = self.store.begin().await?;

        let payment = find_payment(&mut tx, payment_id).await?;
        let order = find_order(&mut tx, payment.order_id).await?;

        let change = ledger::reverse_payment(&order, &payment.amount)?;
        tx.update_order_ledger(order.id, &change).await?;

        let deleted = tx.soft_delete_payment(payment.id, actor_id).await?;

        tx.write_audit(&AuditEntry::deleted(actor_id, PAYMENTS_TABLE, payment.id, &payment)?)
            .await?;
        tx.commit().await?;

        info!(
            "Payment {} voided by user {}, order {} paid {} ({})",
            deleted.id,
            actor_id,
            order.order_number,
            ledger::format_money(&change.paid_amount),
            change.payment_status
        );

        Ok(deleted)
    }

    /// Refund dicatat di payment saja, paid_amount order tidak berubah
    pub async fn refund_payment(
        &self,
        actor_id: i32,
        payment_id: i32,
        request: &RefundRequest,
    ) -> AppResult<RecordedRefund> {
        let input = request.validate()?;

        let mut tx = self.store.begin().await?;

        let payment = find_payment(&mut tx, payment_id).await?;
        ledger::ensure_refundable(&payment, &input.refund_amount)?;

        let refund = tx
            .insert_refund(&NewRefund {
                payment_id: payment.id,
                refund_amount: input.refund_amount.clone(),
                refund_reason: input.refund_reason.clone(),
                refund_method: input.refund_method.clone(),
                processed_by: actor_id,
            })
            .await?;

        let payment = tx.add_refunded_amount(payment.id, &input.refund_amount).await?;

        tx.write_audit(&AuditEntry::created(
            actor_id,
            PAYMENT_REFUNDS_TABLE,
            refund.id,
            &refund,
        )?)
        .await?;
        tx.commit().await?;

        info!(
            "Refund {} of {} recorded for payment {} (total refunded {})",
            refund.id,
            ledger::format_money(&refund.refund_amount),
            payment.id,
            ledger::format_money(&payment.refund_amount)
        );

        Ok(RecordedRefund { refund, payment })
    }

    /// Receipt on demand; kalau sudah ada, dikembalikan apa adanya tanpa write
    pub async fn generate_receipt(&self, actor_id: i32, payment_id: i32) -> AppResult<GeneratedReceipt> {
        let mut tx = self.store.begin().await?;

        let payment = find_payment(&mut tx, payment_id).await?;

        if let Some(receipt) = tx.find_receipt(payment.id).await? {
            return Ok(GeneratedReceipt {
                receipt,
                created: false,
            });
        }

        let order = find_order(&mut tx, payment.order_id).await?;
        let receipt = store_receipt(&mut tx, &payment, &order, actor_id).await?;

        tx.write_audit(&AuditEntry::created(
            actor_id,
            PAYMENT_RECEIPTS_TABLE,
            receipt.id,
            &receipt,
        )?)
        .await?;
        tx.commit().await?;

        info!("Receipt {} generated for payment {}", receipt.receipt_number, payment.id);

        Ok(GeneratedReceipt {
            receipt,
            created: true,
        })
    }
}

async fn find_order<T: LedgerTx>(tx: &mut T, order_id: i32) -> AppResult<OrderLedger> {
    tx.find_order_for_update(order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))
}

async fn find_payment<T: LedgerTx>(tx: &mut T, payment_id: i32) -> AppResult<Payment> {
    tx.find_payment_for_update(payment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))
}

async fn resolve_method<T: LedgerTx>(tx: &mut T, code: &str) -> AppResult<ActivePaymentMethod> {
    let entry = tx.find_payment_method(code).await?;
    ActivePaymentMethod::from_registry(code, entry)
}

// Nama customer best-effort, gagal lookup = nama kosong
async fn lookup_customer_name<T: LedgerTx>(tx: &mut T, order: &OrderLedger) -> Option<String> {
    let customer_id = order.customer_id?;
    match tx.find_customer_name(customer_id).await {
        Ok(name) => name,
        Err(e) => {
            warn!("Customer lookup failed for order {}: {}", order.order_number, e);
            None
        }
    }
}

async fn store_receipt<T: LedgerTx>(
    tx: &mut T,
    payment: &Payment,
    order: &OrderLedger,
    actor_id: i32,
) -> AppResult<Receipt> {
    let customer_name = lookup_customer_name(tx, order).await;
    tx.insert_receipt(&NewReceipt::for_payment(payment, order, customer_name, actor_id))
        .await
}
