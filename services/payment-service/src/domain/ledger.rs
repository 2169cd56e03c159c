//! Aturan ledger order: parsing nominal, outstanding balance, derivasi status
//! dan validasi setiap perubahan paid_amount. Semua fungsi di sini pure,
//! transaksi dan locking diurus oleh reconciliation service.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use shared::utils::validation;

use crate::domain::order::{OrderLedger, OrderPaymentStatus};
use crate::domain::payment::{AmountInput, Payment};
use crate::error::{AppError, AppResult};

// Presisi kolom NUMERIC(12,2)
pub const MONEY_SCALE: i64 = 2;
pub const MAX_AMOUNT: &str = "9999999999.99";

pub fn normalize_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

pub fn format_money(value: &BigDecimal) -> String {
    normalize_money(value).to_string()
}

fn zero() -> BigDecimal {
    normalize_money(&BigDecimal::from(0))
}

/// Parse nominal dari request. Wajib ada, dibulatkan half-up ke 2 desimal,
/// dan harus > 0 setelah pembulatan.
pub fn parse_amount(input: Option<&AmountInput>, field: &str) -> AppResult<BigDecimal> {
    let raw = match input {
        Some(AmountInput::Text(text)) => text.trim().to_string(),
        Some(AmountInput::Number(number)) => number.to_string(),
        None => return Err(AppError::validation(format!("{} is required", field))),
    };

    if raw.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }

    // Eksponen dan digit berlebih ditolak sebelum di-parse
    if !validation::is_plain_decimal_amount(&raw) {
        return Err(AppError::validation(format!(
            "{} must be a plain decimal number with at most 10 integer digits",
            field
        )));
    }

    let parsed = BigDecimal::from_str(&raw)
        .map_err(|_| AppError::validation(format!("{} must be a valid decimal number", field)))?;
    let amount = normalize_money(&parsed);

    if amount <= zero() {
        return Err(AppError::validation(format!("{} must be greater than 0", field)));
    }

    let max = BigDecimal::from_str(MAX_AMOUNT)
        .map_err(|e| AppError::internal(format!("invalid max amount constant: {}", e)))?;
    if amount > max {
        return Err(AppError::validation(format!("{} cannot exceed {}", field, MAX_AMOUNT)));
    }

    Ok(amount)
}

pub fn outstanding_balance(total: &BigDecimal, paid: &BigDecimal) -> BigDecimal {
    normalize_money(&(total - paid))
}

/// paid dicek duluan, jadi order dengan total 0 langsung dianggap lunas
pub fn derive_payment_status(paid: &BigDecimal, total: &BigDecimal) -> OrderPaymentStatus {
    if paid >= total {
        OrderPaymentStatus::Paid
    } else if *paid > zero() {
        OrderPaymentStatus::Partial
    } else {
        OrderPaymentStatus::Unpaid
    }
}

/// Nilai baru kolom finansial order setelah sebuah operasi
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerChange {
    pub paid_amount: BigDecimal,
    pub payment_status: OrderPaymentStatus,
}

impl LedgerChange {
    fn for_order(order: &OrderLedger, paid_amount: BigDecimal) -> Self {
        let paid_amount = normalize_money(&paid_amount);
        let payment_status = derive_payment_status(&paid_amount, &order.total_amount);
        Self {
            paid_amount,
            payment_status,
        }
    }
}

pub fn ensure_within_outstanding(order: &OrderLedger, amount: &BigDecimal) -> AppResult<()> {
    let outstanding = order.outstanding_balance();
    if *amount > outstanding {
        return Err(AppError::validation(format!(
            "Payment amount {} exceeds outstanding balance {}",
            format_money(amount),
            format_money(&outstanding)
        )));
    }
    Ok(())
}

pub fn apply_payment(order: &OrderLedger, amount: &BigDecimal) -> AppResult<LedgerChange> {
    ensure_within_outstanding(order, amount)?;
    Ok(LedgerChange::for_order(order, &order.paid_amount + amount))
}

/// None kalau amount tidak berubah, order tidak perlu ditulis ulang
pub fn apply_amendment(
    order: &OrderLedger,
    old_amount: &BigDecimal,
    new_amount: &BigDecimal,
) -> AppResult<Option<LedgerChange>> {
    let delta = normalize_money(&(new_amount - old_amount));
    if delta == zero() {
        return Ok(None);
    }

    let new_paid = &order.paid_amount + &delta;
    if new_paid > order.total_amount {
        return Err(AppError::validation(format!(
            "Updated amount would exceed order total {}. Maximum additional amount allowed: {}",
            format_money(&order.total_amount),
            format_money(&order.outstanding_balance())
        )));
    }
    if new_paid < zero() {
        return Err(AppError::integrity(format!(
            "Order {} paid amount would become negative ({})",
            order.order_number,
            format_money(&new_paid)
        )));
    }

    Ok(Some(LedgerChange::for_order(order, new_paid)))
}

/// Membalik efek payment yang di-void. Hasil negatif berarti ledger sudah rusak.
pub fn reverse_payment(order: &OrderLedger, amount: &BigDecimal) -> AppResult<LedgerChange> {
    let new_paid = &order.paid_amount - amount;
    if new_paid < zero() {
        return Err(AppError::integrity(format!(
            "Voiding {} would make paid amount of order {} negative (paid {})",
            format_money(amount),
            order.order_number,
            format_money(&order.paid_amount)
        )));
    }
    Ok(LedgerChange::for_order(order, new_paid))
}

pub fn ensure_refundable(payment: &Payment, refund_amount: &BigDecimal) -> AppResult<()> {
    let refundable = normalize_money(&payment.refundable_amount());
    if *refund_amount > refundable {
        return Err(AppError::refund(format!(
            "Refund amount {} exceeds refundable amount {} (payment {}, already refunded {})",
            format_money(refund_amount),
            format_money(&refundable),
            format_money(&payment.amount),
            format_money(&payment.refund_amount)
        )));
    }
    Ok(())
}

pub fn ensure_amount_covers_refunds(payment: &Payment, new_amount: &BigDecimal) -> AppResult<()> {
    if *new_amount < payment.refund_amount {
        return Err(AppError::validation(format!(
            "Amount {} cannot be lower than already refunded amount {}",
            format_money(new_amount),
            format_money(&payment.refund_amount)
        )));
    }
    Ok(())
}

/// 0 <= paid_amount <= total_amount dan status sesuai derivasi
pub fn is_consistent(order: &OrderLedger) -> bool {
    order.paid_amount >= zero()
        && order.paid_amount <= order.total_amount
        && order.payment_status == derive_payment_status(&order.paid_amount, &order.total_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentStatus;
    use chrono::Utc;

    fn money(value: &str) -> BigDecimal {
        normalize_money(&BigDecimal::from_str(value).unwrap())
    }

    fn order(total: &str, paid: &str) -> OrderLedger {
        let total = money(total);
        let paid = money(paid);
        OrderLedger {
            id: 1,
            order_number: "ORD-001".to_string(),
            customer_id: None,
            payment_status: derive_payment_status(&paid, &total),
            total_amount: total,
            paid_amount: paid,
        }
    }

    fn payment(amount: &str, refunded: &str) -> Payment {
        Payment {
            id: 7,
            order_id: 1,
            amount: money(amount),
            payment_method: "cash".to_string(),
            reference_number: None,
            notes: None,
            status: PaymentStatus::Completed,
            refund_amount: money(refunded),
            transaction_id: "TXN-1".to_string(),
            receipt_number: "RCP-1".to_string(),
            processed_by: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            deleted_by: None,
        }
    }

    fn text(value: &str) -> AmountInput {
        AmountInput::Text(value.to_string())
    }

    #[test]
    fn test_parse_amount_rounds_half_up() {
        assert_eq!(parse_amount(Some(&text("10.005")), "amount").unwrap(), money("10.01"));
        assert_eq!(parse_amount(Some(&text("10.004")), "amount").unwrap(), money("10.00"));
        assert_eq!(parse_amount(Some(&text(" 7 ")), "amount").unwrap().to_string(), "7.00");
    }

    #[test]
    fn test_parse_amount_rejects_zero_after_rounding() {
        let err = parse_amount(Some(&text("0.004")), "amount").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("greater than 0")));
    }

    #[test]
    fn test_parse_amount_rejects_garbage_and_missing() {
        assert!(parse_amount(Some(&text("abc")), "amount").is_err());
        assert!(parse_amount(Some(&text("")), "amount").is_err());
        assert!(parse_amount(None, "refund_amount").is_err());
        assert!(parse_amount(Some(&text("10000000000.00")), "amount").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_exponent_notation_quickly() {
        let started = std::time::Instant::now();
        for raw in ["1e10", "1e100000000", "1e-100000000", "-1E5", "5e0"] {
            let err = parse_amount(Some(&text(raw)), "amount").unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)), "{} accepted", raw);
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_parse_amount_rejects_exponent_from_json_number() {
        let number: serde_json::Number = serde_json::from_str("1e300").unwrap();
        assert!(parse_amount(Some(&AmountInput::Number(number)), "amount").is_err());

        let number: serde_json::Number = serde_json::from_str("250").unwrap();
        assert_eq!(parse_amount(Some(&AmountInput::Number(number)), "amount").unwrap(), money("250"));
    }

    #[test]
    fn test_derive_payment_status() {
        assert_eq!(derive_payment_status(&money("0"), &money("100")), OrderPaymentStatus::Unpaid);
        assert_eq!(derive_payment_status(&money("0.01"), &money("100")), OrderPaymentStatus::Partial);
        assert_eq!(derive_payment_status(&money("100"), &money("100")), OrderPaymentStatus::Paid);
        // total 0: paid menang
        assert_eq!(derive_payment_status(&money("0"), &money("0")), OrderPaymentStatus::Paid);
    }

    #[test]
    fn test_apply_payment_exact_outstanding_is_paid() {
        let change = apply_payment(&order("100.00", "40.00"), &money("60.00")).unwrap();
        assert_eq!(change.paid_amount, money("100.00"));
        assert_eq!(change.payment_status, OrderPaymentStatus::Paid);
    }

    #[test]
    fn test_apply_payment_one_cent_over_rejected() {
        let err = apply_payment(&order("100.00", "40.00"), &money("60.01")).unwrap_err();
        match err {
            AppError::ValidationError(msg) => {
                assert_eq!(msg, "Payment amount 60.01 exceeds outstanding balance 60.00");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_apply_amendment_zero_delta_is_noop() {
        let result = apply_amendment(&order("100", "50"), &money("50"), &money("50.00")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_apply_amendment_states_max_additional() {
        let err = apply_amendment(&order("200", "150"), &money("50"), &money("120")).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("Maximum additional amount allowed: 50.00")));

        let change = apply_amendment(&order("200", "150"), &money("50"), &money("100"))
            .unwrap()
            .unwrap();
        assert_eq!(change.paid_amount, money("200"));
        assert_eq!(change.payment_status, OrderPaymentStatus::Paid);

        let change = apply_amendment(&order("200", "150"), &money("50"), &money("10"))
            .unwrap()
            .unwrap();
        assert_eq!(change.paid_amount, money("110"));
        assert_eq!(change.payment_status, OrderPaymentStatus::Partial);
    }

    #[test]
    fn test_reverse_payment() {
        let change = reverse_payment(&order("150", "100"), &money("40")).unwrap();
        assert_eq!(change.paid_amount, money("60"));
        assert_eq!(change.payment_status, OrderPaymentStatus::Partial);

        let change = reverse_payment(&order("150", "40"), &money("40")).unwrap();
        assert_eq!(change.payment_status, OrderPaymentStatus::Unpaid);

        let err = reverse_payment(&order("150", "30"), &money("40")).unwrap_err();
        assert!(matches!(err, AppError::IntegrityError(_)));
    }

    #[test]
    fn test_refund_bound_uses_remaining_amount() {
        assert!(ensure_refundable(&payment("80", "0"), &money("80")).is_ok());
        assert!(ensure_refundable(&payment("80", "30"), &money("50")).is_ok());

        let err = ensure_refundable(&payment("80", "30"), &money("50.01")).unwrap_err();
        assert!(matches!(err, AppError::RefundError(msg) if msg.contains("50.01") && msg.contains("50.00")));
    }

    #[test]
    fn test_amount_cannot_drop_below_refunds() {
        assert!(ensure_amount_covers_refunds(&payment("80", "30"), &money("30")).is_ok());
        assert!(ensure_amount_covers_refunds(&payment("80", "30"), &money("29.99")).is_err());
    }

    #[test]
    fn test_is_consistent() {
        assert!(is_consistent(&order("100", "40")));
        let mut broken = order("100", "40");
        broken.payment_status = OrderPaymentStatus::Paid;
        assert!(!is_consistent(&broken));
        let mut over = order("100", "40");
        over.paid_amount = money("100.01");
        assert!(!is_consistent(&over));
    }
}
