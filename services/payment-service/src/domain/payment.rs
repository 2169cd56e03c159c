use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::utils::validation;
use sqlx::FromRow;

use crate::domain::ledger;
use crate::error::{AppError, AppResult};

// Model data payment yang dicatat kasir terhadap satu order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema, PartialEq)]
pub struct Payment {
    pub id: i32,
    pub order_id: i32,

    #[schema(value_type = String, example = "100.00")]
    pub amount: BigDecimal,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub status: PaymentStatus,

    // Akumulasi refund, tidak pernah melebihi amount
    #[schema(value_type = String, example = "0.00")]
    pub refund_amount: BigDecimal,

    // Identifier yang digenerate saat payment dicatat
    pub transaction_id: String,
    pub receipt_number: String,

    pub processed_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Soft delete marker
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i32>,
}

impl Payment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Sisa amount yang masih bisa direfund
    pub fn refundable_amount(&self) -> BigDecimal {
        &self.amount - &self.refund_amount
    }
}

// Status payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "completed" => Ok(PaymentStatus::Completed),
            "pending" => Ok(PaymentStatus::Pending),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(AppError::validation(format!("Unknown payment status '{}'", other))),
        }
    }
}

// Entry di payment method registry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema, PartialEq)]
pub struct PaymentMethod {
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Kode payment method yang sudah dicek terhadap registry dan masih aktif.
/// Satu-satunya cara membuatnya adalah lewat `from_registry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePaymentMethod(String);

impl ActivePaymentMethod {
    pub fn from_registry(requested: &str, entry: Option<PaymentMethod>) -> AppResult<Self> {
        match entry {
            Some(method) if method.is_active => Ok(ActivePaymentMethod(method.code)),
            Some(method) => Err(AppError::validation(format!(
                "Payment method '{}' is not active",
                method.code
            ))),
            None => Err(AppError::validation(format!(
                "Payment method '{}' is not registered",
                requested
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Nominal dari client, boleh string ("100.00") atau JSON number (100)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

// Request catat payment baru
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordPaymentRequest {
    pub order_id: Option<i32>,
    #[schema(value_type = Option<String>, example = "100.00")]
    pub amount: Option<AmountInput>,
    #[schema(example = "cash")]
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    /// Default true
    pub generate_receipt: Option<bool>,
}

/// Hasil validasi RecordPaymentRequest sebelum transaksi dibuka
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntake {
    pub order_id: i32,
    pub amount: BigDecimal,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub generate_receipt: bool,
}

impl RecordPaymentRequest {
    pub fn validate(&self) -> AppResult<PaymentIntake> {
        let order_id = self
            .order_id
            .ok_or_else(|| AppError::validation("order_id is required"))?;
        if order_id <= 0 {
            return Err(AppError::validation("order_id must be a positive integer"));
        }

        let amount = ledger::parse_amount(self.amount.as_ref(), "amount")?;
        let payment_method = validate_method_code(self.payment_method.as_deref())?
            .ok_or_else(|| AppError::validation("payment_method is required"))?;

        Ok(PaymentIntake {
            order_id,
            amount,
            payment_method,
            reference_number: validate_reference(self.reference_number.as_deref())?,
            notes: validate_notes(self.notes.as_deref())?,
            generate_receipt: self.generate_receipt.unwrap_or(true),
        })
    }
}

// Request amend payment, semua field opsional
#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdatePaymentRequest {
    #[schema(value_type = Option<String>, example = "120.00")]
    pub amount: Option<AmountInput>,
    pub payment_method: Option<String>,
    /// String kosong menghapus nomor referensi
    pub reference_number: Option<String>,
    /// String kosong menghapus catatan
    pub notes: Option<String>,
    #[schema(example = "completed")]
    pub status: Option<String>,
}

/// Perubahan yang diminta; `Some(None)` berarti kolom dikosongkan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentAmendment {
    pub amount: Option<BigDecimal>,
    pub payment_method: Option<String>,
    pub reference_number: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<PaymentStatus>,
}

impl UpdatePaymentRequest {
    pub fn validate(&self) -> AppResult<PaymentAmendment> {
        let amount = match &self.amount {
            Some(input) => Some(ledger::parse_amount(Some(input), "amount")?),
            None => None,
        };

        let payment_method = match self.payment_method.as_deref() {
            Some(raw) => Some(
                validate_method_code(Some(raw))?
                    .ok_or_else(|| AppError::validation("payment_method cannot be empty"))?,
            ),
            None => None,
        };

        let reference_number = match self.reference_number.as_deref() {
            Some(raw) => Some(validate_reference(Some(raw))?),
            None => None,
        };

        let notes = match self.notes.as_deref() {
            Some(raw) => Some(validate_notes(Some(raw))?),
            None => None,
        };

        let status = self
            .status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()?;

        let amendment = PaymentAmendment {
            amount,
            payment_method,
            reference_number,
            notes,
            status,
        };

        if amendment == PaymentAmendment::default() {
            return Err(AppError::validation("No fields to update"));
        }

        Ok(amendment)
    }
}

/// Perubahan final yang ditulis ke payments, method sudah dicek ke registry
#[derive(Debug, Clone, Default)]
pub struct PaymentChanges {
    pub amount: Option<BigDecimal>,
    pub payment_method: Option<ActivePaymentMethod>,
    pub reference_number: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<PaymentStatus>,
}

// Row payment baru yang akan di-insert
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i32,
    pub amount: BigDecimal,
    pub payment_method: ActivePaymentMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub transaction_id: String,
    pub receipt_number: String,
    pub processed_by: i32,
}

/// Generate transaction id dan receipt number unik
#[derive(Debug, Clone)]
pub struct PaymentIdentifiers {
    pub transaction_id: String,
    pub receipt_number: String,
}

impl PaymentIdentifiers {
    pub fn generate(receipt_prefix: &str, now: DateTime<Utc>) -> Self {
        let stamp = now.format("%Y%m%d%H%M%S");
        let random: u32 = rand::random();
        let suffix = random % 1_000_000;

        Self {
            transaction_id: format!("TXN-{}-{:06}", stamp, suffix),
            receipt_number: format!("{}-{}-{:06}", receipt_prefix, stamp, suffix),
        }
    }
}

fn validate_method_code(raw: Option<&str>) -> AppResult<Option<String>> {
    let Some(code) = validation::normalize_optional_text(raw) else {
        return Ok(None);
    };
    let code = code.to_ascii_lowercase();
    if !validation::is_valid_method_code(&code) {
        return Err(AppError::validation(format!("Invalid payment method code '{}'", code)));
    }
    Ok(Some(code))
}

fn validate_reference(raw: Option<&str>) -> AppResult<Option<String>> {
    let reference = validation::normalize_optional_text(raw);
    if let Some(value) = &reference {
        if !validation::is_valid_reference_number(value) {
            return Err(AppError::validation("reference_number has an invalid format"));
        }
    }
    Ok(reference)
}

fn validate_notes(raw: Option<&str>) -> AppResult<Option<String>> {
    let notes = validation::normalize_optional_text(raw);
    if let Some(value) = &notes {
        if value.chars().count() > validation::MAX_NOTES_LENGTH {
            return Err(AppError::validation(format!(
                "notes cannot exceed {} characters",
                validation::MAX_NOTES_LENGTH
            )));
        }
    }
    Ok(notes.map(|value| validation::sanitize_html(&value)))
}
