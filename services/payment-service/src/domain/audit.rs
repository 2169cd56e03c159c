use serde::Serialize;
use serde_json::Value;

use crate::error::AppResult;

pub const PAYMENTS_TABLE: &str = "payments";
pub const PAYMENT_REFUNDS_TABLE: &str = "payment_refunds";
pub const PAYMENT_RECEIPTS_TABLE: &str = "payment_receipts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// Entry audit trail, ditulis di transaksi yang sama dengan mutasinya
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: i32,
    pub action: AuditAction,
    pub table_name: &'static str,
    pub record_id: i32,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
}

impl AuditEntry {
    pub fn created<T: Serialize>(
        actor_id: i32,
        table_name: &'static str,
        record_id: i32,
        record: &T,
    ) -> AppResult<Self> {
        Ok(Self {
            actor_id,
            action: AuditAction::Create,
            table_name,
            record_id,
            old_values: None,
            new_values: Some(serde_json::to_value(record)?),
        })
    }

    pub fn updated<T: Serialize>(
        actor_id: i32,
        table_name: &'static str,
        record_id: i32,
        before: &T,
        after: &T,
    ) -> AppResult<Self> {
        Ok(Self {
            actor_id,
            action: AuditAction::Update,
            table_name,
            record_id,
            old_values: Some(serde_json::to_value(before)?),
            new_values: Some(serde_json::to_value(after)?),
        })
    }

    pub fn deleted<T: Serialize>(
        actor_id: i32,
        table_name: &'static str,
        record_id: i32,
        before: &T,
    ) -> AppResult<Self> {
        Ok(Self {
            actor_id,
            action: AuditAction::Delete,
            table_name,
            record_id,
            old_values: Some(serde_json::to_value(before)?),
            new_values: None,
        })
    }
}
