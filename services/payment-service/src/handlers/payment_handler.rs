use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::{AppConfig, AppState};
use crate::domain::ledger;
use crate::domain::payment::{RecordPaymentRequest, UpdatePaymentRequest};
use crate::domain::refund::RefundRequest;
use crate::domain::report::PaymentListQuery;
use crate::error::AppError;
use crate::handlers::extract::AppJson;
use crate::middleware::auth::AuthUser;

/// Record a payment against an order
#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payment Reconciliation",
    summary = "Record payment",
    description = "Record a payment against an order, update the order ledger and optionally generate a receipt in one transaction",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = serde_json::Value),
        (status = 400, description = "Validation error or amount exceeds outstanding balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn record_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(request): AppJson<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require_staff()?;

    let recorded = state.reconciliation.record_payment(auth.user_id, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Payment recorded successfully",
            "payment_id": recorded.payment.id,
            "receipt_number": recorded.payment.receipt_number,
            "transaction_id": recorded.payment.transaction_id,
            "receipt": recorded.receipt,
        })),
    ))
}

/// List payments
#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payment Reconciliation",
    summary = "List payments",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Paginated payments", body = serde_json::Value),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_payments(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let page = state.payment_repository.list_payments(&query).await?;

    Ok(Json(json!({
        "success": true,
        "data": page,
    })))
}

/// Get payment by id, voided payments included
#[utoipa::path(
    get,
    path = "/api/payments/{payment_id}",
    tag = "Payment Reconciliation",
    summary = "Get payment details",
    params(
        ("payment_id" = i32, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment with refunds and receipt", body = serde_json::Value),
        (status = 404, description = "Payment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let detail = state
        .payment_repository
        .find_payment_detail(payment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment_id)))?;

    Ok(Json(json!({
        "success": true,
        "data": detail,
    })))
}

/// Amend a payment
#[utoipa::path(
    put,
    path = "/api/payments/{payment_id}",
    tag = "Payment Reconciliation",
    summary = "Update payment",
    description = "Amend amount, method, reference, notes or status. Amount changes are applied to the order ledger as a delta",
    params(
        ("payment_id" = i32, Path, description = "Payment ID")
    ),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment updated", body = serde_json::Value),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Payment or order not found"),
        (status = 409, description = "Ledger conflict")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
    AppJson(request): AppJson<UpdatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    auth.require_supervisor()?;

    let payment = state
        .reconciliation
        .update_payment(auth.user_id, payment_id, &request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment updated successfully",
        "payment": payment,
    })))
}

/// Void (soft delete) a payment
#[utoipa::path(
    delete,
    path = "/api/payments/{payment_id}",
    tag = "Payment Reconciliation",
    summary = "Void payment",
    description = "Reverse the payment on the order ledger and mark it deleted. History is kept",
    params(
        ("payment_id" = i32, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment voided", body = serde_json::Value),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Payment or order not found"),
        (status = 409, description = "Paid amount would become negative")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn void_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    auth.require_supervisor()?;

    let payment = state.reconciliation.void_payment(auth.user_id, payment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Payment {} voided, {} reversed from order ledger",
            payment.id,
            ledger::format_money(&payment.amount)
        ),
    })))
}

/// Refund part or all of a payment
#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/refund",
    tag = "Payment Reconciliation",
    summary = "Refund payment",
    params(
        ("payment_id" = i32, Path, description = "Payment ID")
    ),
    request_body = RefundRequest,
    responses(
        (status = 201, description = "Refund recorded", body = serde_json::Value),
        (status = 400, description = "Validation error or refund exceeds refundable amount"),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Payment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn refund_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
    AppJson(request): AppJson<RefundRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require_supervisor()?;

    let recorded = state
        .reconciliation
        .refund_payment(auth.user_id, payment_id, &request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Refund processed successfully",
            "refund_id": recorded.refund.id,
            "refund": recorded.refund,
            "payment_refund_amount": ledger::format_money(&recorded.payment.refund_amount),
        })),
    ))
}

/// Generate receipt on demand, idempotent
#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/receipt",
    tag = "Payment Reconciliation",
    summary = "Generate receipt",
    params(
        ("payment_id" = i32, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Existing or newly generated receipt", body = serde_json::Value),
        (status = 404, description = "Payment not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn generate_receipt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let generated = state
        .reconciliation
        .generate_receipt(auth.user_id, payment_id)
        .await?;

    let message = if generated.created {
        "Receipt generated successfully"
    } else {
        "Receipt already exists"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "receipt": generated.receipt,
    })))
}

/// Order ledger summary with its payments
#[utoipa::path(
    get,
    path = "/api/payments/order/{order_id}",
    tag = "Payment Reconciliation",
    summary = "Get payments for order",
    params(
        ("order_id" = i32, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order ledger and payments", body = serde_json::Value),
        (status = 404, description = "Order not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_order_payments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let summary = state
        .payment_repository
        .find_order_payments(order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

    Ok(Json(json!({
        "success": true,
        "data": summary,
    })))
}

/// Active payment methods
#[utoipa::path(
    get,
    path = "/api/payments/methods/active",
    tag = "Payment Reconciliation",
    summary = "List active payment methods",
    responses(
        (status = 200, description = "Active methods ordered by sort order", body = serde_json::Value)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_active_methods(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let methods = state.payment_repository.find_active_methods().await?;

    Ok(Json(json!({
        "success": true,
        "data": methods,
    })))
}

/// Dashboard payment statistics
#[utoipa::path(
    get,
    path = "/api/payments/stats/dashboard",
    tag = "Payment Reconciliation",
    summary = "Dashboard statistics",
    responses(
        (status = 200, description = "Collected totals, per-method totals, order status counts, outstanding and refunded totals", body = serde_json::Value)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_dashboard_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    auth.require_staff()?;

    let stats = state.payment_repository.dashboard_stats().await?;

    Ok(Json(json!({
        "success": true,
        "data": stats,
        "generated_at": Utc::now(),
    })))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Payment Reconciliation",
    summary = "Health check",
    responses(
        (status = 200, description = "Service health", body = serde_json::Value)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let health = state.health_check().await;

    Ok(Json(json!({
        "status": health.overall,
        "checks": health,
        "service": "payment-service",
        "timestamp": Utc::now(),
        "version": state.config.app_version,
    })))
}

/// Get service information
#[utoipa::path(
    get,
    path = "/info",
    tag = "Payment Reconciliation",
    summary = "Get service information",
    responses(
        (status = 200, description = "Service information", body = serde_json::Value)
    )
)]
pub async fn get_service_info(State(config): State<AppConfig>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "service": "payment-service",
        "description": "Payment reconciliation for laundry back-office",
        "version": config.app_version,
        "environment": config.environment,
        "receipt_prefix": config.receipt_prefix,
        "rate_limiting": config.redis_url.is_some(),
        "features": [
            "payment_recording",
            "payment_amendment",
            "payment_void",
            "refunds",
            "receipts",
            "audit_trail"
        ],
    })))
}
