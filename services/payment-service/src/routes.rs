// API routes untuk payment reconciliation service

use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::Request,
    http::{header::HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppState;
use crate::handlers::payment_handler;
use crate::middleware::{auth::jwt_auth_middleware, rate_limit::rate_limit_middleware};

#[derive(OpenApi)]
#[openapi(
    paths(
        payment_handler::record_payment,
        payment_handler::list_payments,
        payment_handler::get_payment,
        payment_handler::update_payment,
        payment_handler::void_payment,
        payment_handler::refund_payment,
        payment_handler::generate_receipt,
        payment_handler::get_order_payments,
        payment_handler::get_active_methods,
        payment_handler::get_dashboard_stats,
        payment_handler::health_check,
        payment_handler::get_service_info,
    ),
    components(
        schemas(
            crate::domain::payment::RecordPaymentRequest,
            crate::domain::payment::UpdatePaymentRequest,
            crate::domain::payment::Payment,
            crate::domain::payment::PaymentStatus,
            crate::domain::payment::PaymentMethod,
            crate::domain::refund::RefundRequest,
            crate::domain::refund::Refund,
            crate::domain::refund::RefundStatus,
            crate::domain::receipt::Receipt,
            crate::domain::receipt::ReceiptData,
            crate::domain::order::OrderLedger,
            crate::domain::order::OrderPaymentStatus,
            crate::domain::report::PaymentListItem,
            crate::domain::report::PaymentPage,
            crate::domain::report::PaymentDetail,
            crate::domain::report::OrderPayments,
            crate::domain::report::MethodTotal,
            crate::domain::report::StatusCount,
            crate::domain::report::DashboardStats
        )
    ),
    tags(
        (name = "Payment Reconciliation", description = "Payment recording, amendment, void, refund and receipts for laundry orders")
    ),
    info(
        title = "Payment Reconciliation API",
        description = "Payment-to-order reconciliation for the laundry back-office.\n\nEvery mutation updates the order ledger, receipts and audit trail in a single database transaction. Money values are decimal strings.",
        version = "1.0.0"
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub struct ApiDoc;

// Security scheme modifier untuk Bearer JWT authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

// Security headers middleware
async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; frame-ancestors 'none';",
        ),
    );
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

fn cors_layer(frontend_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(false)
        .max_age(Duration::from_secs(86400));

    // Tanpa FRONTEND_URL tidak ada origin lain yang diizinkan
    match frontend_url {
        Some(url) => {
            let origin = url
                .parse::<HeaderValue>()
                .with_context(|| format!("FRONTEND_URL harus valid origin: {}", url))?;
            Ok(cors.allow_origin(origin))
        }
        None => Ok(cors),
    }
}

pub fn create_routes(state: AppState) -> anyhow::Result<Router> {
    if state.config.is_production() {
        tracing::warn!("Payment Service running in PRODUCTION mode");
    } else {
        tracing::info!("Payment Service running in {} mode", state.config.environment);
    }

    let cors = cors_layer(state.config.frontend_url.as_deref())?;

    let mut openapi = ApiDoc::openapi();
    SecurityAddon.modify(&mut openapi);

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(payment_handler::health_check))
        .route("/info", get(payment_handler::get_service_info))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi))
        .with_state(state.clone());

    // Layer terakhir jalan duluan: JWT dulu, baru rate limit per user
    let protected_routes = build_api_routes(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Ok(public_routes
        .nest("/api", protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(cors),
        )
        .layer(axum::middleware::from_fn(security_headers_middleware)))
}

fn build_api_routes(state: AppState) -> Router {
    Router::new()
        // ===== Payment Operations =====
        .route(
            "/payments",
            post(payment_handler::record_payment).get(payment_handler::list_payments),
        )
        .route(
            "/payments/{payment_id}",
            get(payment_handler::get_payment)
                .put(payment_handler::update_payment)
                .delete(payment_handler::void_payment),
        )
        .route("/payments/{payment_id}/refund", post(payment_handler::refund_payment))
        .route("/payments/{payment_id}/receipt", post(payment_handler::generate_receipt))

        // ===== Read Projections =====
        .route("/payments/order/{order_id}", get(payment_handler::get_order_payments))
        .route("/payments/methods/active", get(payment_handler::get_active_methods))
        .route("/payments/stats/dashboard", get(payment_handler::get_dashboard_stats))
        .with_state(state)
}
