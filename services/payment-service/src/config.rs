// Payment Reconciliation Service Configuration
use sqlx::{postgres::PgConnectOptions, postgres::PgPoolOptions, PgPool};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::reconciliation::ReconciliationService;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::repositories::payment_repo::{PaymentRepository, PgStore};

// Konfigurasi aplikasi dari environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub frontend_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub redis_url: Option<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window_seconds: u64,
    pub receipt_prefix: String,
    pub app_version: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} tidak valid: '{}'", key, raw)),
        _ => Ok(default),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    // Load konfigurasi dari environment dengan validasi
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL harus diset")?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET harus diset")?;

        if !cfg!(debug_assertions) && jwt_secret.contains("change-this") {
            return Err("JWT_SECRET masih default! Ganti untuk production".to_string());
        }

        let receipt_prefix = env::var("RECEIPT_PREFIX").unwrap_or_else(|_| "RCP".to_string());
        if !receipt_prefix.chars().all(|c| c.is_ascii_alphanumeric()) || receipt_prefix.is_empty() {
            return Err(format!("RECEIPT_PREFIX tidak valid: '{}'", receipt_prefix));
        }

        Ok(AppConfig {
            database_url,
            server_host: env::var("PAYMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env_or("PAYMENT_SERVICE_PORT", 3005)?,
            environment: env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
            jwt_secret,
            frontend_url: env_optional("FRONTEND_URL"),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: env_or("RUN_MIGRATIONS", false)?,
            redis_url: env_optional("REDIS_URL"),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", 120)?,
            rate_limit_window_seconds: env_or("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            receipt_prefix,
            app_version: env::var("APP_VERSION").unwrap_or_else(|_| "1.0.0".to_string()),
        })
    }

    // Helper cek production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

// Inisialisasi database connection pool
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing payment database connection...");

    let options = PgConnectOptions::from_str(database_url)?.statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    tracing::info!("Payment database pool initialized");
    Ok(pool)
}

// Health check database connection
pub async fn check_db_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").fetch_optional(pool).await.is_ok()
}

// Application state yang di-share ke semua handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: AppConfig,
    pub payment_repository: PaymentRepository,
    pub reconciliation: ReconciliationService<PgStore>,
    pub rate_limiter: Option<RateLimiter>,
}

impl axum::extract::FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let db = init_db_pool(&config.database_url, config.db_max_connections)
            .await
            .map_err(|e| format!("Failed to init database: {}", e))?;

        let payment_repository = PaymentRepository::new(db.clone());
        let reconciliation =
            ReconciliationService::new(PgStore::new(db.clone()), config.receipt_prefix.clone());

        // Redis opsional, tanpa REDIS_URL rate limiting dimatikan
        let rate_limiter = match &config.redis_url {
            Some(url) => {
                let limiter = RateLimiter::new(
                    url,
                    RateLimitConfig {
                        max_requests: config.rate_limit_requests,
                        window_seconds: config.rate_limit_window_seconds,
                    },
                )
                .map_err(|e| format!("Failed to initialize Redis rate limiter: {}", e))?;
                tracing::info!(
                    "Redis rate limiter enabled: {} requests / {}s",
                    config.rate_limit_requests,
                    config.rate_limit_window_seconds
                );
                Some(limiter)
            }
            None => {
                tracing::warn!("REDIS_URL tidak diset, rate limiting dimatikan");
                None
            }
        };

        Ok(AppState {
            db,
            config,
            payment_repository,
            reconciliation,
            rate_limiter,
        })
    }

    pub async fn from_env() -> Result<Self, String> {
        let config = AppConfig::from_env()?;
        Self::new(config).await
    }

    // Health check semua dependencies
    pub async fn health_check(&self) -> HealthStatus {
        let db_healthy = check_db_health(&self.db).await;

        HealthStatus {
            database: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
            rate_limiter: if self.rate_limiter.is_some() { "enabled" } else { "disabled" }.to_string(),
            overall: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        }
    }
}

// Response untuk health check endpoint
#[derive(Debug, serde::Serialize)]
pub struct HealthStatus {
    pub database: String,
    pub rate_limiter: String,
    pub overall: String,
}
