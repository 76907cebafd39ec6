use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use db::services::error::ServiceError;
use db::store::Store;
use inbound::{DeployMode, InboundProcessor, SignatureVerifier};
use serde_json::json;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

// Define a struct to hold our application's shared state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub inbound: InboundProcessor,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let verifier = SignatureVerifier::new(config.signing_secret.clone(), config.mode);
        Self {
            store,
            inbound: InboundProcessor::new(verifier),
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub domain: String,
    pub port: u16,
    pub database_url: String,
    pub signing_secret: Option<String>,
    pub mode: DeployMode,
    pub cleanup_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

impl AppConfig {
    /// Reads `DOMAIN`, `DATABASE_URL`, `PORT`, `WEBHOOK_SIGNING_SECRET`,
    /// `APP_ENV` and `CLEANUP_INTERVAL_SECS` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let domain = required("DOMAIN")?.trim().to_lowercase();
        let database_url = required("DATABASE_URL")?;
        let port = parsed("PORT", DEFAULT_PORT)?;
        let signing_secret = env::var("WEBHOOK_SIGNING_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let mode = env::var("APP_ENV")
            .map(|v| DeployMode::parse(&v))
            .unwrap_or_default();

        let cleanup_secs: u64 = parsed("CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS)?;
        if cleanup_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "CLEANUP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            domain,
            port,
            database_url,
            signing_secret,
            mode,
            cleanup_interval: Duration::from_secs(cleanup_secs),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

// Define a custom error type for our API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Service error")]
    Database(#[from] ServiceError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

// Implement `IntoResponse` for `ApiError` to convert it into an HTTP response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Validation(msg) | ApiError::Database(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Database(ServiceError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ApiError::Database(ServiceError::Expired) => {
                (StatusCode::GONE, "Account has expired".to_string())
            }
            ApiError::Database(ServiceError::FailedToFindUniqueName(attempts)) => {
                error!(attempts, "Could not allocate a unique email address");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to generate unique email address. Please try again.".to_string(),
                )
            }
            ApiError::Database(ServiceError::Store(e)) => {
                error!(error = %e, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected database error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "success": false, "error": error_message }));
        (status, body).into_response()
    }
}
