//! Translation of library errors into transport responses
//!
//! Every error becomes a status code and an `{error, message}` body. Production
//! messages are fixed strings per category; development appends the internal
//! error text. Isolation violations are written to the audit log here, once per
//! translated error.
//!
//! A [`Error::CacheComputeFailure`] takes the status of its innermost cause: a
//! store or cache failure inside the computation is a 500, a not-found or
//! isolation error keeps its 404 or 403.

use serde::{Deserialize, Serialize};

use crate::audit::record_violation;
use crate::config::Environment;
use crate::error::Error;

/// JSON error body returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Status code and body for one failed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedError {
    pub status: u16,
    pub body: ErrorBody,
}

impl TranslatedError {
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }
}

/// Maps [`Error`] values to client-safe responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator {
    environment: Environment,
}

impl ErrorTranslator {
    #[must_use]
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Translate an error, auditing it when it is an isolation violation
    #[must_use]
    pub fn translate(&self, err: &Error) -> TranslatedError {
        if let Some(violation) = err.as_violation() {
            record_violation(violation);
        }

        let (status, code, message) = classify(err.root());

        if status >= 500 {
            tracing::error!(error = %err, status, "request failed");
        } else {
            tracing::debug!(error = %err, status, "request rejected");
        }

        let message = if self.environment.is_development() && status >= 500 {
            format!("{message}: {err}")
        } else {
            message.to_string()
        };

        TranslatedError {
            status,
            body: ErrorBody {
                error: code.to_string(),
                message,
            },
        }
    }
}

fn classify(err: &Error) -> (u16, &'static str, &'static str) {
    match err {
        Error::NoTenantAssigned => (400, "tenant_required", "tenant required"),
        Error::InvalidTenantId(_) => (400, "invalid_tenant", "invalid tenant identifier"),
        Error::InvalidPrincipal(_) => (400, "invalid_principal", "invalid principal"),
        Error::TenantIsolationViolation(_) => (403, "forbidden", "access denied"),
        Error::ResourceNotFound => (404, "not_found", "resource not found"),
        Error::CacheComputeFailure(_)
        | Error::Store(_)
        | Error::Cache(_)
        | Error::Config(_)
        | Error::Transport(_) => (500, "internal_error", "internal server error"),
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for TranslatedError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status)
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.body)).into_response()
    }
}
