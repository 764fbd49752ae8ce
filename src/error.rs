use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required secret or endpoint is not configured.
    #[error("service configuration error: {0}")]
    Configuration(&'static str),
    /// Bad or missing input from the caller.
    #[error("{0}")]
    Validation(&'static str),
    /// A downstream API rejected the request with its own error.
    #[error("{provider} error: {message}")]
    Provider {
        provider: &'static str,
        code: Option<i64>,
        status: Option<u16>,
        message: String,
    },
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0} timed out")]
    TimedOut(&'static str),
    #[error("{0} cancelled")]
    Cancelled(&'static str),
    #[error("{0}")]
    Unknown(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Provider { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            // nginx's "client closed request"
            AppError::Cancelled(_) => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to an API caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Configuration(_) => {
                "Service configuration error. Please contact support.".to_string()
            }
            AppError::Unknown(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            AppError::Provider { code, .. } => *code,
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.public_message(),
        });
        if let Some(code) = self.code() {
            body["code"] = json!(code);
        }
        (self.status_code(), Json(body)).into_response()
    }
}

/// Log an error at the severity its class deserves.
pub fn handle_error(e: &AppError) {
    match e {
        AppError::Validation(_) | AppError::NotFound(_) | AppError::Cancelled(_) => {
            warn!("{e}")
        }
        _ => error!("ERROR: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_is_preserved() {
        let e = AppError::Provider {
            provider: "Twilio",
            code: Some(21211),
            status: Some(400),
            message: "Invalid 'To' Phone Number".to_string(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.code(), Some(21211));
        assert_eq!(e.to_string(), "Twilio error: Invalid 'To' Phone Number");
    }

    #[test]
    fn provider_without_status_is_bad_gateway() {
        let e = AppError::Provider {
            provider: "OpenAI",
            code: None,
            status: Some(200),
            message: "odd".to_string(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internals_are_not_leaked() {
        let e = AppError::Unknown("connection reset by 10.0.0.3".to_string());
        assert_eq!(e.public_message(), "Internal server error");
        let e = AppError::Configuration("TWILIO_AUTH_TOKEN not set");
        assert!(!e.public_message().contains("TWILIO"));
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
