//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::dlq::DlqRetryStatus;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    CreateTransactionRequest, RegisterDlqProcessRequest, TransactionResponse,
    UpdateTransactionStatusRequest,
};
use crate::transaction::TransitionAction;

/// Caller identification and idempotency headers
struct HeaderAddon;

impl Modify for HeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "client_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "X-Client-Id",
                    "Identifies the calling client; transactions are only visible to their owner.",
                ))),
            );
            components.add_security_scheme(
                "idempotency_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "X-Idempotency-Key",
                    r#"Required on mutating endpoints.

- Same key + same body after success: original response replayed (X-Idempotency-Replayed: true)
- Same key + different body: 422 InvalidFingerprint
- Same key while first request still running: 409 RequestBeingProcessed"#,
                ))),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledger Gate API",
        version = "1.0.0",
        description = "Idempotent, retry-aware request coordination in front of a two-phase transaction ledger.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_transaction,
        crate::gateway::handlers::get_transaction,
        crate::gateway::handlers::update_transaction_status,
        crate::gateway::handlers::register_dlq_process,
        crate::gateway::handlers::get_dlq_process,
        crate::gateway::handlers::delete_dlq_process,
    ),
    components(
        schemas(
            HealthResponse,
            CreateTransactionRequest,
            UpdateTransactionStatusRequest,
            TransitionAction,
            TransactionResponse,
            RegisterDlqProcessRequest,
            DlqRetryStatus,
        )
    ),
    modifiers(&HeaderAddon),
    tags(
        (name = "Transactions", description = "Reserved and immediate transactions (X-Client-Id required)"),
        (name = "DLQ", description = "Dead-letter retry tracking administration"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Ledger Gate API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json();
        assert!(json.is_ok());
        assert!(json.unwrap().contains("Ledger Gate API"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths.paths;
        for path in [
            "/v1/health",
            "/v1/transactions",
            "/v1/transactions/{transaction_id}",
            "/v1/transactions/{transaction_id}/status",
            "/v1/dlq/processes",
            "/v1/dlq/processes/{process_id}",
        ] {
            assert!(paths.contains_key(path), "missing path {}", path);
        }
    }

    #[test]
    fn test_header_schemes_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("client_id"));
        assert!(components.security_schemes.contains_key("idempotency_key"));
    }
}
