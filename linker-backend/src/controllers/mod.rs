pub mod health;
pub mod linker;
pub mod wallet;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::Value;

use crate::linker::{LinkerError, Outcome};

/// Map a fatal linker error to a JSON error response.
/// Integrity violations are the caller's fault; everything else is ours.
pub fn linker_error_response(action: &str, error: &LinkerError) -> HttpResponse {
    let body = serde_json::json!({
        "ok": false,
        "error": error.to_string()
    });

    if error.is_integrity_violation() {
        log::warn!("[LINKER] {} rejected: {}", action, error);
        return match error {
            LinkerError::SessionNotFound => HttpResponse::NotFound().json(body),
            _ => HttpResponse::Forbidden().json(body),
        };
    }

    log::error!("[LINKER] {} failed: {}", action, error);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "ok": false,
        "error": "Internal server error"
    }))
}

/// `{"ok": true, ...fields}` for a ready outcome, `{"ok": false}` otherwise
pub fn outcome_response<T: Serialize>(outcome: Outcome<T>) -> HttpResponse {
    let Some(value) = outcome.ready() else {
        return HttpResponse::Ok().json(serde_json::json!({ "ok": false }));
    };

    match serde_json::to_value(&value) {
        Ok(Value::Object(mut body)) => {
            body.insert("ok".to_string(), Value::Bool(true));
            HttpResponse::Ok().json(body)
        }
        Ok(other) => HttpResponse::Ok().json(serde_json::json!({ "ok": true, "result": other })),
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "ok": false,
                "error": "Internal server error"
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            linker_error_response("deliver", &LinkerError::SessionNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            linker_error_response("deliver", &LinkerError::WalletMismatch).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            linker_error_response("deliver", &LinkerError::SessionNotLinked).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            linker_error_response("code", &LinkerError::CodeSpaceExhausted { attempts: 10 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let storage = LinkerError::Storage(DbError::Sqlite(rusqlite::Error::InvalidQuery));
        assert_eq!(
            linker_error_response("poll", &storage).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_integrity_violations_are_client_errors() {
        for error in [
            LinkerError::SessionNotFound,
            LinkerError::SessionNotLinked,
            LinkerError::WalletMismatch,
        ] {
            assert!(linker_error_response("result", &error).status().is_client_error());
        }
        assert!(linker_error_response("session", &LinkerError::SessionRegeneration)
            .status()
            .is_server_error());
    }

    #[test]
    fn test_soft_failures_are_ok_responses() {
        assert_eq!(outcome_response::<Value>(Outcome::NotReady).status(), StatusCode::OK);
        assert_eq!(
            outcome_response(Outcome::Ready(serde_json::json!({"link_id": "abc"}))).status(),
            StatusCode::OK
        );
    }
}
