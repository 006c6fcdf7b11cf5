//! Wallet-facing pairing endpoints

use actix_web::{web, HttpResponse};

use super::{linker_error_response, outcome_response};
use crate::models::{
    CallResult, EndpointRegistration, LinkRequest, WalletLinksRequest, WalletPollRequest,
    WalletUnlinkRequest,
};
use crate::AppState;

/// POST /api/wallet/link: redeem a pairing code
async fn link(state: web::Data<AppState>, body: web::Json<LinkRequest>) -> HttpResponse {
    match state.linker.complete_link(
        &body.wallet_token,
        &body.code,
        &body.current_rpc,
        &body.current_accounts,
    ) {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => linker_error_response("Link", &e),
    }
}

/// POST /api/wallet/messages: calls waiting for this wallet
async fn poll_messages(
    state: web::Data<AppState>,
    body: web::Json<WalletPollRequest>,
) -> HttpResponse {
    match state
        .linker
        .poll_wallet_messages(&body.wallet_token, &body.accounts, body.last_message_id)
    {
        Ok(messages) => HttpResponse::Ok().json(serde_json::json!({ "messages": messages })),
        Err(e) => linker_error_response("Wallet poll", &e),
    }
}

/// POST /api/wallet/result: hand a call result back to the browser
async fn deliver_result(
    state: web::Data<AppState>,
    body: web::Json<CallResult>,
) -> HttpResponse {
    match state.linker.deliver_result(body.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "ok": true })),
        Err(e) => linker_error_response("Result delivery", &e),
    }
}

/// POST /api/wallet/unlink
async fn unlink(
    state: web::Data<AppState>,
    body: web::Json<WalletUnlinkRequest>,
) -> HttpResponse {
    match state.linker.unlink_by_wallet(&body.wallet_token, &body.link_id) {
        Ok(found) => HttpResponse::Ok().json(serde_json::json!({ "ok": found })),
        Err(e) => linker_error_response("Wallet unlink", &e),
    }
}

/// POST /api/wallet/links
async fn list_links(
    state: web::Data<AppState>,
    body: web::Json<WalletLinksRequest>,
) -> HttpResponse {
    match state.linker.list_links(&body.wallet_token) {
        Ok(links) => HttpResponse::Ok().json(serde_json::json!({ "links": links })),
        Err(e) => linker_error_response("List links", &e),
    }
}

/// POST /api/wallet/notification-endpoint
async fn register_notification_endpoint(
    state: web::Data<AppState>,
    body: web::Json<EndpointRegistration>,
) -> HttpResponse {
    match state.linker.register_notification_endpoint(body.into_inner()) {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => linker_error_response("Endpoint registration", &e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/wallet")
            .route("/link", web::post().to(link))
            .route("/messages", web::post().to(poll_messages))
            .route("/result", web::post().to(deliver_result))
            .route("/unlink", web::post().to(unlink))
            .route("/links", web::post().to(list_links))
            .route(
                "/notification-endpoint",
                web::post().to(register_notification_endpoint),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::clock::SystemClock;
    use crate::config::Config;
    use crate::db::Database;
    use crate::dissector::BasicDissector;
    use crate::linker::{LinkerService, Outcome};
    use crate::models::CodeRequest;
    use crate::notifications::LogNotificationDispatcher;

    fn app_state() -> AppState {
        let config = Config {
            port: 0,
            database_url: ":memory:".to_string(),
            db_pool_size: 1,
            code_length: 9,
            code_ttl_minutes: 60,
            code_max_attempts: 10,
            notify_url: None,
        };
        let db = Arc::new(Database::new(&config.database_url).unwrap());
        let linker = Arc::new(LinkerService::new(
            db.clone(),
            Arc::new(SystemClock),
            config.linker(),
            Arc::new(BasicDissector),
            Arc::new(LogNotificationDispatcher),
        ));
        AppState { db, config, linker }
    }

    #[actix_web::test]
    async fn test_links_take_wallet_token_from_body() {
        let state = app_state();
        let grant = state.linker.request_code(CodeRequest::default()).unwrap();
        let linked = state
            .linker
            .complete_link(
                "wallet-1",
                &grant.code,
                &json!({"chainId": 1}),
                &["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_string()],
            )
            .unwrap();
        assert!(matches!(linked, Outcome::Ready(_)));

        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/wallet/links")
            .set_json(json!({"wallet_token": "wallet-1"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["links"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/api/wallet/wallet-1/links").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
