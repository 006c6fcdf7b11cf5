//! Browser-facing pairing endpoints

use actix_web::{http::header, web, HttpRequest, HttpResponse};

use super::{linker_error_response, outcome_response};
use crate::models::{CallSubmission, ClientPollRequest, ClientUnlinkRequest, CodeRequest};
use crate::AppState;

/// POST /api/linker/code: issue (or reissue) a pairing code
async fn request_code(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CodeRequest>,
) -> HttpResponse {
    let mut request = body.into_inner();
    if request.user_agent.is_none() {
        request.user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
    }

    match state.linker.request_code(request) {
        Ok(grant) => HttpResponse::Ok().json(grant),
        Err(e) => linker_error_response("Code request", &e),
    }
}

/// POST /api/linker/messages: linkage status plus queued messages
async fn poll_messages(
    state: web::Data<AppState>,
    body: web::Json<ClientPollRequest>,
) -> HttpResponse {
    match state.linker.poll_client_messages(
        body.client_token.as_deref(),
        body.session_token.as_deref(),
        body.last_message_id,
    ) {
        Ok(poll) => HttpResponse::Ok().json(poll),
        Err(e) => linker_error_response("Client poll", &e),
    }
}

/// POST /api/linker/call: queue a call for the linked wallet
async fn submit_call(
    state: web::Data<AppState>,
    body: web::Json<CallSubmission>,
) -> HttpResponse {
    match state.linker.submit_call(body.into_inner()).await {
        Ok(queued) => HttpResponse::Ok().json(serde_json::json!({ "ok": queued })),
        Err(e) => linker_error_response("Call submission", &e),
    }
}

/// POST /api/linker/unlink
async fn unlink(
    state: web::Data<AppState>,
    body: web::Json<ClientUnlinkRequest>,
) -> HttpResponse {
    match state.linker.unlink(&body.client_token) {
        Ok(ok) => HttpResponse::Ok().json(serde_json::json!({ "ok": ok })),
        Err(e) => linker_error_response("Unlink", &e),
    }
}

/// GET /api/linker/code/{code}: preview a pairing request before linking
async fn query_code(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();
    match state.linker.query_code(&code) {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => linker_error_response("Code lookup", &e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/linker")
            .route("/code", web::post().to(request_code))
            .route("/code/{code}", web::get().to(query_code))
            .route("/messages", web::post().to(poll_messages))
            .route("/call", web::post().to(submit_call))
            .route("/unlink", web::post().to(unlink)),
    );
}
