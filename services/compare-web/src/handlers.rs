use actix_multipart::Multipart;
use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{error::ErrorInternalServerError, web, HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::forms::{read_submission, FormError};
use crate::session::{build_preview, preview_cookie, read_preview};
use crate::state::AppState;
use crate::views::{
    FormView, ResultView, BACKEND_ERROR_ALERT, INVALID_FORM_ALERT, MISSING_TEXT_ALERT,
    UPLOAD_FAILED_ALERT, UPLOAD_TOO_LARGE_ALERT,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(new_submission))
        .route("/submissions", web::get().to(new_submission))
        .route("/submissions", web::post().to(create_submission))
        .route("/health", web::get().to(health));
}

fn render_form(state: &AppState, view: &FormView, status: StatusCode) -> actix_web::Result<HttpResponse> {
    let body = state.views.form(view).map_err(|e| {
        error!(%e, "form template failed");
        ErrorInternalServerError(e)
    })?;
    Ok(HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body))
}

/// Submission form, pre-filled from the previous comparison when the
/// session cookie carries one.
pub async fn new_submission(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let preview = read_preview(&req, &state.cookie_key);
    debug!(prefilled = preview.is_some(), "render submission form");
    render_form(&state, &FormView::from_session(preview.as_ref()), StatusCode::OK)
}

pub async fn create_submission(
    payload: Multipart,
    state: web::Data<AppState>,
) -> actix_web::Result<HttpResponse> {
    let form = match read_submission(payload, state.max_upload_bytes).await {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "submission form rejected");
            let alert = match e {
                FormError::TooLarge { .. } => UPLOAD_TOO_LARGE_ALERT,
                FormError::Multipart(_) => INVALID_FORM_ALERT,
                FormError::Io(_) => UPLOAD_FAILED_ALERT,
            };
            let view = FormView::defaults().with_alert(alert);
            return render_form(&state, &view, e.status_code());
        }
    };
    // uploads are read from disk and PDFs parsed here
    let submission = web::block(move || form.into_submission()).await?;

    if !submission.is_complete() {
        info!(
            len_a = submission.text_a.len(),
            len_b = submission.text_b.len(),
            "submission rejected: empty text"
        );
        let view = FormView::from_submission(&submission).with_alert(MISSING_TEXT_ALERT);
        return render_form(&state, &view, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let result = match state.client.compare(&submission.to_request()).await {
        Ok(r) => r,
        Err(e) => {
            error!("Plagiarism API error: {e}");
            let view = FormView::from_submission(&submission).with_alert(BACKEND_ERROR_ALERT);
            return render_form(&state, &view, StatusCode::BAD_GATEWAY);
        }
    };
    info!(
        similarity = result.similarity,
        is_plagiarism = result.is_plagiarism,
        matches = result.matches.len(),
        "comparison finished"
    );

    let body = state.views.result(&ResultView::new(&result)).map_err(|e| {
        error!(%e, "result template failed");
        ErrorInternalServerError(e)
    })?;

    let mut resp = HttpResponse::Ok();
    match preview_cookie(&build_preview(&submission, &result), &state.cookie_key) {
        Ok(cookie) => {
            resp.cookie(cookie);
        }
        Err(e) => warn!(%e, "session preview not stored"),
    }
    Ok(resp.content_type(ContentType::html()).body(body))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let backend = if state.client.health().await { "up" } else { "down" };
    HttpResponse::Ok().json(json!({"status": "healthy", "backend": backend}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SESSION_COOKIE;
    use crate::views::Views;
    use actix_web::cookie::{Cookie, Key};
    use actix_web::http::header;
    use actix_web::{test, App};
    use httpmock::prelude::*;
    use shared::compare_client::CompareClient;

    const BOUNDARY: &str = "----compare-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, &'a [u8]),
    }

    fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post_form(parts: &[Part<'_>]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/submissions")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart(parts))
    }

    fn state_for(endpoint: &str, max_upload_bytes: usize) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            CompareClient::from_url_str(endpoint).unwrap(),
            Views::new().unwrap(),
            Key::generate(),
            max_upload_bytes,
        ))
    }

    fn quick_fox_parts() -> Vec<Part<'static>> {
        vec![
            Part::Text("submission[text_a]", "The quick fox"),
            Part::Text("submission[text_b]", "The quick fox"),
            Part::Text("submission[analyzer]", "word"),
            Part::Text("submission[ngram_min]", "1"),
            Part::Text("submission[ngram_max]", "2"),
        ]
    }

    fn session_cookie(resp: &actix_web::dev::ServiceResponse) -> Cookie<'static> {
        resp.response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.into_owned())
            .expect("session cookie set")
    }

    async fn body_string(resp: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[actix_rt::test]
    async fn quick_fox_round_trip() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/compare")
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({
                        "text_a": "The quick fox",
                        "text_b": "The quick fox",
                        "analyzer": "word",
                        "ngram_range": [1, 2]
                    }));
                then.status(200).header("content-type", "application/json").body(
                    r#"{"similarity":1.0,"is_plagiarism":true,"matches":[],"analyzer":"word","ngram_range":[1,2]}"#,
                );
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let resp = test::call_service(&app, post_form(&quick_fox_parts()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp);
        let html = body_string(resp).await;
        assert!(html.contains(r#"id="similarity" data-value="1.0""#), "{html}");
        assert!(html.contains(r#"id="verdict" data-value="true""#));
        mock.assert_async().await;

        // next visit is pre-filled from the session
        let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
        let html = body_string(test::call_service(&app, req).await).await;
        assert!(html.contains(r#"<textarea id="text_a" name="submission[text_a]" rows="12">The quick fox</textarea>"#));
        assert!(html.contains(r#"<option value="word" selected>"#));
    }

    #[actix_rt::test]
    async fn empty_side_never_reaches_backend() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/compare");
                then.status(200)
                    .json_body(serde_json::json!({"similarity": 0.0, "is_plagiarism": false}));
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = post_form(&[
            Part::Text("submission[text_a]", ""),
            Part::Text("submission[text_b]", "anything"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.response().cookies().next().is_none());
        let html = body_string(resp).await;
        assert!(html.contains("Preencha os dois campos de texto antes de comparar."));
        assert!(html.contains(">anything</textarea>"));
        assert!(!html.contains(r#"id="similarity""#));
        mock.assert_hits_async(0).await;
    }

    #[actix_rt::test]
    async fn backend_failure_renders_bad_gateway() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/compare");
                then.status(500).body("internal error");
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let resp = test::call_service(&app, post_form(&quick_fox_parts()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(resp.response().cookies().next().is_none());
        let html = body_string(resp).await;
        assert!(html.contains("Não foi possível analisar os textos. Verifique o backend e tente novamente."));
        assert!(!html.contains(r#"id="similarity""#));
        mock.assert_hits_async(1).await;
    }

    #[actix_rt::test]
    async fn malformed_backend_answer_renders_bad_gateway() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/compare");
                then.status(200).body("{\"similarity\": 0.5");
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let resp = test::call_service(&app, post_form(&quick_fox_parts()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_rt::test]
    async fn file_side_is_not_prefilled_and_settings_follow_backend() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/compare").json_body(serde_json::json!({
                    "text_a": "typed side",
                    "text_b": "uploaded side",
                    "analyzer": "Char",
                    "ngram_range": [3, 5]
                }));
                then.status(200).json_body(serde_json::json!({
                    "similarity": 0.2,
                    "is_plagiarism": false,
                    "analyzer": "char",
                    "ngram_range": [3, 5]
                }));
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = post_form(&[
            Part::Text("text_a", "typed side"),
            Part::File("file_a", "", "application/octet-stream", b""),
            Part::Text("text_b", ""),
            Part::File("file_b", "b.txt", "text/plain", b"uploaded side"),
            Part::Text("analyzer", "Char"),
            Part::Text("ngram_min", "3"),
            Part::Text("ngram_max", "5"),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        mock.assert_async().await;
        let cookie = session_cookie(&resp);

        let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
        let html = body_string(test::call_service(&app, req).await).await;
        assert!(html.contains(r#"<textarea id="text_a" name="submission[text_a]" rows="12">typed side</textarea>"#));
        assert!(html.contains(r#"<textarea id="text_b" name="submission[text_b]" rows="12"></textarea>"#));
        assert!(!html.contains("uploaded side"));
        assert!(html.contains(r#"<option value="char" selected>"#));
        assert!(html.contains(r#"id="ngram_min" type="number" name="submission[ngram_min]" value="3""#));
    }

    #[actix_rt::test]
    async fn form_defaults_without_session() {
        let state = state_for("http://127.0.0.1:9/api/compare", 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/")
            .cookie(Cookie::new(SESSION_COOKIE, "tampered"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains(r#"<option value="word" selected>"#));
        assert!(html.contains(r#"name="submission[ngram_min]" value="1""#));
        assert!(html.contains(r#"name="submission[ngram_max]" value="2""#));
        assert!(html.contains(r#"rows="12"></textarea>"#));
    }

    #[actix_rt::test]
    async fn oversized_upload_rerenders_form() {
        let state = state_for("http://127.0.0.1:9/api/compare", 16);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = post_form(&[
            Part::Text("text_a", "left"),
            Part::File("file_b", "big.txt", "text/plain", &[b'x'; 64]),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(resp.response().cookies().next().is_none());
        let html = body_string(resp).await;
        assert!(html.contains("<form"));
        assert!(html.contains(UPLOAD_TOO_LARGE_ALERT));
        assert!(!html.contains(r#"id="similarity""#));
    }

    #[actix_rt::test]
    async fn broken_multipart_rerenders_form() {
        let state = state_for("http://127.0.0.1:9/api/compare", 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/submissions")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload("no boundary in here")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let html = body_string(resp).await;
        assert!(html.contains("<form"));
        assert!(html.contains("Não foi possível ler o formulário enviado. Tente novamente."));
    }

    #[actix_rt::test]
    async fn health_reports_backend_state() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200).json_body(serde_json::json!({"status": "healthy"}));
            })
            .await;

        let state = state_for(&server.url("/api/compare"), 1 << 20);
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({"status": "healthy", "backend": "up"}));
    }
}
