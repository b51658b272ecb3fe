pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::extract::handlers::handle_extract_cv;
use crate::generation::handlers::handle_generate;
use crate::jobs::handlers::{handle_fetch_job, handle_manual_job};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/models", get(health::models_handler))
        // Document Text Extractor
        .route(
            "/api/v1/cv/extract",
            post(handle_extract_cv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Job Posting Fetcher + manual paste
        .route("/api/v1/jobs/fetch", post(handle_fetch_job))
        .route("/api/v1/jobs/manual", post(handle_manual_job))
        // Generation Orchestrator
        .route("/api/v1/generate", post(handle_generate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::extract::docx::tests::build_docx;
    use crate::generation::generator::Generator;
    use crate::generation::reasoning::ReasoningDetector;
    use crate::jobs::{FetchSettings, JobFetcher};
    use crate::llm_client::testing::{client, ScriptedBackend};
    use crate::llm_client::LlmError;

    fn app(backend: Arc<ScriptedBackend>) -> Router {
        let config = Config::for_tests();
        let llm = client(backend);
        let fetcher = JobFetcher::new(&FetchSettings {
            timeout: config.fetch_timeout,
            max_attempts: config.fetch_max_attempts,
            backoff: config.backoff(),
        })
        .unwrap();
        let generator = Generator::new(llm.clone(), ReasoningDetector::default(), config.backoff());
        build_router(AppState {
            llm,
            fetcher,
            generator,
            config,
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn acme_job() -> Value {
        json!({
            "title": "Senior Data Analyst",
            "company": "Acme Corp",
            "description": "Senior Data Analyst at Acme Corp, requires SQL and Python",
            "location": null,
            "source_url": null,
            "source": "Manual"
        })
    }

    const CV: &str = "Jane Doe\nData Analyst\n3 years SQL experience\nPython scripting";

    #[tokio::test]
    async fn test_health() {
        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["service"], "tailor-api");
    }

    #[tokio::test]
    async fn test_models_lists_server_models() {
        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(Request::get("/api/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["connected"], true);
        assert_eq!(body["models"][0], "llama3:latest");
        assert_eq!(body["default_model"], "llama3");
    }

    #[tokio::test]
    async fn test_manual_job_without_description_is_400() {
        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(post_json(
                "/api/v1/jobs/manual",
                json!({"title": "Analyst", "description": " "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url() {
        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(post_json("/api/v1/jobs/fetch", json!({"url": "ftp://example.com/job"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["stage"], "job_fetch");
        assert!(body["error"]["hint"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_returns_tailored_cv_and_keywords() {
        let backend = ScriptedBackend::always(Ok(CV.to_string()));
        let response = app(backend)
            .oneshot(post_json(
                "/api/v1/generate",
                json!({"cv_text": CV, "job": acme_job(), "tasks": ["tailor_cv"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["tailored_cv"]["text"]
            .as_str()
            .unwrap()
            .contains("3 years SQL experience"));
        assert_eq!(body["tailored_cv"]["path"][4], "SUCCEEDED");
        assert_eq!(body["emphasized_keywords"], json!(["SQL", "Python"]));
        assert!(body.get("cover_letter").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_with_unreachable_server_is_generation_failed() {
        let backend =
            ScriptedBackend::always(Err(LlmError::Unavailable("connection refused".into())));
        let response = app(backend)
            .oneshot(post_json(
                "/api/v1/generate",
                json!({"cv_text": CV, "job": acme_job(), "tasks": ["tailor_cv"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "GENERATION_FAILED");
        assert_eq!(body["error"]["diagnostics"]["cause_code"], "MODEL_UNAVAILABLE");
        assert!(body.get("tailored_cv").is_none());
    }

    #[tokio::test]
    async fn test_generate_rejects_oversized_attempt_budget() {
        let backend =
            ScriptedBackend::always(Err(LlmError::Unavailable("connection refused".into())));
        let response = app(backend.clone())
            .oneshot(post_json(
                "/api/v1/generate",
                json!({"cv_text": CV, "job": acme_job(), "max_attempts": 70}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_requires_cv_text() {
        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(post_json(
                "/api/v1/generate",
                json!({"cv_text": "", "job": acme_job()}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cv_upload_multipart() {
        let docx = build_docx(
            r#"<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p><w:p><w:r><w:t>Data Analyst</w:t></w:r></w:p>"#,
        );
        let boundary = "tailorboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.docx\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&docx);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::post("/api/v1/cv/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["cv"]["raw_text"], "Jane Doe\nData Analyst");
        assert_eq!(body["cv"]["source_format"], "docx");
    }

    #[tokio::test]
    async fn test_cv_upload_without_file_is_400() {
        let boundary = "tailorboundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\npdf\r\n--{boundary}--\r\n"
        );
        let request = Request::post("/api/v1/cv/extract")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(ScriptedBackend::always(Ok(String::new())))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
