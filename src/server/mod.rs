//! Evaluation server: serves a submission with the instrumentation bundle
//! appended to its entry script
//!
//! Every other path goes to the static delegate untouched. The server only
//! reads the submission directory; the bundle is rendered once and shared.

mod inject;
mod static_files;

pub use inject::serve_entry;
pub use static_files::{content_type_for, decode_path, resolve_path, serve_static};

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::http::{Method, StatusCode};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, middleware, web};
use tracing::{debug, info};

use crate::bundle::InstrumentationBundle;

/// Shared, read-only request state
#[derive(Clone, Debug)]
pub struct ServeState {
    /// Submission directory being served
    pub root: PathBuf,
    pub bundle: Arc<InstrumentationBundle>,
}

impl ServeState {
    pub fn new(root: impl Into<PathBuf>, bundle: InstrumentationBundle) -> Self {
        Self {
            root: root.into(),
            bundle: Arc::new(bundle),
        }
    }
}

/// Route by decoded path only; the query string never affects which file
/// is served
pub async fn handle(state: web::Data<ServeState>, req: HttpRequest) -> HttpResponse {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return HttpResponse::build(StatusCode::METHOD_NOT_ALLOWED)
            .insert_header(("Allow", "GET, HEAD"))
            .finish();
    }
    let Some(path) = decode_path(req.path()) else {
        debug!("Undecodable path {}", req.path());
        return static_files::not_found(req.path());
    };
    if state.bundle.targets(&path) {
        serve_entry(&state, &path).await
    } else {
        serve_static(&state, &path).await
    }
}

pub async fn run(state: ServeState, addr: &str) -> std::io::Result<()> {
    info!(
        "Serving {} on http://{} (instrumenting {}, {} byte bundle)",
        state.root.display(),
        addr,
        state.bundle.target_path,
        state.bundle.len()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .default_service(web::to(handle))
    })
    .bind(addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::AgentTuning;
    use actix_web::{App, test as awtest};
    use std::fs;

    const HOOKS: &str = "\n;window._test = {};";

    fn fixture() -> (tempfile::TempDir, ServeState) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.js"), "startGame();").unwrap();
        fs::write(dir.path().join("src/util.js"), "export const x = 1;").unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/laser shot.wav"), b"RIFF").unwrap();
        let bundle = InstrumentationBundle::from_template(HOOKS, &AgentTuning::default()).unwrap();
        let state = ServeState::new(dir.path(), bundle);
        (dir, state)
    }

    fn header<'a>(resp: &'a actix_web::dev::ServiceResponse, name: &str) -> Option<&'a str> {
        resp.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[actix_web::test]
    async fn test_entry_script_gets_bundle() {
        let (dir, state) = fixture();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/src/main.js").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("application/javascript"));
        assert_eq!(header(&resp, "access-control-allow-origin"), Some("*"));
        let body = awtest::read_body(resp).await;
        assert_eq!(body.len(), "startGame();".len() + HOOKS.len());
        assert!(body.starts_with(b"startGame();"));
        assert!(body.ends_with(HOOKS.as_bytes()));

        // File on disk is untouched
        assert_eq!(fs::read_to_string(dir.path().join("src/main.js")).unwrap(), "startGame();");
    }

    #[actix_web::test]
    async fn test_query_string_still_instrumented() {
        let (_dir, state) = fixture();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/src/main.js?v=3").to_request();
        let body = awtest::call_and_read_body(&app, req).await;
        assert!(body.ends_with(HOOKS.as_bytes()));
    }

    #[actix_web::test]
    async fn test_other_files_unmodified() {
        let (_dir, state) = fixture();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/src/util.js").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("application/javascript"));
        assert_eq!(awtest::read_body(resp).await, "export const x = 1;".as_bytes());

        let req = awtest::TestRequest::get().uri("/").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("text/html; charset=utf-8"));
    }

    #[actix_web::test]
    async fn test_missing_entry_script_is_404() {
        let (dir, state) = fixture();
        fs::remove_file(dir.path().join("src/main.js")).unwrap();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/src/main.js").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_traversal_and_methods_rejected() {
        let (_dir, state) = fixture();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/src/../../etc/passwd").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = awtest::TestRequest::post().uri("/src/main.js").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_percent_encoded_paths() {
        let (_dir, state) = fixture();
        let app = awtest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .default_service(web::to(handle)),
        )
        .await;

        let req = awtest::TestRequest::get().uri("/assets/laser%20shot.wav").to_request();
        let resp = awtest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "content-type"), Some("audio/wav"));
        assert_eq!(awtest::read_body(resp).await, "RIFF".as_bytes());

        // Encoded entry path is still instrumented
        let req = awtest::TestRequest::get().uri("/src/ma%69n.js").to_request();
        let body = awtest::call_and_read_body(&app, req).await;
        assert!(body.ends_with(HOOKS.as_bytes()));

        for uri in ["/src/%2e%2e/%2e%2e/etc/passwd", "/%2E%2E/index.html", "/src%2F..%2F..%2Fetc"] {
            let req = awtest::TestRequest::get().uri(uri).to_request();
            let resp = awtest::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }
}
