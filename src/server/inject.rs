//! Entry-script route: original bytes plus the instrumentation bundle

use std::io::ErrorKind;

use actix_web::HttpResponse;
use actix_web::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use tracing::{debug, error, warn};

use super::ServeState;
use super::static_files::{internal_error, not_found, read_file, resolve_path};

/// Serve the entry script with the bundle appended. Content-Length is
/// written from the combined body.
pub async fn serve_entry(state: &ServeState, request_path: &str) -> HttpResponse {
    let Some(file) = resolve_path(&state.root, request_path) else {
        return not_found(request_path);
    };

    match read_file(file.clone()).await {
        Ok(original) => {
            let body = state.bundle.instrument(&original);
            debug!(
                "Instrumented {} ({} + {} bytes)",
                request_path,
                original.len(),
                state.bundle.len()
            );
            HttpResponse::Ok()
                .insert_header((CONTENT_TYPE, state.bundle.content_type))
                .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
                .body(body)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Entry script missing: {}", file.display());
            not_found(request_path)
        }
        Err(e) => {
            error!("Failed to read entry script {}: {}", file.display(), e);
            internal_error()
        }
    }
}
