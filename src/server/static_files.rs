//! Static delegate: serves submission files byte for byte

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use actix_web::http::StatusCode;
use actix_web::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use actix_web::{HttpResponse, web};
use percent_encoding::percent_decode_str;
use tracing::{debug, error};

use super::ServeState;

/// Percent-decode a raw request path segment by segment. Returns None for
/// invalid UTF-8 and for segments that decode to a separator or NUL, so an
/// encoded `/` can never split a segment after the fact.
pub fn decode_path(raw: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        let decoded = percent_decode_str(segment).decode_utf8().ok()?;
        if decoded.contains(['/', '\\', '\0']) {
            return None;
        }
        segments.push(decoded);
    }
    Some(segments.join("/"))
}

/// Map a decoded request path onto a file under `root`. Returns None for
/// paths that try to climb out of the root.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') => return None,
            s => path.push(s),
        }
    }
    if path.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wasm" => "application/wasm",
        "txt" => "text/plain; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

pub(super) fn not_found(path: &str) -> HttpResponse {
    HttpResponse::build(StatusCode::NOT_FOUND)
        .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
        .body(format!("Not found: {}", path))
}

pub(super) fn internal_error() -> HttpResponse {
    HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
        .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
        .body("Internal server error")
}

/// Read a file on the blocking pool
pub(super) async fn read_file(path: PathBuf) -> std::io::Result<Vec<u8>> {
    web::block(move || std::fs::read(path))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
}

pub async fn serve_static(state: &ServeState, request_path: &str) -> HttpResponse {
    let Some(file) = resolve_path(&state.root, request_path) else {
        debug!("Rejected path {}", request_path);
        return not_found(request_path);
    };
    let content_type = content_type_for(&file);

    match read_file(file.clone()).await {
        Ok(bytes) => HttpResponse::Ok()
            .insert_header((CONTENT_TYPE, content_type))
            .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
            .body(bytes),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            debug!("No file at {}", file.display());
            not_found(request_path)
        }
        Err(e) => {
            error!("Failed to read {}: {}", file.display(), e);
            internal_error()
        }
    }
}
