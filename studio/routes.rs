use std::io::Cursor;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use ferrite_face::PipelineError;

use crate::state::SharedState;
use crate::handlers;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let bytes = body.into_bytes();
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        vec![Header::from_bytes(b"Content-Type", b"application/json").unwrap()],
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

/// `{"error": "<message>"}` with the given status.
pub fn json_error(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    json_response(status, serde_json::json!({ "error": message }).to_string())
}

/// Maps a pipeline failure onto an HTTP status and JSON error body.
pub fn pipeline_error(err: &PipelineError) -> Response<Cursor<Vec<u8>>> {
    let status = match err {
        PipelineError::Busy => 409,
        PipelineError::NoModel => 412,
        PipelineError::Decode(_) | PipelineError::Parse(_) => 400,
        PipelineError::RaceOutOfRange { .. } | PipelineError::EmptyBatch { .. } => 422,
        _ => 500,
    };
    json_error(status, &err.to_string())
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    json_error(404, "not found")
}

/// Reads the Content-Type header, or an empty string.
pub fn content_type(request: &Request) -> String {
    request.headers().iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// All handlers except training receive a `&mut Request` so that the
/// dispatcher retains ownership and can call `request.respond(response)` at
/// the end. The training handler takes ownership to stream epoch events.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url    = request.url().to_owned();
    let path   = url.split('?').next().unwrap_or("").to_owned();

    tracing::debug!(%method, %path, "request");

    // SSE: long-lived; the handler takes ownership and drives the stream loop.
    if method == Method::Post && path == "/train" {
        handlers::train::handle_start(request, state);
        return;
    }

    let response = match (method, path.as_str()) {
        (Method::Post, "/train/stop") => handlers::train::handle_stop(state),
        (Method::Post, "/predict")    => handlers::predict::handle(&mut request, state),
        (Method::Get,  "/status")     => handlers::status::handle(state),
        _ => not_found(),
    };

    let _ = request.respond(response);
}
