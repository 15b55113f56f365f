use std::io::{Cursor, Read};
use tiny_http::{Request, Response};

use crate::routes::{content_type, json_error, json_response, pipeline_error};
use crate::state::SharedState;
use crate::util::multipart::{extract_boundary, extract_file};

const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024; // 32 MB

// ---------------------------------------------------------------------------
// POST /predict
// ---------------------------------------------------------------------------

/// Runs the trained model on the uploaded `image` and returns the decoded
/// prediction as JSON.
pub fn handle(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let ctype = content_type(request);
    let boundary = match extract_boundary(&ctype) {
        Some(b) => b,
        None => return json_error(400, "Expected a multipart/form-data upload."),
    };

    let mut body: Vec<u8> = Vec::new();
    if request.as_reader().take(MAX_IMAGE_BYTES as u64 + 1).read_to_end(&mut body).is_err() {
        return json_error(400, "Could not read the upload.");
    }
    if body.len() > MAX_IMAGE_BYTES {
        return json_error(413, "Image exceeds 32 MB limit.");
    }

    let image = match extract_file(&body, &boundary, "image") {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return json_error(400, "No image file was uploaded."),
    };

    match state.session.predict(&image) {
        Ok(prediction) => match serde_json::to_string(&prediction) {
            Ok(json) => json_response(200, json),
            Err(e) => json_error(500, &e.to_string()),
        },
        Err(e) => pipeline_error(&e),
    }
}
