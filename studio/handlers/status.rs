use std::io::Cursor;
use tiny_http::Response;

use crate::routes::json_response;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

pub fn handle(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let session = &state.session;
    let body = serde_json::json!({
        "busy": session.is_busy(),
        "has_model": session.has_model(),
        "last_prediction": session.last_prediction(),
        "status": session.status(),
    });
    json_response(200, body.to_string())
}
