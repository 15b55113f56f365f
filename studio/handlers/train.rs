use std::io::{Cursor, Read};
use tiny_http::{Request, Response};

use ferrite_face::{CancelToken, RawSample};

use crate::routes::{content_type, json_error, json_response, pipeline_error};
use crate::state::SharedState;
use crate::util::multipart::{extract_boundary, extract_files, extract_text_field};
use crate::util::sse::{format_sse_event, write_all, SSE_RESPONSE_HEAD};

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024; // 512 MB

// ---------------------------------------------------------------------------
// POST /train
// ---------------------------------------------------------------------------

/// Starts training on the uploaded `files` and streams progress.
///
/// Failures before the first epoch (bad upload, busy session, no usable
/// samples) are answered with a JSON error. Once training starts the
/// response becomes a Server-Sent Events stream:
/// - `event: start`: sample counts and total epochs
/// - `event: epoch`: one per epoch, `EpochStats` JSON
/// - `event: error`: the engine failed; stream ends
/// - `event: done` / `event: stopped`: `TrainingSummary` JSON; stream ends
///
/// A client disconnect is treated as a stop request.
pub fn handle_start(mut request: Request, state: SharedState) {
    let ctype = content_type(&request);
    let boundary = match extract_boundary(&ctype) {
        Some(b) => b,
        None => {
            let _ = request.respond(json_error(400, "Expected a multipart/form-data upload."));
            return;
        }
    };

    let mut body: Vec<u8> = Vec::new();
    if request.as_reader().take(MAX_UPLOAD_BYTES as u64 + 1).read_to_end(&mut body).is_err() {
        let _ = request.respond(json_error(400, "Could not read the upload."));
        return;
    }
    if body.len() > MAX_UPLOAD_BYTES {
        let _ = request.respond(json_error(413, "Upload exceeds 512 MB limit."));
        return;
    }

    let samples: Vec<RawSample> = extract_files(&body, &boundary, "files")
        .into_iter()
        .map(|f| RawSample::new(f.filename, f.bytes))
        .collect();
    if samples.is_empty() {
        let _ = request.respond(json_error(400, "No training images were uploaded."));
        return;
    }

    let mut fit = state.session.config().fit;
    let field = |name: &str| extract_text_field(&body, &boundary, name)
        .and_then(|v| v.trim().parse::<usize>().ok());
    if let Some(epochs) = field("epochs") {
        fit.epochs = epochs.clamp(1, 1000);
    }
    if let Some(batch_size) = field("batch_size") {
        fit.batch_size = batch_size.max(1);
    }
    drop(body);

    let cancel = CancelToken::new();
    let run = match state.session.train_with(samples, fit, cancel.clone()) {
        Ok(run) => run,
        Err(e) => {
            let _ = request.respond(pipeline_error(&e));
            return;
        }
    };
    state.set_cancel(cancel.clone());

    // tiny_http's `into_writer()` gives us the raw TCP stream so we can
    // write the HTTP response head and then stream SSE frames directly.
    let mut writer = request.into_writer();
    let mut connected = write_all(&mut writer, SSE_RESPONSE_HEAD.as_bytes()).is_ok();

    let start = serde_json::json!({ "samples": run.samples(), "dropped": run.dropped(), "total_epochs": run.total_epochs() });
    connected = connected && write_all(&mut writer, format_sse_event("start", &start.to_string()).as_bytes()).is_ok();

    let mut run = run;
    let mut failed = false;
    for event in run.by_ref() {
        let frame = match event {
            Ok(stats) => match serde_json::to_string(&stats) {
                Ok(json) => format_sse_event("epoch", &json),
                Err(_) => continue,
            },
            Err(e) => {
                failed = true;
                format_sse_event("error", &serde_json::json!({ "error": e.to_string() }).to_string())
            }
        };
        if connected && write_all(&mut writer, frame.as_bytes()).is_err() {
            tracing::info!("training client disconnected, stopping");
            connected = false;
            cancel.cancel();
        }
    }

    if !failed && connected {
        let summary = run.summary();
        let name = if summary.was_cancelled { "stopped" } else { "done" };
        if let Ok(json) = serde_json::to_string(&summary) {
            let _ = write_all(&mut writer, format_sse_event(name, &json).as_bytes());
        }
    }
    drop(run);
    // The busy flag is already free here, so a newer run may own the slot.
    state.clear_cancel(&cancel);
}

// ---------------------------------------------------------------------------
// POST /train/stop
// ---------------------------------------------------------------------------

pub fn handle_stop(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let stopping = state.request_stop();
    json_response(202, serde_json::json!({ "stopping": stopping }).to_string())
}
