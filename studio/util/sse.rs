use std::io::Write;

/// Raw HTTP response head for an event stream, written directly to the
/// socket after `Request::into_writer()`.
pub const SSE_RESPONSE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
                                     Content-Type: text/event-stream\r\n\
                                     Cache-Control: no-cache\r\n\
                                     Connection: keep-alive\r\n\
                                     X-Accel-Buffering: no\r\n\
                                     \r\n";

/// Formats a named SSE event with a JSON data payload.
///
/// Output format (per SSE spec):
/// ```text
/// event: <name>\n
/// data: <json>\n
/// \n
/// ```
pub fn format_sse_event(event_name: &str, json_data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event_name, json_data)
}

/// Writes all bytes to the writer and flushes, returning `Err` on any I/O
/// failure (usually the client went away).
pub fn write_all<W: Write + ?Sized>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
    w.write_all(data)?;
    w.flush()
}
