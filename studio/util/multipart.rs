//! Minimal multipart/form-data parsing for the studio's upload forms.

/// One uploaded file part.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Returns the index of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        if let Some(pos) = find_subsequence(&haystack[start..], needle) {
            result.push(&haystack[start..start + pos]);
            start += pos + needle.len();
        } else {
            result.push(&haystack[start..]);
            break;
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find(|s| s.starts_with("boundary="))
        .map(|s| s["boundary=".len()..].trim_matches('"').to_owned())
}

/// A part's header block as text plus its body bytes.
fn parts<'a>(body: &'a [u8], boundary: &str) -> Vec<(String, &'a [u8])> {
    let delimiter = format!("--{}", boundary);
    let sep = b"\r\n\r\n";
    split_on(body, delimiter.as_bytes())
        .into_iter()
        .filter_map(|part| {
            let sep_pos = find_subsequence(part, sep)?;
            let headers = String::from_utf8_lossy(&part[..sep_pos]).into_owned();
            let raw = &part[sep_pos + sep.len()..];
            Some((headers, raw.strip_suffix(b"\r\n").unwrap_or(raw)))
        })
        .collect()
}

/// Every file part uploaded under `field_name`, in form order.
///
/// Parts with an empty file name (an `<input type="file">` left blank) are
/// skipped.
pub fn extract_files(body: &[u8], boundary: &str, field_name: &str) -> Vec<UploadedFile> {
    parts(body, boundary)
        .into_iter()
        .filter(|(headers, _)| parse_quoted(headers, "name=\"").as_deref() == Some(field_name))
        .filter_map(|(headers, data)| {
            let filename = parse_quoted(&headers, "filename=\"")?;
            if filename.is_empty() {
                return None;
            }
            Some(UploadedFile { filename: basename(&filename).to_owned(), bytes: data.to_vec() })
        })
        .collect()
}

/// Bytes of the first file part uploaded under `field_name`.
pub fn extract_file(body: &[u8], boundary: &str, field_name: &str) -> Option<Vec<u8>> {
    extract_files(body, boundary, field_name).into_iter().next().map(|f| f.bytes)
}

/// Extracts a plain-text (non-file) field from a multipart body.
pub fn extract_text_field(body: &[u8], boundary: &str, field_name: &str) -> Option<String> {
    parts(body, boundary)
        .into_iter()
        .find(|(headers, _)| {
            parse_quoted(headers, "name=\"").as_deref() == Some(field_name) && !headers.contains("filename=")
        })
        .and_then(|(_, data)| String::from_utf8(data.to_vec()).ok())
}

/// Value between `key` (which ends in an opening quote) and the next quote.
/// `name="` must not match inside `filename="`.
fn parse_quoted(headers: &str, key: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(rel) = headers[search_from..].find(key) {
        let pos = search_from + rel;
        let preceded_by_word = headers[..pos]
            .chars()
            .next_back()
            .map_or(false, |c| c.is_ascii_alphanumeric());
        let rest = &headers[pos + key.len()..];
        if !preceded_by_word {
            let end = rest.find('"')?;
            return Some(rest[..end].to_owned());
        }
        search_from = pos + key.len();
    }
    None
}

/// Browsers on some platforms send a full client path as the file name.
fn basename(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name)
}
