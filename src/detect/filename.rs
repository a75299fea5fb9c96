//! Filename inference and sanitizing

/// Replace path separators and NUL, trim, and fall back when nothing is left
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Filename suggested by a `Content-Disposition` header.
///
/// `filename*` (RFC 5987, percent-encoded, optional charset prefix) wins over `filename`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => extended = Some(decode_ext_value(value)),
            "filename" => plain = Some(value.replace('"', "").trim().to_string()),
            _ => {}
        }
    }

    extended
        .or(plain)
        .filter(|name| !name.is_empty())
}

/// Split on `;` outside double-quoted strings
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (idx, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

fn decode_ext_value(value: &str) -> String {
    let value = value.replace('"', "");
    // charset'language'encoded-text
    let encoded = match value.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
        [_, _, text] => text.to_string(),
        _ => value.clone(),
    };
    urlencoding::decode(&encoded)
        .map(|decoded| decoded.trim().to_string())
        .unwrap_or_else(|_| encoded.trim().to_string())
}
