use crate::document::{Document, StartLine};

/// Serialize a [`Document`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(doc: &Document, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(doc).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(doc).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Render a [`Document`] in a human-readable debug format.
pub fn format_debug(doc: &Document) -> String {
    let mut out = String::with_capacity(256);

    match doc.start {
        Some(StartLine::Response { status }) => {
            out.push_str("=== HTTP Response ===\n");
            out.push_str(&format!("Status:  {} {}\n", status, doc.reason()));
        }
        _ => {
            out.push_str("=== HTTP Request ===\n");
            if let Some(method) = doc.method() {
                out.push_str(&format!("Method:  {method}\n"));
            }
            out.push_str(&format!("Target:  {}\n", doc.target()));
        }
    }
    out.push_str(&format!("Version: HTTP/{}.{}\n", doc.major, doc.minor));

    out.push_str(&format!("\n--- Headers ({}) ---\n", doc.headers.len()));
    for header in &doc.headers {
        out.push_str(&format!("  {}: {}\n", header.name, header.value));
    }

    if doc.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", doc.body.len()));
        match std::str::from_utf8(&doc.body) {
            Ok(s) => out.push_str(s),
            Err(_) => out.push_str(&format!("<binary data: {} bytes>", doc.body.len())),
        }
        out.push('\n');
    }

    out.push_str("=====================\n");
    out
}

/// Render only the start line and headers (no body).
pub fn format_headers_only(doc: &Document) -> String {
    let mut out = String::with_capacity(64 + doc.headers.len() * 40);

    match doc.start {
        Some(StartLine::Response { status }) => {
            out.push_str(&format!(
                "HTTP/{}.{} {} {}\n",
                doc.major,
                doc.minor,
                status,
                doc.reason()
            ));
        }
        _ => {
            if let Some(method) = doc.method() {
                out.push_str(&format!(
                    "{} {} HTTP/{}.{}\n",
                    method,
                    doc.target(),
                    doc.major,
                    doc.minor
                ));
            } else {
                out.push_str(&format!(
                    "{} HTTP/{}.{}\n",
                    doc.target(),
                    doc.major,
                    doc.minor
                ));
            }
        }
    }

    for header in &doc.headers {
        out.push_str(&format!("{}: {}\n", header.name, header.value));
    }

    out
}
