/// Response formatting utilities for curl command

use std::collections::HashMap;

/// Format response headers as "Name: Value\r\n"
pub fn format_headers(headers: &HashMap<String, String>) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Extract filename from URL path (for -O flag)
pub fn extract_filename(url: &str) -> String {
    // Try to parse as URL-like string
    // Find the path portion after the host
    if let Some(after_scheme) = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
        if let Some(slash_pos) = after_scheme.find('/') {
            let path = &after_scheme[slash_pos..];
            // Remove query string
            let path = path.split('?').next().unwrap_or(path);
            // Remove fragment
            let path = path.split('#').next().unwrap_or(path);
            let filename = path.rsplit('/').next().unwrap_or("");
            if !filename.is_empty() {
                return filename.to_string();
            }
        }
    }
    "index.html".to_string()
}

/// Apply write-out format string substitution
pub fn apply_write_out(
    format: &str,
    status: u16,
    headers: &HashMap<String, String>,
    url: &str,
    body_len: usize,
) -> String {
    let mut output = format.to_string();
    output = output.replace("%{http_code}", &status.to_string());
    output = output.replace(
        "%{content_type}",
        headers.get("content-type").map(|s| s.as_str()).unwrap_or(""),
    );
    output = output.replace("%{url_effective}", url);
    output = output.replace("%{size_download}", &body_len.to_string());
    output = output.replace("\\n", "\n");
    output
}
