//! Minimal HTML bodies for the launch bridge.
//!
//! Every value echoed into a page is escaped; identifiers placed in a URL
//! are percent-encoded first.

/// Escape text for use inside HTML element content or attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Percent-encode a query parameter value, keeping only RFC 3986
/// unreserved characters literal.
#[must_use]
pub fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Body returned by a successful launch: redirects to the confirmation page.
///
/// The target only contains percent-encoded characters, so it is safe both
/// in the attribute and in the script string.
#[must_use]
pub fn launched_redirect(game_id: &str) -> String {
    let target = format!("/game-launched?game={}", encode_query_value(game_id));
    format!(
        "<!DOCTYPE html>\n<html><head><meta http-equiv=\"refresh\" content=\"0; url={target}\"></head>\
         <body><script>window.location.href='{target}';</script>\
         <p><a href=\"{target}\">Game launched</a></p></body></html>\n"
    )
}

/// Confirmation page shown after a launch.
#[must_use]
pub fn launched_page(display_name: &str, terminate_key: &str) -> String {
    let name = escape_html(display_name);
    let key = escape_html(terminate_key);
    format!(
        "<!DOCTYPE html>\n<html><head><title>Game Launched</title></head><body>\
         <h1>{name} launched</h1>\
         <p>The game is running on this machine. Press <kbd>{key}</kbd> to return to the launcher.</p>\
         <p><a href=\"/\">Back</a></p></body></html>\n"
    )
}

/// Error page carrying a human-readable message.
#[must_use]
pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Error</title></head><body>\
         <h1>Error</h1><p>{}</p><p><a href=\"/\">Back</a></p></body></html>\n",
        escape_html(message)
    )
}
