//! Plain text → Telegram HTML for reposted messages.

use crate::messaging::types::Attribution;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render relay text as Telegram HTML.
///
/// The body is plain text and is always escaped, so markup-looking input in a
/// relayed post stays literal. The attribution, when given, is the only link.
pub fn render_html(text: &str, attribution: Option<&Attribution>) -> String {
    let mut out = escape_html(text);
    if let Some(a) = attribution {
        out.push_str(&format!(
            "\n\n<a href=\"{}\">{}</a>",
            escape_html(&a.url),
            escape_html(&a.label)
        ));
    }
    out
}
