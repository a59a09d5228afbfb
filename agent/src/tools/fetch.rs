use std::io::Read;

use tracing::debug;

use crate::tools::{ToolContext, ToolError, ToolResult};

const MAX_UTF8_CHAR_BYTES: u64 = 4;

/// HTTP GET with a bounded preview of the body.
///
/// At most enough bytes for one character past the preview are read, so the
/// size of the page does not matter.
pub fn fetch_url(ctx: &ToolContext, url: &str) -> ToolResult {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ToolError::Fetch(format!(
            "unsupported URL '{url}', only http and https are allowed"
        )));
    }

    let response = ctx.http().get(url).call().map_err(|err| match err {
        ureq::Error::Status(code, _) => ToolError::Fetch(format!("HTTP status {code}")),
        ureq::Error::Transport(transport) => ToolError::Fetch(transport.to_string()),
    })?;
    let status = response.status();

    let preview_chars = ctx.limits().fetch_preview_chars;
    let byte_limit = (preview_chars as u64 + 1) * MAX_UTF8_CHAR_BYTES;
    let mut raw = Vec::new();
    response
        .into_reader()
        .take(byte_limit)
        .read_to_end(&mut raw)
        .map_err(|err| ToolError::Fetch(format!("could not read body: {err}")))?;

    let text = String::from_utf8_lossy(&raw);
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(preview_chars).collect();
    let more = chars.next().is_some();
    let shown = preview.chars().count();
    debug!(status, bytes_read = raw.len(), more, "fetched url");

    let extent = if more {
        format!("first {shown} characters")
    } else {
        format!("{shown} characters")
    };
    Ok(format!("Content from {url} (status {status}, {extent}):\n{preview}"))
}
