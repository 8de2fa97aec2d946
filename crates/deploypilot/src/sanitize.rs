//! Helpers for sanitizing data before it enters log lines or error messages.
//!
//! Captured subprocess output and HTTP error bodies are logged verbatim, so
//! these functions make sure tokens and oversized payloads never leak into
//! the log.

/// Maximum length for error bodies to prevent log flooding.
pub const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Strips userinfo/tokens from a git remote URL.
///
/// - `https://ghp_token@github.com/user/repo` → `https://****@github.com/user/repo`
/// - `git@github.com:user/repo.git` → `git@github.com:user/repo.git` (no change)
/// - `https://github.com/user/repo` → `https://github.com/user/repo` (no change)
pub fn redact_repo_url(url: &str) -> String {
    if url.starts_with("git@") {
        return url.to_string();
    }

    if let Some(scheme_end) = url.find("://") {
        let after_scheme = &url[scheme_end + 3..];
        if let Some(at_pos) = after_scheme.find('@') {
            let scheme = &url[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }

    url.to_string()
}

/// Replaces every occurrence of `secret` in `text` with `****`.
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "****")
}

/// Truncates a body to [`MAX_ERROR_BODY_LENGTH`] characters.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((idx, _)) => format!("{}... (truncated)", &body[..idx]),
        None => body.to_string(),
    }
}
