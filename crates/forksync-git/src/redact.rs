//! Credential redaction for text that may contain authenticated URLs

use std::sync::LazyLock;

use regex::Regex;

static URL_USERINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*://)[^/@\s]+@").expect("valid regex")
});

/// Replace the userinfo part of every URL in `text` with `***`.
///
/// Tokens are embedded in fork URLs, and git echoes remote URLs back in its
/// error output, so anything derived from git output passes through here
/// before being logged or reported.
pub fn redact_credentials(text: &str) -> String {
    URL_USERINFO.replace_all(text, "${scheme}***@").into_owned()
}
