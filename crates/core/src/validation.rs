//! Request validation for batch admission.
//!
//! Validation is all-or-nothing: any malformed entry rejects the whole batch
//! before a ledger entry or job exists.

use crate::error::CoreError;

/// Message returned when the request does not carry a `urls` array.
pub const MSG_PROVIDE_URL_ARRAY: &str = "Provide an array of URLs.";

/// Whether `candidate` parses as an absolute URL.
pub fn is_valid_url(candidate: &str) -> bool {
    url::Url::parse(candidate).is_ok()
}

/// Validate the raw `urls` field of an admission request.
///
/// - Anything other than a JSON array is [`CoreError::InvalidInput`].
/// - Every non-string entry and every string that fails URL parsing is
///   collected, in input order, into [`CoreError::InvalidUrls`].
pub fn parse_url_list(raw: &serde_json::Value) -> Result<Vec<String>, CoreError> {
    let entries = raw
        .as_array()
        .ok_or_else(|| CoreError::InvalidInput(MSG_PROVIDE_URL_ARRAY.to_string()))?;

    let mut urls = Vec::with_capacity(entries.len());
    let mut invalid_urls = Vec::new();

    for entry in entries {
        match entry.as_str() {
            Some(s) if is_valid_url(s) => urls.push(s.to_string()),
            _ => invalid_urls.push(entry.clone()),
        }
    }

    if !invalid_urls.is_empty() {
        return Err(CoreError::InvalidUrls { invalid_urls });
    }
    Ok(urls)
}
