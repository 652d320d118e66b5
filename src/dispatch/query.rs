//! Outbound query-string filtering.
//!
//! Pairs are kept in their original order and original bytes; nothing is
//! percent-decoded. With no ignore patterns and no whitelist configured
//! the raw query passes through untouched.

use crate::remap::RemapPath;

/// Derive the outbound query string for a matched path.
///
/// Ignore globs are applied to parameter names first; if a whitelist is
/// configured, only exact whitelist names survive the intersection.
/// Filtering is idempotent.
pub fn filter_query(path: &RemapPath, raw: &str) -> String {
    if path.ignore_params.is_empty() && path.whitelist_params.is_empty() {
        return raw.to_string();
    }

    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|&pair| {
            let name = pair.split('=').next().unwrap_or(pair);
            if path.ignore_params.iter().any(|glob| glob.matches(name)) {
                return false;
            }
            path.whitelist_params.is_empty() || path.whitelist_params.contains(name)
        })
        .collect::<Vec<_>>()
        .join("&")
}
