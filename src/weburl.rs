use regex::Regex;

const SERVER_ID_PATTERN: &str = r"/server/([0-9a-f]{40})";

/// Address shapes the web client uses for an item, in priority order:
/// the query-encoded metadata path first, then the two plain path forms.
const CONTENT_ID_PATTERNS: [&str; 3] = [
    r"key=%2Flibrary%2Fmetadata%2F(\d+)",
    r"/details/(\d+)",
    r"/item/(\d+)",
];

/// Extract the 40-hex machine identifier of the server the page is browsing.
///
/// The identifier lives in the URL fragment (`#!/server/<id>/...`), so this
/// matches on the raw address text instead of going through a URL parser,
/// which would hide everything after the `#`.
pub fn extract_server_id(address: &str) -> Option<String> {
    let re = Regex::new(SERVER_ID_PATTERN).ok()?;
    re.captures(address)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the numeric content identifier of the item the page is showing.
/// The first matching address shape wins.
pub fn extract_content_id(address: &str) -> Option<String> {
    for pattern in CONTENT_ID_PATTERNS {
        if let Ok(re) = Regex::new(pattern)
            && let Some(caps) = re.captures(address)
            && let Some(m) = caps.get(1)
        {
            return Some(m.as_str().to_string());
        }
    }
    None
}
