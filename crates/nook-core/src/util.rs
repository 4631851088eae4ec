//! Small helpers shared by configuration, remote access and sync.

/// Trimmed text, or `None` when nothing but whitespace is left.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Whether an endpoint carries an explicit HTTP(S) scheme
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Wall-clock milliseconds since the Unix epoch; the unit of every
/// `updated_at` and `syncedAt` stamp.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
