use chrono::NaiveDateTime;

/// Date formats tried, in order, after the integer-epoch fast path.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a last-activity value into unix epoch seconds.
///
/// Accepts a plain integer epoch, or one of the date formats firmware has been
/// seen to emit (interpreted as UTC). Returns None for anything else.
pub fn parse_last_activity(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        return Some(epoch);
    }
    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    None
}
