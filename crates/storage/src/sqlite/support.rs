#![forbid(unsafe_code)]

use crate::StoreError;

/// Collection and index names are embedded in SQL, so they are restricted to
/// `[A-Za-z][A-Za-z0-9_]*`.
pub(super) fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    value.len() <= 64
        && first.is_ascii_alphabetic()
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// `info.id` -> `$.info.id`, for use as a literal in `json_extract`.
pub(super) fn json_path(dotted: &str) -> Result<String, StoreError> {
    let mut out = String::from("$");
    for segment in dotted.split('.') {
        let valid = !segment.is_empty()
            && segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !valid {
            return Err(StoreError::InvalidInput("invalid field path"));
        }
        out.push('.');
        out.push_str(segment);
    }
    Ok(out)
}

pub(super) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
