use chrono::{DateTime, NaiveDateTime, Utc};

/// Pattern used for every stored timestamp. Always interpreted as UTC.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

pub fn from_storage(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, STORAGE_FORMAT)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
