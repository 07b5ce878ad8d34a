use chrono::{DateTime, TimeZone, Utc};
use pdata_core::{CoreError, Entity, Record, attr};

pub fn ts(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .expect("valid fixture timestamp")
}

/// A record that has never been stored.
pub fn draft(memo: &str, created: DateTime<Utc>) -> Record {
    Record::new().with_memo(memo).with_created(created)
}

/// A record as it looks after being read back from the store.
pub fn loaded(id: &str, memo: &str, created: DateTime<Utc>) -> Result<Record, CoreError> {
    Ok(Record::new()
        .with_id(id)?
        .with_memo(memo)
        .with_created(created)
        .with_attr(attr::PERSISTED, true)
        .with_attr(attr::DIRTY, false))
}
