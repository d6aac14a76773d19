use chrono::{DateTime, Datelike, NaiveDate};

use crate::errors::{LedgerError, Result};

/// Whole calendar months from `from` to `to`.
///
/// The raw month difference loses one month while the day of month of `to`
/// has not reached that of `from`; never negative.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// parse `YYYY-MM-DD` or an RFC 3339 timestamp, keeping the calendar date
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|e| LedgerError::InvalidDate {
            message: format!("{:?}: {}", s, e),
        })
}

/// [`whole_months_between`] over ISO strings; unparseable input counts as zero months
pub fn months_between_iso(from: &str, to: &str) -> u32 {
    match (parse_iso_date(from), parse_iso_date(to)) {
        (Ok(from), Ok(to)) => whole_months_between(from, to),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(from, to, error = %e, "unparseable date, counting zero months");
            0
        }
    }
}
