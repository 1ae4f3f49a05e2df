use chrono::{Days, Local, NaiveDate};

/// Today's date on the local clock.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// The `count` calendar days before `today`, oldest first.
///
/// The last entry is always yesterday. Month and year boundaries are handled
/// by the calendar arithmetic.
pub fn past_dates(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (1..=u64::from(count))
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

/// Format as the API's `dt` parameter (`YYYY-MM-DD`).
pub fn api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
