//! Date arithmetic behind day navigation and the month picker.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

/// The day after `date`, or `date` itself at the end of the representable range.
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

/// Header text for the selected day, e.g. "Tue Sep 24 2013".
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `delta` months away from the month containing `date`.
pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let first = first_of_month(date);
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        first.checked_add_months(months)
    } else {
        first.checked_sub_months(months)
    };
    shifted.unwrap_or(first)
}

/// Cells of a Sunday-first month view, padded with `None` to whole weeks.
pub fn month_grid(date: NaiveDate) -> Vec<Option<NaiveDate>> {
    let first = first_of_month(date);
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut cells: Vec<Option<NaiveDate>> = vec![None; leading];
    cells.extend(
        first
            .iter_days()
            .take_while(|d| d.month() == first.month())
            .map(Some),
    );
    while cells.len() % 7 != 0 {
        cells.push(None);
    }
    cells
}

pub const WEEKDAY_HEADERS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];
