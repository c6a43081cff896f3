//! Date validators applied when borrow requests are accepted.
//!
//! Both predicates treat an absent value as valid: presence is checked
//! separately by the `required` rules on the input structs, so a missing
//! date is reported exactly once.

use std::borrow::Cow;

use chrono::{Local, NaiveDate};
use validator::ValidationError;

/// Current date in the process's local time zone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Valid when absent, or when the date is today or later
pub fn not_past_date(value: Option<NaiveDate>) -> bool {
    not_past_date_on(value, today())
}

/// [`not_past_date`] against an explicit reference date
pub fn not_past_date_on(value: Option<NaiveDate>, today: NaiveDate) -> bool {
    match value {
        Some(date) => date >= today,
        None => true,
    }
}

/// Valid when either bound is absent, or when the return date is strictly
/// after the borrow date. Same-day returns are invalid.
pub fn valid_date_range(borrow_date: Option<NaiveDate>, return_date: Option<NaiveDate>) -> bool {
    match (borrow_date, return_date) {
        (Some(borrow), Some(ret)) => ret > borrow,
        _ => true,
    }
}

/// Build a `ValidationError` carrying a human readable message
pub fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}
