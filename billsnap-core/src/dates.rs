//! Bill date parsing and formatting.
//!
//! Dates are stored as `NaiveDate` and always serialized as `YYYY-MM-DD`.
//! The US slashed form is only a display concern, but it is still accepted
//! on input because older clients send it.

use chrono::NaiveDate;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_FORMAT: &str = "%m/%d/%Y";

/// How a date is rendered for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateDisplay {
    /// `2024-06-01`
    #[default]
    Iso,
    /// `06/01/2024`
    UsSlashed,
}

/// Parses a bill date in either `YYYY-MM-DD` or `MM/DD/YYYY`.
///
/// Surrounding whitespace is ignored. Returns `None` for anything else.
pub fn parse_bill_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(input, CANONICAL_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(input, DISPLAY_FORMAT))
        .ok()
}

pub fn to_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

pub fn format_for_display(date: NaiveDate, display: DateDisplay) -> String {
    match display {
        DateDisplay::Iso => to_canonical(date),
        DateDisplay::UsSlashed => date.format(DISPLAY_FORMAT).to_string(),
    }
}
