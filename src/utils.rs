use crate::error::{DashboardError, Result};
use crate::schema::FinancialYear;
use chrono::{Datelike, NaiveDate};

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Normalizes any date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// "%b %Y", e.g. "Mar 2023".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(DashboardError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// The financial year a date falls in, for a year ending in `fiscal_year_end_month`.
///
/// With the default June year end, June 30 2023 is in "2022.2023" and
/// July 1 2023 is in "2023.2024".
pub fn financial_year_for(date: NaiveDate, fiscal_year_end_month: u32) -> FinancialYear {
    if date.month() > fiscal_year_end_month {
        FinancialYear::new(date.year())
    } else {
        FinancialYear::new(date.year() - 1)
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Parses "YYYY-MM" or a month label such as "Mar 2023" into the month start.
pub fn parse_month(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("01 {}", trimmed), "%d %b %Y"))
        .map_err(|_| {
            DashboardError::DateError(format!(
                "Invalid month: {}. Expected YYYY-MM or 'Mon YYYY'",
                text
            ))
        })
}
