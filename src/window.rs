use crate::error::{DashboardError, Result};
use crate::schema::{DerivedRecord, Record};
use crate::utils::{month_label, parse_month};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Anything that belongs to a single month.
pub trait Dated {
    fn month(&self) -> NaiveDate;
}

impl Dated for Record {
    fn month(&self) -> NaiveDate {
        self.month
    }
}

impl Dated for DerivedRecord {
    fn month(&self) -> NaiveDate {
        self.month
    }
}

/// The ordered distinct months present in a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthAxis {
    months: Vec<NaiveDate>,
}

impl MonthAxis {
    pub fn from_records<T: Dated>(records: &[T]) -> Self {
        let months: BTreeSet<NaiveDate> = records.iter().map(Dated::month).collect();
        Self {
            months: months.into_iter().collect(),
        }
    }

    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.months.get(index).copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.months.last().copied()
    }

    pub fn index_of(&self, month: NaiveDate) -> Option<usize> {
        self.months.binary_search(&month).ok()
    }

    /// Resolves "YYYY-MM" or "Mon YYYY" to a month on this axis.
    pub fn find(&self, text: &str) -> Result<NaiveDate> {
        let month = parse_month(text)?;
        self.index_of(month)
            .map(|_| month)
            .ok_or_else(|| DashboardError::UnknownMonth(text.trim().to_string()))
    }

    pub fn labels(&self) -> Vec<String> {
        self.months.iter().copied().map(month_label).collect()
    }

    /// The trailing `months` months, or every month if fewer exist.
    pub fn default_window(&self, months: usize) -> Result<SelectionWindow> {
        if self.months.is_empty() {
            return Err(DashboardError::EmptyDataset);
        }
        let end = self.months.len() - 1;
        let start = self.months.len().saturating_sub(months.max(1));
        SelectionWindow::new(start, end, self.months.len())
    }

    pub fn full_window(&self) -> Result<SelectionWindow> {
        self.default_window(self.months.len())
    }
}

/// An inclusive range of indices into a [`MonthAxis`]. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct SelectionWindow {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
struct WindowBounds {
    start: usize,
    end: usize,
}

impl TryFrom<WindowBounds> for SelectionWindow {
    type Error = DashboardError;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        SelectionWindow::new(bounds.start, bounds.end, usize::MAX)
    }
}

impl SelectionWindow {
    pub fn new(start: usize, end: usize, len: usize) -> Result<Self> {
        if start > end || end >= len {
            return Err(DashboardError::InvalidRange { start, end, len });
        }
        Ok(Self { start, end })
    }

    /// Pulls both indices into bounds; a start past the end collapses onto the end.
    pub fn clamped(start: usize, end: usize, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(DashboardError::EmptyDataset);
        }
        let end = end.min(len - 1);
        let start = start.min(end);
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn month_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn bounds(&self, axis: &MonthAxis) -> Result<(NaiveDate, NaiveDate)> {
        match (axis.get(self.start), axis.get(self.end)) {
            (Some(first), Some(last)) => Ok((first, last)),
            _ => Err(DashboardError::InvalidRange {
                start: self.start,
                end: self.end,
                len: axis.len(),
            }),
        }
    }

    pub fn label(&self, axis: &MonthAxis) -> Result<String> {
        let (first, last) = self.bounds(axis)?;
        Ok(format!(
            "Months selected: {} - {}",
            month_label(first),
            month_label(last)
        ))
    }
}

/// Records whose month lies between `months_ordered[start]` and
/// `months_ordered[end]`, both inclusive, in input order.
pub fn filter<'a, T: Dated>(
    records: &'a [T],
    start: usize,
    end: usize,
    months_ordered: &MonthAxis,
) -> Result<Vec<&'a T>> {
    let window = SelectionWindow::new(start, end, months_ordered.len())?;
    filter_window(records, window, months_ordered)
}

pub fn filter_window<'a, T: Dated>(
    records: &'a [T],
    window: SelectionWindow,
    months_ordered: &MonthAxis,
) -> Result<Vec<&'a T>> {
    let (first, last) = window.bounds(months_ordered)?;
    let selected: Vec<&T> = records
        .iter()
        .filter(|r| r.month() >= first && r.month() <= last)
        .collect();
    debug!(
        "Window {}..={} ({} to {}) keeps {} of {} records",
        window.start,
        window.end,
        first,
        last,
        selected.len(),
        records.len()
    );
    Ok(selected)
}
