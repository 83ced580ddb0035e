use crate::error::{DashboardError, Result};
use crate::schema::{DerivedRecord, FinancialYear, Metric, MetricTotals, TimeKey};
use crate::utils::month_label;
use crate::window::{MonthAxis, SelectionWindow};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One position on a pivot's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeBucket {
    Month(NaiveDate),
    FinancialYear(FinancialYear),
    CalendarYear(i32),
}

impl TimeBucket {
    pub fn of(record: &DerivedRecord, key: TimeKey) -> Self {
        match key {
            TimeKey::Month => TimeBucket::Month(record.month),
            TimeKey::FinancialYear => TimeBucket::FinancialYear(record.financial_year),
            TimeKey::CalendarYear => TimeBucket::CalendarYear(record.month.year()),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Month(month) => f.write_str(&month_label(*month)),
            TimeBucket::FinancialYear(fy) => write!(f, "{}", fy),
            TimeBucket::CalendarYear(year) => write!(f, "{}", year),
        }
    }
}

/// Derived records summed per (time bucket, consultant).
///
/// A combination with no records has no cell; lookups for it return `None`
/// rather than zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    time_key: TimeKey,
    metrics: Vec<Metric>,
    buckets: Vec<TimeBucket>,
    entities: Vec<String>,
    cells: BTreeMap<TimeBucket, BTreeMap<String, MetricTotals>>,
}

pub struct Pivoter;

impl Pivoter {
    pub fn pivot<'a, I>(records: I, metrics: &[Metric], time_key: TimeKey) -> Result<PivotTable>
    where
        I: IntoIterator<Item = &'a DerivedRecord>,
    {
        let metrics = normalize_metrics(metrics)?;
        let mut cells: BTreeMap<TimeBucket, BTreeMap<String, MetricTotals>> = BTreeMap::new();

        for record in records {
            cells
                .entry(TimeBucket::of(record, time_key))
                .or_default()
                .entry(record.consultant.clone())
                .or_default()
                .add(record);
        }

        Ok(PivotTable::from_cells(time_key, metrics, cells))
    }
}

/// Shorthand for [`Pivoter::pivot`] over an owned record slice.
pub fn pivot(
    derived_records: &[DerivedRecord],
    metrics: &[Metric],
    time_key: TimeKey,
) -> Result<PivotTable> {
    Pivoter::pivot(derived_records, metrics, time_key)
}

fn normalize_metrics(metrics: &[Metric]) -> Result<Vec<Metric>> {
    if metrics.is_empty() {
        return Err(DashboardError::InvalidConfig(
            "a pivot needs at least one metric".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    Ok(metrics.iter().copied().filter(|m| seen.insert(*m)).collect())
}

impl PivotTable {
    fn from_cells(
        time_key: TimeKey,
        metrics: Vec<Metric>,
        cells: BTreeMap<TimeBucket, BTreeMap<String, MetricTotals>>,
    ) -> Self {
        let entities: BTreeSet<String> = cells
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect();
        Self {
            time_key,
            metrics,
            buckets: cells.keys().copied().collect(),
            entities: entities.into_iter().collect(),
            cells,
        }
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Chronological.
    pub fn buckets(&self) -> &[TimeBucket] {
        &self.buckets
    }

    /// Alphabetical.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.entities.binary_search_by(|e| e.as_str().cmp(entity)).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn totals(&self, bucket: &TimeBucket, entity: &str) -> Option<&MetricTotals> {
        self.cells.get(bucket).and_then(|row| row.get(entity))
    }

    pub fn get(&self, bucket: &TimeBucket, entity: &str, metric: Metric) -> Option<f64> {
        if !self.has_metric(metric) {
            return None;
        }
        self.totals(bucket, entity).and_then(|t| t.value(metric))
    }

    /// One value per bucket, `None` where the consultant had no records.
    pub fn series(&self, entity: &str, metric: Metric) -> Vec<Option<f64>> {
        self.buckets
            .iter()
            .map(|bucket| self.get(bucket, entity, metric))
            .collect()
    }

    /// Everything the consultant booked across the pivot's buckets.
    pub fn entity_totals(&self, entity: &str) -> Option<MetricTotals> {
        let mut combined: Option<MetricTotals> = None;
        for row in self.cells.values() {
            if let Some(cell) = row.get(entity) {
                combined.get_or_insert_with(MetricTotals::default).merge(cell);
            }
        }
        combined
    }

    /// Window total of one metric for one consultant. Margin is recomputed
    /// from the summed commission and gross sales.
    pub fn entity_total(&self, entity: &str, metric: Metric) -> Option<f64> {
        if !self.has_metric(metric) {
            return None;
        }
        self.entity_totals(entity).and_then(|t| t.value(metric))
    }

    /// Totals across every consultant and bucket.
    pub fn grand_totals(&self) -> MetricTotals {
        let mut combined = MetricTotals::default();
        for cell in self.cells.values().flat_map(BTreeMap::values) {
            combined.merge(cell);
        }
        combined
    }

    /// The months of `window` on `axis`.
    pub fn slice(&self, window: SelectionWindow, axis: &MonthAxis) -> Result<PivotTable> {
        let (first, last) = window.bounds(axis)?;
        self.slice_months(first, last)
    }

    /// The part of a monthly pivot between two months, inclusive. Consultants
    /// with no records inside the range are dropped, so the result equals a
    /// pivot of the filtered records.
    pub fn slice_months(&self, first: NaiveDate, last: NaiveDate) -> Result<PivotTable> {
        if self.time_key != TimeKey::Month {
            return Err(DashboardError::InvalidConfig(format!(
                "only monthly pivots can be sliced by month, this one is keyed by {:?}",
                self.time_key
            )));
        }
        if first > last {
            return Err(DashboardError::DateError(format!(
                "slice start {} is after slice end {}",
                first, last
            )));
        }
        let cells = self
            .cells
            .range(TimeBucket::Month(first)..=TimeBucket::Month(last))
            .map(|(bucket, row)| (*bucket, row.clone()))
            .collect();
        Ok(PivotTable::from_cells(self.time_key, self.metrics.clone(), cells))
    }
}
