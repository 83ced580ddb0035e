use crate::error::{DashboardError, Result};
use crate::schema::{DerivedRecord, FinancialYear, Metric, MetricTotals};
use crate::utils::MONTH_NAMES;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One financial year of a consultant on a Jan..Dec axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialYearSeries {
    pub financial_year: FinancialYear,
    /// Twelve slots, January first. `None` for months without records.
    pub months: Vec<Option<MetricTotals>>,
}

impl FinancialYearSeries {
    fn new(financial_year: FinancialYear) -> Self {
        Self {
            financial_year,
            months: vec![None; 12],
        }
    }

    pub fn values(&self, metric: Metric) -> Vec<Option<f64>> {
        self.months
            .iter()
            .map(|slot| slot.as_ref().and_then(|t| t.value(metric)))
            .collect()
    }

    pub fn total(&self, metric: Metric) -> Option<f64> {
        let mut combined: Option<MetricTotals> = None;
        for slot in self.months.iter().flatten() {
            combined.get_or_insert_with(MetricTotals::default).merge(slot);
        }
        combined.and_then(|t| t.value(metric))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialYearComparison {
    pub consultant: String,
    /// Oldest first; the most recent financial year is last.
    pub years: Vec<FinancialYearSeries>,
}

impl FinancialYearComparison {
    pub fn axis() -> Vec<&'static str> {
        MONTH_NAMES.to_vec()
    }

    pub fn most_recent(&self) -> Option<&FinancialYearSeries> {
        self.years.last()
    }

    pub fn get(&self, financial_year: FinancialYear) -> Option<&FinancialYearSeries> {
        self.years
            .iter()
            .find(|s| s.financial_year == financial_year)
    }
}

pub struct FinancialYearAligner;

impl FinancialYearAligner {
    /// Groups one consultant's records by financial year and lays each year
    /// over calendar month names, keeping the `max_years` most recent years.
    pub fn align(
        derived_records: &[DerivedRecord],
        consultant: &str,
        max_years: usize,
    ) -> Result<FinancialYearComparison> {
        let mut by_year: BTreeMap<FinancialYear, FinancialYearSeries> = BTreeMap::new();

        for record in derived_records.iter().filter(|r| r.consultant == consultant) {
            let series = by_year
                .entry(record.financial_year)
                .or_insert_with(|| FinancialYearSeries::new(record.financial_year));
            series.months[record.month.month0() as usize]
                .get_or_insert_with(MetricTotals::default)
                .add(record);
        }

        if by_year.is_empty() {
            return Err(DashboardError::UnknownConsultant(consultant.to_string()));
        }

        let skip = by_year.len().saturating_sub(max_years);
        Ok(FinancialYearComparison {
            consultant: consultant.to_string(),
            years: by_year.into_values().skip(skip).collect(),
        })
    }
}

pub fn align_by_financial_year(
    derived_records: &[DerivedRecord],
    consultant: &str,
    max_years: usize,
) -> Result<FinancialYearComparison> {
    FinancialYearAligner::align(derived_records, consultant, max_years)
}
