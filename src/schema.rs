use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel consultant name for the fallback fee schedule.
pub const DEFAULT_CONSULTANT: &str = "DEFAULT";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub enum Metric {
    #[serde(rename = "Gross sales")]
    #[schemars(description = "Total value of sales booked by the consultant in the month")]
    GrossSales,

    #[serde(rename = "Cost of sales")]
    #[schemars(description = "Direct cost of the sales booked in the month")]
    CostOfSales,

    #[serde(rename = "Commission")]
    #[schemars(description = "Commission earned on the month's sales, before service fees")]
    Commission,

    #[serde(rename = "Service fee")]
    #[schemars(description = "Flat plus percentage fee charged against the commission")]
    ServiceFee,

    #[serde(rename = "Commission paid")]
    #[schemars(description = "Commission left after the service fee is deducted")]
    CommissionPaid,

    #[serde(rename = "Margin")]
    #[schemars(
        description = "Commission as a percentage of gross sales. Undefined when gross sales are zero."
    )]
    Margin,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::GrossSales,
        Metric::CostOfSales,
        Metric::Commission,
        Metric::ServiceFee,
        Metric::CommissionPaid,
        Metric::Margin,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::GrossSales => "Gross sales",
            Metric::CostOfSales => "Cost of sales",
            Metric::Commission => "Commission",
            Metric::ServiceFee => "Service fee",
            Metric::CommissionPaid => "Commission paid",
            Metric::Margin => "Margin",
        }
    }

    /// Decimal places used when a value of this metric is shown.
    pub fn display_precision(&self) -> u32 {
        match self {
            Metric::Margin => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One consultant's sales for one month, as loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    #[schemars(description = "First day of the month the sales belong to")]
    pub month: NaiveDate,
    pub consultant: String,
    pub gross_sales: f64,
    pub cost_of_sales: f64,
    pub commission: f64,
}

/// A fee schedule entry, effective from `effective_date` until superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RateRule {
    #[schemars(description = "Consultant name, or DEFAULT for the fallback schedule")]
    pub consultant: String,
    pub effective_date: NaiveDate,
    pub flat_fee: f64,
    #[schemars(description = "Percentage of commission, e.g. 5.0 for 5%")]
    pub pct_fee: f64,
}

impl RateRule {
    pub fn service_fee(&self, commission: f64) -> f64 {
        self.flat_fee + self.pct_fee * commission / 100.0
    }

    pub fn is_default(&self) -> bool {
        self.consultant == DEFAULT_CONSULTANT
    }
}

/// A July-June style accounting year, identified by the calendar year it starts in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct FinancialYear {
    pub start_year: i32,
}

impl FinancialYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.start_year, self.end_year())
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.start_year, self.end_year())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedRecord {
    pub month: NaiveDate,
    pub consultant: String,
    pub gross_sales: f64,
    pub cost_of_sales: f64,
    pub commission: f64,
    pub service_fee: f64,
    pub commission_paid: f64,
    /// `None` when gross sales are zero.
    pub margin: Option<f64>,
    /// e.g. "Mar 2023"
    pub month_label: String,
    pub financial_year: FinancialYear,
}

impl DerivedRecord {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::GrossSales => Some(self.gross_sales),
            Metric::CostOfSales => Some(self.cost_of_sales),
            Metric::Commission => Some(self.commission),
            Metric::ServiceFee => Some(self.service_fee),
            Metric::CommissionPaid => Some(self.commission_paid),
            Metric::Margin => self.margin,
        }
    }

    /// Copy with money rounded to whole units and margin to one decimal place.
    pub fn rounded(&self) -> DerivedRecord {
        use crate::utils::round_to;
        DerivedRecord {
            gross_sales: round_to(self.gross_sales, 0),
            cost_of_sales: round_to(self.cost_of_sales, 0),
            commission: round_to(self.commission, 0),
            service_fee: round_to(self.service_fee, 0),
            commission_paid: round_to(self.commission_paid, 0),
            margin: self.margin.map(|m| round_to(m, 1)),
            ..self.clone()
        }
    }
}

/// Running sums for a group of derived records.
///
/// Margin is not summed; it is recomputed from the summed commission and
/// gross sales so every aggregation level agrees with the record level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub gross_sales: f64,
    pub cost_of_sales: f64,
    pub commission: f64,
    pub service_fee: f64,
    pub commission_paid: f64,
    pub record_count: usize,
}

impl MetricTotals {
    pub fn add(&mut self, record: &DerivedRecord) {
        self.gross_sales += record.gross_sales;
        self.cost_of_sales += record.cost_of_sales;
        self.commission += record.commission;
        self.service_fee += record.service_fee;
        self.commission_paid += record.commission_paid;
        self.record_count += 1;
    }

    pub fn merge(&mut self, other: &MetricTotals) {
        self.gross_sales += other.gross_sales;
        self.cost_of_sales += other.cost_of_sales;
        self.commission += other.commission;
        self.service_fee += other.service_fee;
        self.commission_paid += other.commission_paid;
        self.record_count += other.record_count;
    }

    pub fn margin(&self) -> Option<f64> {
        if self.gross_sales == 0.0 {
            None
        } else {
            Some(100.0 * self.commission / self.gross_sales)
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::GrossSales => Some(self.gross_sales),
            Metric::CostOfSales => Some(self.cost_of_sales),
            Metric::Commission => Some(self.commission),
            Metric::ServiceFee => Some(self.service_fee),
            Metric::CommissionPaid => Some(self.commission_paid),
            Metric::Margin => self.margin(),
        }
    }
}

impl<'a> FromIterator<&'a DerivedRecord> for MetricTotals {
    fn from_iter<I: IntoIterator<Item = &'a DerivedRecord>>(iter: I) -> Self {
        let mut totals = MetricTotals::default();
        for record in iter {
            totals.add(record);
        }
        totals
    }
}

/// What a pivot groups rows by along the time axis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeKey {
    Month,
    FinancialYear,
    CalendarYear,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(gross: f64, commission: f64) -> DerivedRecord {
        DerivedRecord {
            month: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            consultant: "Alice".to_string(),
            gross_sales: gross,
            cost_of_sales: 1234.4,
            commission,
            service_fee: 60.4,
            commission_paid: commission - 60.4,
            margin: if gross == 0.0 {
                None
            } else {
                Some(100.0 * commission / gross)
            },
            month_label: "Mar 2023".to_string(),
            financial_year: FinancialYear::new(2022),
        }
    }

    #[test]
    fn test_metric_serializes_with_column_label() {
        let json = serde_json::to_string(&Metric::CommissionPaid).unwrap();
        assert_eq!(json, "\"Commission paid\"");
        let back: Metric = serde_json::from_str("\"Gross sales\"").unwrap();
        assert_eq!(back, Metric::GrossSales);
        for metric in Metric::ALL {
            assert_eq!(metric.to_string(), metric.label());
        }
    }

    #[test]
    fn test_financial_year_label() {
        assert_eq!(FinancialYear::new(2022).label(), "2022.2023");
        assert_eq!(FinancialYear::new(2022).to_string(), "2022.2023");
        assert!(FinancialYear::new(2021) < FinancialYear::new(2022));
    }

    #[test]
    fn test_rounded_keeps_raw_record_untouched() {
        let record = sample(3000.0, 1000.0);
        let display = record.rounded();
        assert_eq!(display.cost_of_sales, 1234.0);
        assert_eq!(display.service_fee, 60.0);
        assert_eq!(display.margin, Some(33.3));
        assert_eq!(record.service_fee, 60.4);
    }

    #[test]
    fn test_totals_recompute_margin() {
        let records = [sample(5000.0, 1000.0), sample(0.0, 500.0)];
        let totals: MetricTotals = records.iter().collect();
        assert_eq!(totals.record_count, 2);
        assert!((totals.value(Metric::Commission).unwrap() - 1500.0).abs() < 1e-9);
        assert!((totals.margin().unwrap() - 30.0).abs() < 1e-9);

        let empty = MetricTotals::default();
        assert_eq!(empty.margin(), None);
    }
}
