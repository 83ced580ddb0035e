use crate::error::{DashboardError, Result};
use crate::schema::Metric;
use crate::utils::validate_fiscal_year_end_month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What to do with a record whose date predates every applicable rate rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatePolicy {
    #[default]
    #[schemars(description = "Fail the whole derivation with NoApplicableRate")]
    Abort,

    #[schemars(description = "Drop the record and log a warning")]
    Skip,

    #[schemars(description = "Keep the record with a zero service fee and log a warning")]
    ZeroFee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(description = "Metrics selectable on the primary chart and the monthly snapshot")]
    pub primary_metrics: Vec<Metric>,

    #[schemars(description = "Metrics plotted on the single consultant history and drill-down")]
    pub history_metrics: Vec<Metric>,

    #[schemars(description = "Metrics stacked on the year-to-date view")]
    pub ytd_metrics: Vec<Metric>,

    #[schemars(description = "Year-to-date consultants are ordered by this metric, descending")]
    pub ytd_sort_metric: Metric,

    #[schemars(description = "Metrics selectable on the financial year comparison")]
    pub comparison_metrics: Vec<Metric>,

    pub top_n: usize,

    #[schemars(description = "Length of the trailing month window selected on start")]
    pub default_window_months: usize,

    #[schemars(description = "How many of the most recent financial years to compare")]
    pub max_financial_years: usize,

    #[schemars(description = "1 = January ... 12 = December. 6 gives July-June years.")]
    pub fiscal_year_end_month: u32,

    pub missing_rate_policy: MissingRatePolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            primary_metrics: vec![Metric::GrossSales, Metric::Commission, Metric::ServiceFee],
            history_metrics: vec![Metric::GrossSales, Metric::Commission, Metric::ServiceFee],
            ytd_metrics: vec![
                Metric::ServiceFee,
                Metric::CommissionPaid,
                Metric::CostOfSales,
            ],
            ytd_sort_metric: Metric::ServiceFee,
            comparison_metrics: vec![Metric::GrossSales, Metric::Commission, Metric::ServiceFee],
            top_n: 5,
            default_window_months: 12,
            max_financial_years: 5,
            fiscal_year_end_month: 6,
            missing_rate_policy: MissingRatePolicy::Abort,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(DashboardConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    pub fn validate(&self) -> Result<()> {
        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;

        for (name, metrics) in [
            ("primary_metrics", &self.primary_metrics),
            ("history_metrics", &self.history_metrics),
            ("ytd_metrics", &self.ytd_metrics),
            ("comparison_metrics", &self.comparison_metrics),
        ] {
            if metrics.is_empty() {
                return Err(DashboardError::InvalidConfig(format!(
                    "{} must name at least one metric",
                    name
                )));
            }
        }

        if !self.ytd_metrics.contains(&self.ytd_sort_metric) {
            return Err(DashboardError::InvalidConfig(format!(
                "ytd_sort_metric '{}' is not one of ytd_metrics",
                self.ytd_sort_metric
            )));
        }

        for (name, value) in [
            ("top_n", self.top_n),
            ("default_window_months", self.default_window_months),
            ("max_financial_years", self.max_financial_years),
        ] {
            if value == 0 {
                return Err(DashboardError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
