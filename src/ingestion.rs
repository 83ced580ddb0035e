use crate::schema::{RateRule, Record};
use crate::utils::month_start;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A row of the sales table as supplied by an external loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRow {
    #[serde(rename = "Month")]
    pub month: NaiveDate,
    #[serde(rename = "Consultant")]
    pub consultant: String,
    #[serde(rename = "Gross sales")]
    pub gross_sales: f64,
    #[serde(rename = "Cost of sales")]
    pub cost_of_sales: f64,
    #[serde(rename = "Commission")]
    pub commission: f64,
}

/// A row of the service fee rate table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRow {
    #[serde(rename = "Consultant")]
    pub consultant: String,
    #[serde(rename = "Date_applied")]
    pub date_applied: NaiveDate,
    #[serde(rename = "SF_flat")]
    pub sf_flat: f64,
    #[serde(rename = "SF_pct")]
    pub sf_pct: f64,
}

impl From<&SalesRow> for Record {
    fn from(row: &SalesRow) -> Self {
        Record {
            month: month_start(row.month),
            consultant: row.consultant.trim().to_string(),
            gross_sales: row.gross_sales,
            cost_of_sales: row.cost_of_sales,
            commission: row.commission,
        }
    }
}

impl From<&RateRow> for RateRule {
    fn from(row: &RateRow) -> Self {
        RateRule {
            consultant: row.consultant.trim().to_string(),
            effective_date: row.date_applied,
            flat_fee: row.sf_flat,
            pct_fee: row.sf_pct,
        }
    }
}

pub fn records_from_rows(rows: &[SalesRow]) -> Vec<Record> {
    rows.iter().map(Record::from).collect()
}

/// Table order is preserved; it decides between rules sharing a date.
pub fn rules_from_rows(rows: &[RateRow]) -> Vec<RateRule> {
    rows.iter().map(RateRule::from).collect()
}
