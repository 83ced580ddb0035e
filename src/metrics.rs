use crate::config::MissingRatePolicy;
use crate::error::{DashboardError, Result};
use crate::rates::RateResolver;
use crate::schema::{DerivedRecord, RateRule, Record};
use crate::utils::{financial_year_for, month_label, month_start};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A record that could not be priced and how the policy handled it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationWarning {
    pub index: usize,
    pub consultant: String,
    pub month: NaiveDate,
    pub action: MissingRatePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Derivation {
    pub records: Vec<DerivedRecord>,
    pub warnings: Vec<DerivationWarning>,
}

pub struct MetricsDeriver<'a> {
    resolver: &'a RateResolver,
    fiscal_year_end_month: u32,
    policy: MissingRatePolicy,
}

impl<'a> MetricsDeriver<'a> {
    pub fn new(resolver: &'a RateResolver, fiscal_year_end_month: u32) -> Self {
        Self {
            resolver,
            fiscal_year_end_month,
            policy: MissingRatePolicy::Abort,
        }
    }

    pub fn with_policy(mut self, policy: MissingRatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Derives one record. The service fee comes from the rule in force on
    /// the record's month.
    pub fn derive_record(&self, record: &Record) -> Result<DerivedRecord> {
        let month = month_start(record.month);
        let rule = self.resolver.resolve(&record.consultant, month)?;
        Ok(self.build(record, month, rule.service_fee(record.commission)))
    }

    fn build(&self, record: &Record, month: NaiveDate, service_fee: f64) -> DerivedRecord {
        let margin = if record.gross_sales == 0.0 {
            None
        } else {
            Some(100.0 * record.commission / record.gross_sales)
        };

        DerivedRecord {
            month,
            consultant: record.consultant.clone(),
            gross_sales: record.gross_sales,
            cost_of_sales: record.cost_of_sales,
            commission: record.commission,
            service_fee,
            commission_paid: record.commission - service_fee,
            margin,
            month_label: month_label(month),
            financial_year: financial_year_for(month, self.fiscal_year_end_month),
        }
    }

    /// Derives every record in input order, applying the missing-rate policy.
    pub fn derive_all(&self, records: &[Record]) -> Result<Derivation> {
        let mut derivation = Derivation {
            records: Vec::with_capacity(records.len()),
            warnings: Vec::new(),
        };

        for (index, record) in records.iter().enumerate() {
            match self.derive_record(record) {
                Ok(derived) => derivation.records.push(derived),
                Err(DashboardError::NoApplicableRate { consultant, date }) => {
                    match self.policy {
                        MissingRatePolicy::Abort => {
                            return Err(DashboardError::NoApplicableRate { consultant, date })
                        }
                        MissingRatePolicy::Skip => {
                            warn!(
                                "Skipping record #{} ({} {}): no rate rule on or before that date",
                                index, consultant, date
                            );
                        }
                        MissingRatePolicy::ZeroFee => {
                            warn!(
                                "Record #{} ({} {}) has no rate rule; using a zero service fee",
                                index, consultant, date
                            );
                            derivation
                                .records
                                .push(self.build(record, month_start(record.month), 0.0));
                        }
                    }
                    derivation.warnings.push(DerivationWarning {
                        index,
                        consultant,
                        month: date,
                        action: self.policy,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        debug!(
            "Derived {} of {} records ({} warnings)",
            derivation.records.len(),
            records.len(),
            derivation.warnings.len()
        );

        Ok(derivation)
    }
}

/// Derives all records against `rules` with July-June financial years,
/// failing on the first record without an applicable rate.
pub fn derive(records: &[Record], rules: &[RateRule]) -> Result<Vec<DerivedRecord>> {
    let resolver = RateResolver::new(rules);
    let derivation = MetricsDeriver::new(&resolver, 6).derive_all(records)?;
    Ok(derivation.records)
}
