//! # Consultant Dashboard
//!
//! Derives fee, commission and margin figures for per-consultant monthly
//! sales and reshapes them into the linked views of a performance dashboard.
//!
//! ## Core Concepts
//!
//! - **Rate schedule**: effective-dated service fee rules per consultant, with a
//!   `DEFAULT` schedule used when a consultant has no rule of their own yet
//! - **Derived records**: each month's sales plus service fee, commission paid,
//!   margin, month label and July-June financial year, computed once
//! - **Pivots**: derived records summed per (month | financial year | calendar
//!   year, consultant); a missing cell means no activity, never zero
//! - **Selection**: the date window, top-N ranking and drill-down of one
//!   session. The ranked set that drew a chart travels with it, so a hover
//!   always resolves to the consultant whose trace was hovered
//!
//! ## Example
//!
//! ```rust,ignore
//! use consultant_dashboard::*;
//! use std::sync::Arc;
//!
//! let dataset = Arc::new(Dataset::new(&records, &rules, DashboardConfig::default())?);
//! let mut session = DashboardSession::new(dataset)?;
//! session.set_top_n(true);
//!
//! let primary = session.render_primary(Some(2))?;
//! let margin = session.render_margin(&primary, Some(2))?;
//! println!("{} / {}", primary.view.title, margin.title);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod financial_year;
pub mod ingestion;
pub mod metrics;
pub mod pivot;
pub mod ranking;
pub mod rates;
pub mod schema;
pub mod selection;
pub mod session;
pub mod utils;
pub mod views;
pub mod window;

pub use cache::PivotCache;
pub use config::{DashboardConfig, MissingRatePolicy};
pub use error::{DashboardError, Result};
pub use financial_year::{
    align_by_financial_year, FinancialYearAligner, FinancialYearComparison, FinancialYearSeries,
};
pub use ingestion::*;
pub use metrics::{derive, Derivation, DerivationWarning, MetricsDeriver};
pub use pivot::{pivot, PivotTable, Pivoter, TimeBucket};
pub use ranking::{top_n, RankSelector, RankedEntry, RankedSet};
pub use rates::RateResolver;
pub use schema::*;
pub use selection::{resolve_entity, ChartMode, Selection, SelectionCorrelator};
pub use session::{DashboardSession, PrimaryChart};
pub use views::{Annotation, ChartView, Trace};
pub use window::{filter, filter_window, Dated, MonthAxis, SelectionWindow};

use chrono::Datelike;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// The derived records of one load, with the axes every view is built on.
///
/// Immutable after construction; share it between sessions behind an `Arc`.
#[derive(Debug)]
pub struct Dataset {
    config: DashboardConfig,
    records: Vec<DerivedRecord>,
    warnings: Vec<DerivationWarning>,
    months: MonthAxis,
    consultants: Vec<String>,
    years: Vec<i32>,
    financial_years: Vec<FinancialYear>,
    generation: u64,
}

impl Dataset {
    pub fn new(records: &[Record], rules: &[RateRule], config: DashboardConfig) -> Result<Self> {
        config.validate()?;

        let resolver = RateResolver::new(rules);
        if !resolver.has_default() {
            warn!(
                "No {} rate schedule; consultants without a rule of their own cannot be priced",
                DEFAULT_CONSULTANT
            );
        }
        debug!(
            "Deriving {} records against {} rate rules",
            records.len(),
            resolver.len()
        );

        let derivation = MetricsDeriver::new(&resolver, config.fiscal_year_end_month)
            .with_policy(config.missing_rate_policy)
            .derive_all(records)?;

        if derivation.records.is_empty() {
            return Err(DashboardError::EmptyDataset);
        }

        let months = MonthAxis::from_records(&derivation.records);
        let consultants: BTreeSet<String> = derivation
            .records
            .iter()
            .map(|r| r.consultant.clone())
            .collect();
        let years: BTreeSet<i32> = derivation.records.iter().map(|r| r.month.year()).collect();
        let financial_years: BTreeSet<FinancialYear> = derivation
            .records
            .iter()
            .map(|r| r.financial_year)
            .collect();

        info!(
            "Loaded {} records for {} consultants over {} months",
            derivation.records.len(),
            consultants.len(),
            months.len()
        );

        Ok(Self {
            config,
            records: derivation.records,
            warnings: derivation.warnings,
            months,
            consultants: consultants.into_iter().collect(),
            years: years.into_iter().collect(),
            financial_years: financial_years.into_iter().collect(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn from_rows(
        sales: &[SalesRow],
        rates: &[RateRow],
        config: DashboardConfig,
    ) -> Result<Self> {
        Self::new(&records_from_rows(sales), &rules_from_rows(rates), config)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn records(&self) -> &[DerivedRecord] {
        &self.records
    }

    /// Records skipped or zero-fee'd by the missing-rate policy.
    pub fn warnings(&self) -> &[DerivationWarning] {
        &self.warnings
    }

    pub fn months(&self) -> &MonthAxis {
        &self.months
    }

    /// Alphabetical.
    pub fn consultants(&self) -> &[String] {
        &self.consultants
    }

    pub fn contains_consultant(&self, consultant: &str) -> bool {
        self.consultants
            .binary_search_by(|c| c.as_str().cmp(consultant))
            .is_ok()
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn financial_years(&self) -> &[FinancialYear] {
        &self.financial_years
    }

    /// Identifies this load; caches built from another generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn default_window(&self) -> Result<SelectionWindow> {
        self.months.default_window(self.config.default_window_months)
    }

    pub fn window_records(&self, window: SelectionWindow) -> Result<Vec<&DerivedRecord>> {
        filter_window(&self.records, window, &self.months)
    }

    /// 100 * total commission / total gross sales over the window, to one
    /// decimal place. `None` when the window has no gross sales.
    pub fn overall_margin(&self, window: SelectionWindow) -> Result<Option<f64>> {
        let totals: MetricTotals = self.window_records(window)?.into_iter().collect();
        Ok(totals.margin().map(|m| utils::round_to(m, 1)))
    }
}
