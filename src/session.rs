use crate::cache::PivotCache;
use crate::error::{DashboardError, Result};
use crate::financial_year::FinancialYearAligner;
use crate::pivot::{PivotTable, TimeBucket};
use crate::ranking::RankSelector;
use crate::schema::{Metric, TimeKey};
use crate::selection::{ChartMode, SelectionCorrelator};
use crate::views::{self, ChartView};
use crate::window::SelectionWindow;
use crate::Dataset;
use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

/// A rendered primary chart together with the layout that produced it.
///
/// Hovers on this chart must be resolved against `mode`, never against a
/// freshly recomputed ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryChart {
    pub view: ChartView,
    pub mode: ChartMode,
    pub window: SelectionWindow,
    pub metric: Metric,
}

/// One user's filters over a shared dataset.
#[derive(Debug)]
pub struct DashboardSession {
    dataset: Arc<Dataset>,
    window: SelectionWindow,
    metric: Metric,
    top_n: bool,
    drill_down: Option<String>,
    cache: PivotCache,
}

impl DashboardSession {
    pub fn new(dataset: Arc<Dataset>) -> Result<Self> {
        let window = dataset.default_window()?;
        let metric = dataset
            .config()
            .primary_metrics
            .first()
            .copied()
            .ok_or_else(|| DashboardError::InvalidConfig("no primary metrics".to_string()))?;

        Ok(Self {
            dataset,
            window,
            metric,
            top_n: false,
            drill_down: None,
            cache: PivotCache::new(),
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn window(&self) -> SelectionWindow {
        self.window
    }

    pub fn window_label(&self) -> Result<String> {
        self.window.label(self.dataset.months())
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn drilled_down(&self) -> Option<&str> {
        self.drill_down.as_deref()
    }

    /// Rejects a bad range and keeps the current window.
    pub fn set_window(&mut self, start: usize, end: usize) -> Result<SelectionWindow> {
        self.window = SelectionWindow::new(start, end, self.dataset.months().len())?;
        Ok(self.window)
    }

    /// Accepts any range, clamping it into the available months.
    pub fn set_window_clamped(&mut self, start: usize, end: usize) -> Result<SelectionWindow> {
        let window = SelectionWindow::clamped(start, end, self.dataset.months().len())?;
        if (window.start(), window.end()) != (start, end) {
            debug!("Clamped window {}..={} to {:?}", start, end, window);
        }
        self.window = window;
        Ok(window)
    }

    pub fn set_metric(&mut self, metric: Metric) -> Result<()> {
        if !self.dataset.config().primary_metrics.contains(&metric) {
            return Err(DashboardError::InvalidConfig(format!(
                "'{}' is not a primary chart metric",
                metric
            )));
        }
        self.metric = metric;
        Ok(())
    }

    pub fn set_top_n(&mut self, enabled: bool) {
        self.top_n = enabled;
    }

    /// Switches the primary chart to a single consultant, or back with `None`.
    pub fn drill_down(&mut self, consultant: Option<&str>) -> Result<()> {
        match consultant {
            Some(name) if !self.dataset.contains_consultant(name) => {
                Err(DashboardError::UnknownConsultant(name.to_string()))
            }
            _ => {
                self.drill_down = consultant.map(str::to_string);
                Ok(())
            }
        }
    }

    fn window_pivot(&mut self, window: SelectionWindow) -> Result<&PivotTable> {
        self.cache
            .get_or_build(&self.dataset, window, TimeKey::Month, &Metric::ALL)
    }

    /// Builds the primary chart for the current filters.
    pub fn render_primary(&mut self, hover: Option<usize>) -> Result<PrimaryChart> {
        let window = self.window;
        let metric = self.metric;
        let top_n = self.top_n.then_some(self.dataset.config().top_n);
        let drill_down = self.drill_down.clone();
        let history_metrics = self.dataset.config().history_metrics.clone();

        let pivot = self.window_pivot(window)?;
        let mode = match (drill_down, top_n) {
            (Some(entity), _) => ChartMode::Single {
                entity,
                metrics: history_metrics,
            },
            (None, Some(n)) => ChartMode::TopN(RankSelector::top_n(pivot, metric, n)?),
            (None, None) => ChartMode::all(pivot),
        };
        let view = views::primary_chart(pivot, &mode, metric, hover);

        Ok(PrimaryChart {
            view,
            mode,
            window,
            metric,
        })
    }

    /// The margin chart linked to `primary`, for a hover on that chart.
    pub fn render_margin(
        &mut self,
        primary: &PrimaryChart,
        hover: Option<usize>,
    ) -> Result<ChartView> {
        let selection = SelectionCorrelator::resolve_entity(hover, &primary.mode);
        let pivot = self.window_pivot(primary.window)?;
        Ok(views::margin_chart(pivot, &selection))
    }

    /// Every consultant's value for one month, over the full history.
    pub fn monthly_snapshot(&mut self, month: NaiveDate, metric: Metric) -> Result<ChartView> {
        let full = self.dataset.months().full_window()?;
        let pivot = self.window_pivot(full)?;
        views::monthly_snapshot(pivot, &TimeBucket::Month(month), metric)
    }

    /// Consultant history over the current window. Without a consultant the
    /// leader by gross sales in the window's last month is shown.
    pub fn consultant_history(&mut self, consultant: Option<&str>) -> Result<ChartView> {
        let window = self.window;
        let metrics = self.dataset.config().history_metrics.clone();
        let (_, last) = window.bounds(self.dataset.months())?;
        if let Some(name) = consultant {
            if !self.dataset.contains_consultant(name) {
                return Err(DashboardError::UnknownConsultant(name.to_string()));
            }
        }

        let pivot = self.window_pivot(window)?;
        let entity = match consultant {
            Some(name) => name.to_string(),
            None => RankSelector::bucket_leader(pivot, &TimeBucket::Month(last))
                .ok_or(DashboardError::EmptyDataset)?,
        };
        Ok(views::consultant_history(pivot, &entity, &metrics))
    }

    pub fn year_to_date(&mut self, year: i32) -> Result<ChartView> {
        let config = self.dataset.config();
        let metrics = config.ytd_metrics.clone();
        let sort_metric = config.ytd_sort_metric;
        let full = self.dataset.months().full_window()?;

        let yearly = self
            .cache
            .get_or_build(&self.dataset, full, TimeKey::CalendarYear, &metrics)?;
        views::year_to_date(yearly, year, &metrics, sort_metric)
    }

    pub fn financial_year_comparison(&self, consultant: &str, metric: Metric) -> Result<ChartView> {
        let config = self.dataset.config();
        if !config.comparison_metrics.contains(&metric) {
            return Err(DashboardError::InvalidConfig(format!(
                "'{}' is not a comparison metric",
                metric
            )));
        }
        let comparison = FinancialYearAligner::align(
            self.dataset.records(),
            consultant,
            config.max_financial_years,
        )?;
        Ok(views::financial_year_chart(&comparison, metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::schema::{RateRule, Record};

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn dataset() -> Arc<Dataset> {
        let mut records = Vec::new();
        for (i, name) in ["Adam", "Bea", "Cal", "Dee", "Eli", "Fay", "Gus"].iter().enumerate() {
            for m in 1..=4 {
                records.push(Record {
                    month: d(2023, m),
                    consultant: name.to_string(),
                    gross_sales: 1000.0 * (i + 1) as f64 + m as f64,
                    cost_of_sales: 100.0,
                    commission: 100.0 * (7 - i) as f64,
                });
            }
        }
        let rules = vec![RateRule {
            consultant: "DEFAULT".to_string(),
            effective_date: d(2020, 1),
            flat_fee: 5.0,
            pct_fee: 10.0,
        }];
        Arc::new(Dataset::new(&records, &rules, DashboardConfig::default()).unwrap())
    }

    #[test]
    fn test_margin_uses_rank_of_rendered_chart() {
        let mut session = DashboardSession::new(dataset()).unwrap();
        session.set_top_n(true);
        let primary = session.render_primary(Some(0)).unwrap();
        assert_eq!(primary.view.traces[0].name, "Gus");

        // The user re-ranks by commission before the hover lands; the
        // margin chart still follows the chart that was hovered.
        session.set_metric(Metric::Commission).unwrap();
        let margin = session.render_margin(&primary, Some(0)).unwrap();
        assert!(margin.title.starts_with("Gus - Margin history"));

        let reranked = session.render_primary(None).unwrap();
        assert_eq!(reranked.view.traces[0].name, "Adam");
        let margin = session.render_margin(&reranked, Some(0)).unwrap();
        assert!(margin.title.starts_with("Adam - Margin history"));
    }

    #[test]
    fn test_drill_down_mode() {
        let mut session = DashboardSession::new(dataset()).unwrap();
        assert!(session.drill_down(Some("Nobody")).is_err());
        session.drill_down(Some("Cal")).unwrap();
        let primary = session.render_primary(None).unwrap();
        assert_eq!(primary.view.title, "Sales/Commission - Cal");
        assert_eq!(primary.view.traces.len(), 3);

        let margin = session.render_margin(&primary, Some(2)).unwrap();
        assert!(margin.title.starts_with("Cal - Margin history"));
        let margin = session.render_margin(&primary, None).unwrap();
        assert!(margin.title.starts_with("Margin"));

        session.drill_down(None).unwrap();
        let primary = session.render_primary(None).unwrap();
        assert_eq!(primary.view.traces.len(), 7);
    }

    #[test]
    fn test_invalid_window_keeps_previous() {
        let mut session = DashboardSession::new(dataset()).unwrap();
        let before = session.window();
        assert!(session.set_window(3, 1).is_err());
        assert_eq!(session.window(), before);

        let clamped = session.set_window_clamped(2, 99).unwrap();
        assert_eq!((clamped.start(), clamped.end()), (2, 3));
        assert_eq!(session.window_label().unwrap(), "Months selected: Mar 2023 - Apr 2023");
    }

    #[test]
    fn test_secondary_views() {
        let mut session = DashboardSession::new(dataset()).unwrap();
        let history = session.consultant_history(None).unwrap();
        assert_eq!(history.title, "Consultant History - Gus");
        assert_eq!(history.axis.len(), 4);

        let snapshot = session.monthly_snapshot(d(2023, 2), Metric::GrossSales).unwrap();
        assert_eq!(snapshot.axis[0], "Gus");

        let ytd = session.year_to_date(2023).unwrap();
        assert_eq!(ytd.axis[0], "Adam");

        let fy = session
            .financial_year_comparison("Bea", Metric::GrossSales)
            .unwrap();
        assert_eq!(fy.traces.len(), 1);
        assert_eq!(fy.traces[0].name, "2022.2023");
        assert!(session
            .financial_year_comparison("Bea", Metric::Margin)
            .is_err());
        assert!(session.set_metric(Metric::Margin).is_err());
    }
}
