//! Chart-ready tables for the dashboard's seven views.
//!
//! Each builder returns an axis, one value series per trace and an optional
//! annotation. How these are drawn is up to the presentation layer.

use crate::error::{DashboardError, Result};
use crate::financial_year::FinancialYearComparison;
use crate::pivot::{PivotTable, TimeBucket};
use crate::ranking::RankSelector;
use crate::schema::Metric;
use crate::selection::{ChartMode, Selection};
use crate::utils::round_to;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    /// Aligned with the view's axis; `None` is a gap, not zero.
    pub values: Vec<Option<f64>>,
    pub highlighted: bool,
}

impl Trace {
    fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    /// A horizontal reference line, e.g. an average margin.
    ReferenceLine { label: String, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartView {
    pub title: String,
    pub axis: Vec<String>,
    pub traces: Vec<Trace>,
    pub annotation: Option<Annotation>,
}

impl ChartView {
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.traces.iter().position(|t| t.highlighted)
    }
}

fn bucket_axis(buckets: &[TimeBucket]) -> Vec<String> {
    buckets.iter().map(ToString::to_string).collect()
}

fn highlight(traces: &mut [Trace], hover: Option<usize>) {
    if let Some(trace) = hover.and_then(|i| traces.get_mut(i)) {
        trace.highlighted = true;
    }
}

/// View 1: the primary time series, laid out by `mode`.
pub fn primary_chart(
    pivot: &PivotTable,
    mode: &ChartMode,
    metric: Metric,
    hover: Option<usize>,
) -> ChartView {
    let mut view = match mode {
        ChartMode::All { entities } => ChartView {
            title: metric.label().to_string(),
            axis: bucket_axis(pivot.buckets()),
            traces: entities
                .iter()
                .map(|e| Trace::new(e.as_str(), pivot.series(e, metric)))
                .collect(),
            annotation: None,
        },
        ChartMode::TopN(ranked) => ChartView {
            title: format!("{} - Top {}", metric, ranked.len()),
            axis: bucket_axis(pivot.buckets()),
            traces: ranked
                .entities()
                .into_iter()
                .map(|e| Trace::new(e, pivot.series(e, metric)))
                .collect(),
            annotation: None,
        },
        ChartMode::Single { entity, metrics } => entity_history(
            pivot,
            entity,
            metrics,
            format!("Sales/Commission - {}", entity),
        ),
    };
    highlight(&mut view.traces, hover);
    view
}

/// Views 4 and 6: one consultant's months in the pivot, one trace per metric.
/// Only months in which the consultant has records appear on the axis.
pub fn entity_history(
    pivot: &PivotTable,
    entity: &str,
    metrics: &[Metric],
    title: String,
) -> ChartView {
    let buckets: Vec<TimeBucket> = pivot
        .buckets()
        .iter()
        .filter(|b| pivot.totals(b, entity).is_some())
        .copied()
        .collect();

    ChartView {
        title,
        axis: bucket_axis(&buckets),
        traces: metrics
            .iter()
            .map(|metric| {
                Trace::new(
                    metric.label(),
                    buckets
                        .iter()
                        .map(|b| pivot.get(b, entity, *metric))
                        .collect(),
                )
            })
            .collect(),
        annotation: None,
    }
}

pub fn consultant_history(pivot: &PivotTable, entity: &str, metrics: &[Metric]) -> ChartView {
    entity_history(
        pivot,
        entity,
        metrics,
        format!("Consultant History - {}", entity),
    )
}

/// View 2: margin history linked to the primary chart's hover.
///
/// With nothing selected every consultant is plotted against the window's
/// overall margin (one decimal). A selected consultant is plotted alone
/// against their own window margin (whole percent).
pub fn margin_chart(pivot: &PivotTable, selection: &Selection) -> ChartView {
    let axis = bucket_axis(pivot.buckets());

    match selection.entity() {
        None => {
            let overall = pivot.grand_totals().margin().map(|m| round_to(m, 1));
            ChartView {
                title: match overall {
                    Some(value) => format!("Margin (Overall avg. {}%)", value),
                    None => "Margin".to_string(),
                },
                axis,
                traces: pivot
                    .entities()
                    .iter()
                    .map(|e| Trace::new(e.as_str(), pivot.series(e, Metric::Margin)))
                    .collect(),
                annotation: overall.map(|value| Annotation::ReferenceLine {
                    label: format!("{}%", value),
                    value,
                }),
            }
        }
        Some(entity) => {
            let average = pivot
                .entity_totals(entity)
                .and_then(|t| t.margin())
                .map(|m| round_to(m, 0));
            ChartView {
                title: match average {
                    Some(value) => format!("{} - Margin history (avg. {}%)", entity, value),
                    None => format!("{} - Margin history", entity),
                },
                axis,
                traces: vec![Trace::new(entity, pivot.series(entity, Metric::Margin))],
                annotation: average.map(|value| Annotation::ReferenceLine {
                    label: format!("{}%", value),
                    value,
                }),
            }
        }
    }
}

/// View 3: every consultant's value for one month, largest first.
pub fn monthly_snapshot(
    pivot: &PivotTable,
    bucket: &TimeBucket,
    metric: Metric,
) -> Result<ChartView> {
    if !pivot.buckets().contains(bucket) {
        return Err(DashboardError::UnknownMonth(bucket.to_string()));
    }
    let ranked = RankSelector::rank_bucket(pivot, bucket, metric)?;
    Ok(ChartView {
        title: format!("{} - {}", metric, bucket),
        axis: ranked.iter().map(|e| e.entity.clone()).collect(),
        traces: vec![Trace::new(
            metric.label(),
            ranked.iter().map(|e| e.total).collect(),
        )],
        annotation: None,
    })
}

/// View 5: calendar-year totals per consultant, one stacked trace per metric,
/// consultants ordered by `sort_metric` descending.
pub fn year_to_date(
    yearly: &PivotTable,
    year: i32,
    metrics: &[Metric],
    sort_metric: Metric,
) -> Result<ChartView> {
    let bucket = TimeBucket::CalendarYear(year);
    if !yearly.buckets().contains(&bucket) {
        return Err(DashboardError::DateError(format!("no records in {}", year)));
    }
    let order = RankSelector::rank_bucket(yearly, &bucket, sort_metric)?;
    let entities: Vec<&str> = order
        .iter()
        .filter(|e| yearly.totals(&bucket, &e.entity).is_some())
        .map(|e| e.entity.as_str())
        .collect();

    Ok(ChartView {
        title: format!("{} YTD sales/commission", year),
        axis: entities.iter().map(|e| e.to_string()).collect(),
        traces: metrics
            .iter()
            .map(|metric| {
                Trace::new(
                    metric.label(),
                    entities
                        .iter()
                        .map(|e| yearly.get(&bucket, e, *metric))
                        .collect(),
                )
            })
            .collect(),
        annotation: None,
    })
}

/// View 7: one trace per financial year over Jan..Dec; the latest year is highlighted.
pub fn financial_year_chart(comparison: &FinancialYearComparison, metric: Metric) -> ChartView {
    let mut traces: Vec<Trace> = comparison
        .years
        .iter()
        .map(|series| Trace::new(series.financial_year.label(), series.values(metric)))
        .collect();
    if let Some(latest) = traces.last_mut() {
        latest.highlighted = true;
    }

    ChartView {
        title: format!(
            "{} - {} comparison by Financial Year",
            comparison.consultant, metric
        ),
        axis: FinancialYearComparison::axis()
            .into_iter()
            .map(str::to_string)
            .collect(),
        traces,
        annotation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::pivot;
    use crate::ranking::top_n;
    use crate::schema::{DerivedRecord, TimeKey};
    use crate::selection::resolve_entity;
    use crate::utils::{financial_year_for, month_label};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn rec(month: NaiveDate, consultant: &str, gross: f64, commission: f64) -> DerivedRecord {
        DerivedRecord {
            month,
            consultant: consultant.to_string(),
            gross_sales: gross,
            cost_of_sales: gross / 2.0,
            commission,
            service_fee: commission / 10.0,
            commission_paid: commission * 0.9,
            margin: if gross == 0.0 {
                None
            } else {
                Some(100.0 * commission / gross)
            },
            month_label: month_label(month),
            financial_year: financial_year_for(month, 6),
        }
    }

    fn table() -> PivotTable {
        let records = vec![
            rec(d(2023, 1), "Adam", 100.0, 10.0),
            rec(d(2023, 1), "Mia", 900.0, 270.0),
            rec(d(2023, 2), "Mia", 800.0, 200.0),
            rec(d(2023, 2), "Zoe", 1000.0, 150.0),
        ];
        pivot(&records, &Metric::ALL, TimeKey::Month).unwrap()
    }

    #[test]
    fn test_primary_top_n_traces_follow_rank() {
        let table = table();
        let mode = ChartMode::TopN(top_n(&table, Metric::GrossSales, 2).unwrap());
        let view = primary_chart(&table, &mode, Metric::GrossSales, Some(1));
        assert_eq!(view.title, "Gross sales - Top 2");
        let names: Vec<&str> = view.traces.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Mia", "Zoe"]);
        assert_eq!(view.highlighted(), Some(1));
        assert_eq!(view.axis, vec!["Jan 2023", "Feb 2023"]);
        assert_eq!(view.traces[1].values, vec![None, Some(1000.0)]);
    }

    #[test]
    fn test_primary_single_mode() {
        let table = table();
        let mode = ChartMode::Single {
            entity: "Zoe".to_string(),
            metrics: vec![Metric::GrossSales, Metric::Commission],
        };
        let view = primary_chart(&table, &mode, Metric::GrossSales, None);
        assert_eq!(view.title, "Sales/Commission - Zoe");
        assert_eq!(view.axis, vec!["Feb 2023"]);
        assert_eq!(view.trace("Commission").unwrap().values, vec![Some(150.0)]);
        assert_eq!(view.highlighted(), None);
    }

    #[test]
    fn test_margin_chart_follows_selection() {
        let table = table();
        let mode = ChartMode::TopN(top_n(&table, Metric::GrossSales, 2).unwrap());

        let aggregate = margin_chart(&table, &resolve_entity(None, &mode));
        assert_eq!(aggregate.traces.len(), 3);
        // (10 + 270 + 200 + 150) / (100 + 900 + 800 + 1000)
        assert_eq!(aggregate.title, "Margin (Overall avg. 22.5%)");

        let hovered = margin_chart(&table, &resolve_entity(Some(1), &mode));
        assert_eq!(hovered.title, "Zoe - Margin history (avg. 15%)");
        assert_eq!(hovered.traces.len(), 1);
        assert_eq!(hovered.traces[0].values, vec![None, Some(15.0)]);
        assert!(matches!(
            hovered.annotation,
            Some(Annotation::ReferenceLine { value, .. }) if value == 15.0
        ));
    }

    #[test]
    fn test_monthly_snapshot_ranks_consultants() {
        let table = table();
        let feb = TimeBucket::Month(d(2023, 2));
        let view = monthly_snapshot(&table, &feb, Metric::GrossSales).unwrap();
        assert_eq!(view.title, "Gross sales - Feb 2023");
        assert_eq!(view.axis, vec!["Zoe", "Mia", "Adam"]);
        assert_eq!(view.traces[0].values, vec![Some(1000.0), Some(800.0), None]);
        let missing = TimeBucket::Month(d(2024, 2));
        assert!(monthly_snapshot(&table, &missing, Metric::GrossSales).is_err());
    }

    #[test]
    fn test_year_to_date_sorted_by_fee() {
        let records = vec![
            rec(d(2023, 1), "Adam", 100.0, 10.0),
            rec(d(2023, 2), "Adam", 100.0, 10.0),
            rec(d(2023, 1), "Mia", 900.0, 270.0),
            rec(d(2022, 5), "Zoe", 1000.0, 900.0),
        ];
        let yearly = pivot(&records, &Metric::ALL, TimeKey::CalendarYear).unwrap();
        let metrics = [Metric::ServiceFee, Metric::CommissionPaid, Metric::CostOfSales];
        let view = year_to_date(&yearly, 2023, &metrics, Metric::ServiceFee).unwrap();
        assert_eq!(view.title, "2023 YTD sales/commission");
        assert_eq!(view.axis, vec!["Mia", "Adam"]);
        assert_eq!(view.trace("Service fee").unwrap().values, vec![Some(27.0), Some(2.0)]);
        assert_eq!(view.traces.len(), 3);
        assert!(year_to_date(&yearly, 2021, &metrics, Metric::ServiceFee).is_err());
    }
}
