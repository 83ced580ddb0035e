use crate::error::{DashboardError, Result};
use crate::pivot::{PivotTable, TimeBucket};
use crate::schema::Metric;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub entity: String,
    /// `None` when the consultant has no value for the metric (e.g. margin on zero sales).
    pub total: Option<f64>,
}

/// The ordered consultants of one top-N computation.
///
/// Its order is the trace order of the chart it was computed for; trace
/// positions on that chart map back to consultants only through this set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSet {
    pub metric: Metric,
    pub entries: Vec<RankedEntry>,
}

impl RankedSet {
    pub fn entity(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.entity.as_str())
    }

    pub fn entities(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.entity.as_str()).collect()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entries.iter().any(|e| e.entity == entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Descending by value, absent values last. Equal keys keep their input order.
fn descending(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank(mut entries: Vec<RankedEntry>) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| descending(&a.total, &b.total));
    entries
}

fn require_metric(pivot: &PivotTable, metric: Metric) -> Result<()> {
    if pivot.has_metric(metric) {
        Ok(())
    } else {
        Err(DashboardError::InvalidConfig(format!(
            "metric '{}' is not part of this pivot",
            metric
        )))
    }
}

pub struct RankSelector;

impl RankSelector {
    /// The `n` consultants with the highest window total of `metric`.
    pub fn top_n(pivot: &PivotTable, metric: Metric, n: usize) -> Result<RankedSet> {
        require_metric(pivot, metric)?;

        let entries = pivot
            .entities()
            .iter()
            .map(|entity| RankedEntry {
                entity: entity.clone(),
                total: pivot.entity_total(entity, metric),
            })
            .collect();

        let mut entries = rank(entries);
        entries.truncate(n);

        let ranked = RankedSet { metric, entries };
        debug!("Top {} by {}: {:?}", n, metric, ranked.entities());
        Ok(ranked)
    }

    /// Every consultant's value in one bucket, best first. Consultants without
    /// records in the bucket are listed last with no value.
    pub fn rank_bucket(
        pivot: &PivotTable,
        bucket: &TimeBucket,
        metric: Metric,
    ) -> Result<Vec<RankedEntry>> {
        require_metric(pivot, metric)?;

        let entries = pivot
            .entities()
            .iter()
            .map(|entity| RankedEntry {
                entity: entity.clone(),
                total: pivot.get(bucket, entity, metric),
            })
            .collect();

        Ok(rank(entries))
    }

    /// The consultant with the highest gross sales in `bucket`; the first in
    /// consultant order wins a tie.
    pub fn bucket_leader(pivot: &PivotTable, bucket: &TimeBucket) -> Option<String> {
        let mut leader: Option<(&String, f64)> = None;
        for entity in pivot.entities() {
            if let Some(gross) = pivot.totals(bucket, entity).map(|t| t.gross_sales) {
                if leader.map_or(true, |(_, best)| gross > best) {
                    leader = Some((entity, gross));
                }
            }
        }
        leader.map(|(entity, _)| entity.clone())
    }
}

pub fn top_n(pivot: &PivotTable, metric: Metric, n: usize) -> Result<RankedSet> {
    RankSelector::top_n(pivot, metric, n)
}
