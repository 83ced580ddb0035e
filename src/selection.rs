use crate::pivot::PivotTable;
use crate::ranking::RankedSet;
use crate::schema::Metric;
use serde::{Deserialize, Serialize};

/// How the primary chart laid out its traces. Each mode carries exactly the
/// trace order it was rendered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartMode {
    /// One trace per consultant, in pivot column order.
    All { entities: Vec<String> },
    /// One trace per ranked consultant, in rank order.
    TopN(RankedSet),
    /// One trace per metric for a single drilled-down consultant.
    Single { entity: String, metrics: Vec<Metric> },
}

impl ChartMode {
    pub fn all(pivot: &PivotTable) -> Self {
        ChartMode::All {
            entities: pivot.entities().to_vec(),
        }
    }

    pub fn trace_count(&self) -> usize {
        match self {
            ChartMode::All { entities } => entities.len(),
            ChartMode::TopN(ranked) => ranked.len(),
            ChartMode::Single { metrics, .. } => metrics.len(),
        }
    }
}

/// What a hover on the primary chart points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing hovered; consumers show the aggregate view.
    None,
    Entity(String),
    /// A metric trace of the drilled-down consultant.
    EntityMetric { entity: String, metric: Metric },
}

impl Selection {
    pub fn entity(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Entity(entity) | Selection::EntityMetric { entity, .. } => {
                Some(entity.as_str())
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

pub struct SelectionCorrelator;

impl SelectionCorrelator {
    /// Maps a hovered trace back to the consultant it was drawn for.
    ///
    /// A missing or out-of-range index yields [`Selection::None`].
    pub fn resolve_entity(trace_index: Option<usize>, mode: &ChartMode) -> Selection {
        let Some(index) = trace_index else {
            return Selection::None;
        };

        match mode {
            ChartMode::All { entities } => entities
                .get(index)
                .map_or(Selection::None, |e| Selection::Entity(e.clone())),
            ChartMode::TopN(ranked) => ranked
                .entity(index)
                .map_or(Selection::None, |e| Selection::Entity(e.to_string())),
            ChartMode::Single { entity, metrics } => {
                metrics
                    .get(index)
                    .map_or(Selection::None, |metric| Selection::EntityMetric {
                        entity: entity.clone(),
                        metric: *metric,
                    })
            }
        }
    }
}

pub fn resolve_entity(trace_index: Option<usize>, mode: &ChartMode) -> Selection {
    SelectionCorrelator::resolve_entity(trace_index, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankedEntry;

    fn ranked(names: &[&str]) -> RankedSet {
        RankedSet {
            metric: Metric::GrossSales,
            entries: names
                .iter()
                .enumerate()
                .map(|(i, name)| RankedEntry {
                    entity: name.to_string(),
                    total: Some(1000.0 - i as f64),
                })
                .collect(),
        }
    }

    #[test]
    fn test_top_n_uses_ranked_order() {
        let mode = ChartMode::TopN(ranked(&["A", "B", "C", "D", "E"]));
        assert_eq!(
            resolve_entity(Some(2), &mode),
            Selection::Entity("C".to_string())
        );

        // Rank order differs from alphabetical order.
        let mode = ChartMode::TopN(ranked(&["Zoe", "Adam", "Mia"]));
        assert_eq!(resolve_entity(Some(0), &mode).entity(), Some("Zoe"));
        assert_eq!(resolve_entity(Some(1), &mode).entity(), Some("Adam"));
    }

    #[test]
    fn test_all_mode_uses_column_order() {
        let mode = ChartMode::All {
            entities: vec!["Adam".to_string(), "Mia".to_string(), "Zoe".to_string()],
        };
        assert_eq!(resolve_entity(Some(0), &mode).entity(), Some("Adam"));
        assert_eq!(mode.trace_count(), 3);
    }

    #[test]
    fn test_single_mode_selects_metric() {
        let mode = ChartMode::Single {
            entity: "Mia".to_string(),
            metrics: vec![Metric::GrossSales, Metric::Commission, Metric::ServiceFee],
        };
        assert_eq!(
            resolve_entity(Some(1), &mode),
            Selection::EntityMetric {
                entity: "Mia".to_string(),
                metric: Metric::Commission
            }
        );
        assert_eq!(resolve_entity(Some(7), &mode), Selection::None);
    }

    #[test]
    fn test_no_hover_is_no_selection() {
        let mode = ChartMode::TopN(ranked(&["A", "B"]));
        assert!(resolve_entity(None, &mode).is_none());
        assert!(resolve_entity(Some(2), &mode).is_none());
        assert_eq!(Selection::None.entity(), None);
    }
}
