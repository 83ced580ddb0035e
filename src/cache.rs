//! Per-session memo of windowed pivots.
//!
//! Monthly pivots are sliced out of one full-history pivot per metric set
//! instead of being rebuilt from records on every interaction. Entries are
//! tied to the dataset generation they were built from. At most `capacity`
//! windowed pivots are kept; the least recently used one is evicted first.

use crate::error::Result;
use crate::pivot::{PivotTable, Pivoter};
use crate::schema::{Metric, TimeKey};
use crate::window::{filter_window, SelectionWindow};
use crate::Dataset;
use log::debug;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_CACHE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PivotKey {
    window: SelectionWindow,
    time_key: TimeKey,
    metrics: Vec<Metric>,
}

#[derive(Debug)]
pub struct PivotCache {
    generation: Option<u64>,
    capacity: usize,
    full_history: HashMap<Vec<Metric>, PivotTable>,
    windows: HashMap<PivotKey, PivotTable>,
    /// Least recently used first.
    recency: VecDeque<PivotKey>,
    hits: usize,
    misses: usize,
}

impl Default for PivotCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl PivotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` windowed pivots (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generation: None,
            capacity: capacity.max(1),
            full_history: HashMap::new(),
            windows: HashMap::new(),
            recency: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_build(
        &mut self,
        dataset: &Dataset,
        window: SelectionWindow,
        time_key: TimeKey,
        metrics: &[Metric],
    ) -> Result<&PivotTable> {
        self.sync(dataset);

        let key = PivotKey {
            window,
            time_key,
            metrics: metrics.to_vec(),
        };

        if self.windows.contains_key(&key) {
            self.hits += 1;
            debug!("Pivot cache hit for {:?}", key);
            self.touch(&key);
        } else {
            self.misses += 1;
            debug!("Pivot cache miss for {:?}", key);
            let table = match time_key {
                TimeKey::Month => self
                    .full_history(dataset, metrics)?
                    .slice(window, dataset.months())?,
                _ => {
                    let records = filter_window(dataset.records(), window, dataset.months())?;
                    Pivoter::pivot(records, metrics, time_key)?
                }
            };
            self.windows.insert(key.clone(), table);
            self.recency.push_back(key.clone());
            self.evict();
        }

        Ok(&self.windows[&key])
    }

    fn touch(&mut self, key: &PivotKey) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn evict(&mut self) {
        while self.windows.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            debug!("Evicting cached pivot {:?}", oldest);
            self.windows.remove(&oldest);
        }
    }

    fn full_history(&mut self, dataset: &Dataset, metrics: &[Metric]) -> Result<&PivotTable> {
        if !self.full_history.contains_key(metrics) {
            let table = Pivoter::pivot(dataset.records(), metrics, TimeKey::Month)?;
            self.full_history.insert(metrics.to_vec(), table);
        }
        Ok(&self.full_history[metrics])
    }

    fn sync(&mut self, dataset: &Dataset) {
        if self.generation != Some(dataset.generation()) {
            if self.generation.is_some() {
                debug!("Dataset changed, dropping {} cached pivots", self.windows.len());
            }
            self.invalidate();
            self.generation = Some(dataset.generation());
        }
    }

    pub fn invalidate(&mut self) {
        self.full_history.clear();
        self.windows.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::schema::{RateRule, Record};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let records: Vec<Record> = (1..=6)
            .flat_map(|m| {
                ["Alice", "Bob"].into_iter().map(move |name| Record {
                    month: NaiveDate::from_ymd_opt(2023, m, 1).unwrap(),
                    consultant: name.to_string(),
                    gross_sales: 1000.0 * m as f64,
                    cost_of_sales: 500.0,
                    commission: 100.0 * m as f64,
                })
            })
            .collect();
        let rules = vec![RateRule {
            consultant: "DEFAULT".to_string(),
            effective_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            flat_fee: 0.0,
            pct_fee: 10.0,
        }];
        Dataset::new(&records, &rules, DashboardConfig::default()).unwrap()
    }

    #[test]
    fn test_cached_slice_matches_direct_pivot() {
        let data = dataset();
        let mut cache = PivotCache::new();
        let window = SelectionWindow::new(1, 3, data.months().len()).unwrap();
        let metrics = [Metric::GrossSales, Metric::Margin];

        let cached = cache
            .get_or_build(&data, window, TimeKey::Month, &metrics)
            .unwrap()
            .clone();
        let records = filter_window(data.records(), window, data.months()).unwrap();
        let direct = Pivoter::pivot(records, &metrics, TimeKey::Month).unwrap();
        assert_eq!(cached, direct);
        assert_eq!(cached.buckets().len(), 3);
    }

    #[test]
    fn test_repeat_lookups_hit() {
        let data = dataset();
        let mut cache = PivotCache::new();
        let window = SelectionWindow::new(0, 5, data.months().len()).unwrap();
        let metrics = [Metric::Commission];

        cache.get_or_build(&data, window, TimeKey::Month, &metrics).unwrap();
        cache.get_or_build(&data, window, TimeKey::Month, &metrics).unwrap();
        cache
            .get_or_build(&data, window, TimeKey::FinancialYear, &metrics)
            .unwrap();
        assert_eq!(cache.stats(), (1, 2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_least_recently_used_window() {
        let data = dataset();
        let mut cache = PivotCache::with_capacity(2);
        let len = data.months().len();
        let metrics = [Metric::GrossSales];
        let first = SelectionWindow::new(0, 1, len).unwrap();
        let second = SelectionWindow::new(1, 2, len).unwrap();
        let third = SelectionWindow::new(2, 3, len).unwrap();

        cache.get_or_build(&data, first, TimeKey::Month, &metrics).unwrap();
        cache.get_or_build(&data, second, TimeKey::Month, &metrics).unwrap();
        // Touching the first window makes the second the oldest.
        cache.get_or_build(&data, first, TimeKey::Month, &metrics).unwrap();
        cache.get_or_build(&data, third, TimeKey::Month, &metrics).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats(), (1, 3));

        cache.get_or_build(&data, first, TimeKey::Month, &metrics).unwrap();
        assert_eq!(cache.stats(), (2, 3));
        cache.get_or_build(&data, second, TimeKey::Month, &metrics).unwrap();
        assert_eq!(cache.stats(), (2, 4));
        assert_eq!(cache.len(), 2);

        // A long slider drag stays bounded.
        let mut bounded = PivotCache::with_capacity(4);
        for start in 0..len {
            for end in start..len {
                let window = SelectionWindow::new(start, end, len).unwrap();
                bounded.get_or_build(&data, window, TimeKey::Month, &metrics).unwrap();
            }
        }
        assert_eq!(bounded.len(), 4);
        assert_eq!(PivotCache::new().capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_new_dataset_invalidates() {
        let first = dataset();
        let second = dataset();
        assert_ne!(first.generation(), second.generation());

        let mut cache = PivotCache::new();
        let window = SelectionWindow::new(0, 1, first.months().len()).unwrap();
        cache
            .get_or_build(&first, window, TimeKey::Month, &[Metric::Commission])
            .unwrap();
        cache
            .get_or_build(&second, window, TimeKey::Month, &[Metric::Commission])
            .unwrap();
        assert_eq!(cache.stats(), (0, 2));
        assert_eq!(cache.len(), 1);
    }
}
