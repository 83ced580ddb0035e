use crate::error::{DashboardError, Result};
use crate::schema::{RateRule, DEFAULT_CONSULTANT};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Effective-dated lookup over a fee schedule.
///
/// Rules are grouped per consultant and stably sorted by effective date, so
/// rules sharing a date keep their table order and the later one wins.
#[derive(Debug, Clone, Default)]
pub struct RateResolver {
    schedules: HashMap<String, Vec<RateRule>>,
}

impl RateResolver {
    pub fn new(rules: &[RateRule]) -> Self {
        let mut schedules: HashMap<String, Vec<RateRule>> = HashMap::new();
        for rule in rules {
            schedules
                .entry(rule.consultant.clone())
                .or_default()
                .push(rule.clone());
        }
        for schedule in schedules.values_mut() {
            schedule.sort_by_key(|r| r.effective_date);
        }
        Self { schedules }
    }

    /// The consultant's latest rule on or before `as_of`, falling back to the
    /// latest DEFAULT rule on or before `as_of`.
    pub fn resolve(&self, consultant: &str, as_of: NaiveDate) -> Result<&RateRule> {
        self.latest_for(consultant, as_of)
            .or_else(|| self.latest_for(DEFAULT_CONSULTANT, as_of))
            .ok_or_else(|| DashboardError::NoApplicableRate {
                consultant: consultant.to_string(),
                date: as_of,
            })
    }

    fn latest_for(&self, consultant: &str, as_of: NaiveDate) -> Option<&RateRule> {
        let schedule = self.schedules.get(consultant)?;
        let applicable = schedule.partition_point(|r| r.effective_date <= as_of);
        applicable.checked_sub(1).map(|idx| &schedule[idx])
    }

    pub fn has_default(&self) -> bool {
        self.schedules.contains_key(DEFAULT_CONSULTANT)
    }

    pub fn len(&self) -> usize {
        self.schedules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}
