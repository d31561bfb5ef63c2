//! Daily series container with calendar lookups

use crate::models::DailyObservation;
use std::collections::HashMap;

/// Synthesized daily observations in strict (year, month, day) order
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    observations: Vec<DailyObservation>,
    index: HashMap<(i32, u32, u32), usize>,
}

impl DailySeries {
    pub fn new(observations: Vec<DailyObservation>) -> Self {
        let index = observations
            .iter()
            .enumerate()
            .map(|(i, o)| ((o.year, o.month, o.day), i))
            .collect();
        Self {
            observations,
            index,
        }
    }

    pub fn observations(&self) -> &[DailyObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, year: i32, month: u32, day: u32) -> Option<&DailyObservation> {
        self.index
            .get(&(year, month, day))
            .map(|&i| &self.observations[i])
    }

    /// Observations for one calendar year
    pub fn year(&self, year: i32) -> impl Iterator<Item = &DailyObservation> {
        self.observations.iter().filter(move |o| o.year == year)
    }

    /// Observations on `month`/`day` for every year in `years`
    pub fn same_day_in(
        &self,
        month: u32,
        day: u32,
        years: std::ops::Range<i32>,
    ) -> impl Iterator<Item = &DailyObservation> {
        years.filter_map(move |year| self.get(year, month, day))
    }
}
