//! Per-level answer statistics
//!
//! Counters are keyed by interval id and only reset by [`StatsTracker::reload_level`].

use diad_common::models::Level;
use diad_common::{IntervalId, NotationConverter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Raw counters for one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStatsItem {
    pub id: IntervalId,
    pub name: String,
    pub correct: u32,
    pub wrong: u32,
}

/// Aggregated view of one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerItem {
    pub id: IntervalId,
    pub name: String,
    pub count: u32,
    /// Share of correct answers, 0 when nothing was answered
    pub ratio: f64,
}

/// Aggregated statistics for the current level
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackerData {
    /// Sorted by ratio descending, then name ascending
    pub items: Vec<TrackerItem>,
    pub total_count: u32,
    pub total_ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    items: Vec<TrackerStatsItem>,
}

fn ratio(correct: u32, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(count)
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all counters with zeroed ones for the intervals of `level`.
    pub fn reload_level(&mut self, level: &Level) {
        self.items.clear();
        for &id in &level.intervals {
            // One counter per interval id
            if self.items.iter().any(|item| item.id == id) {
                continue;
            }
            self.items.push(TrackerStatsItem {
                id,
                name: NotationConverter::interval_name(id)
                    .map(str::to_string)
                    .unwrap_or_else(|_| format!("Interval {}", id)),
                correct: 0,
                wrong: 0,
            });
        }
        debug!(level_id = level.id, items = self.items.len(), "statistics reset");
    }

    /// Count one answer for `id`. Ids outside the current level are ignored.
    pub fn add_item(&mut self, id: IntervalId, is_correct: bool) {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) if is_correct => item.correct += 1,
            Some(item) => item.wrong += 1,
            None => debug!(interval_id = id, "ignoring answer for interval outside level"),
        }
    }

    pub fn items(&self) -> &[TrackerStatsItem] {
        &self.items
    }

    pub fn stats_data(&self) -> TrackerData {
        let mut items: Vec<TrackerItem> = self
            .items
            .iter()
            .map(|item| {
                let count = item.correct + item.wrong;
                TrackerItem {
                    id: item.id,
                    name: item.name.clone(),
                    count,
                    ratio: ratio(item.correct, count),
                }
            })
            .collect();
        items.sort_by(|a, b| {
            b.ratio
                .partial_cmp(&a.ratio)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let total_correct: u32 = self.items.iter().map(|i| i.correct).sum();
        let total_count: u32 = items.iter().map(|i| i.count).sum();

        TrackerData {
            items,
            total_count,
            total_ratio: ratio(total_correct, total_count),
        }
    }
}
