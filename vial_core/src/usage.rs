//! Usage history for a single vial.
//!
//! Rebuilds how a vial was drawn down over time from its dose logs.

use crate::{DoseLog, StockLevel, StockThresholds, Vial};
use chrono::{DateTime, Utc};

/// Remaining stock at a point in time
#[derive(Clone, Debug, PartialEq)]
pub struct UsagePoint {
    pub at: DateTime<Utc>,
    pub remaining_mg: f64,
}

/// Aggregate usage figures for a vial
#[derive(Clone, Debug, PartialEq)]
pub struct UsageSummary {
    pub used_mg: f64,
    pub dose_count: usize,
    pub percent_remaining: f64,
    pub level: StockLevel,
}

/// Build the depletion curve of `vial` from `logs`.
///
/// The first point is the vial at full stock on the day it was added,
/// followed by one point per dose in date order. Logs belonging to other
/// vials are ignored. The running balance is replayed from `total_mg`
/// and never drops below zero.
pub fn depletion_series(vial: &Vial, logs: &[DoseLog]) -> Vec<UsagePoint> {
    let mut vial_logs: Vec<&DoseLog> = logs.iter().filter(|l| l.vial_id == vial.id).collect();
    vial_logs.sort_by_key(|l| l.date);

    let mut points = Vec::with_capacity(vial_logs.len() + 1);
    points.push(UsagePoint {
        at: vial.date_added,
        remaining_mg: vial.total_mg,
    });

    let mut running = vial.total_mg;
    for log in vial_logs {
        running -= log.dose_mg;
        points.push(UsagePoint {
            at: log.date,
            remaining_mg: running.max(0.0),
        });
    }

    points
}

/// Summarize how much of `vial` has been used.
pub fn usage_summary(vial: &Vial, logs: &[DoseLog], thresholds: &StockThresholds) -> UsageSummary {
    UsageSummary {
        used_mg: vial.used_mg(),
        dose_count: logs.iter().filter(|l| l.vial_id == vial.id).count(),
        percent_remaining: vial.percent_remaining(),
        level: vial.stock_level(thresholds),
    }
}
