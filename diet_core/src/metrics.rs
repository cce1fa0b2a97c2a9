//! Derived metrics over raw records.
//!
//! Pure, stateless functions: the caller fetches records from the store
//! and supplies "today" explicitly, so every result is reproducible in
//! tests. Missing cross-references (a meal log pointing at a deleted
//! food) never raise; the entry just contributes nothing.

use crate::types::{Food, MealLog, WeightLog};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Body Mass Index: weight (kg) over height (m) squared, one decimal
///
/// Returns `None` when either input is non-positive or not finite.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if !weight_kg.is_finite() || !height_cm.is_finite() {
        return None;
    }
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(round1(weight_kg / (height_m * height_m)))
}

/// Sum of `food.calories * log.quantity` over logs whose food still exists
pub fn daily_calorie_total(meal_logs: &[MealLog], foods: &[Food]) -> f64 {
    meal_logs
        .iter()
        .filter_map(|log| {
            foods
                .iter()
                .find(|f| f.id == log.food_id)
                .map(|f| f.calories * log.quantity)
        })
        .sum()
}

/// Difference between the two most recent weight logs, one decimal
///
/// `None` with fewer than two entries.
pub fn weight_delta(weight_logs: &[WeightLog]) -> Option<f64> {
    if weight_logs.len() < 2 {
        return None;
    }
    let mut logs: Vec<&WeightLog> = weight_logs.iter().collect();
    logs.sort_by_key(|l| l.date);
    let latest = logs[logs.len() - 1];
    let previous = logs[logs.len() - 2];
    Some(round1(latest.weight_kg - previous.weight_kg))
}

/// Signed difference between current weight and the target, one decimal
pub fn target_delta(current_kg: f64, target_kg: f64) -> f64 {
    round1(current_kg - target_kg)
}

/// "Remaining to reach target", floored at zero once the target is passed
pub fn target_remaining(current_kg: f64, target_kg: f64) -> f64 {
    target_delta(current_kg, target_kg).max(0.0)
}

/// Chart aggregation mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartMode {
    Daily,
    Monthly,
}

/// One plotted point
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub weight: f64,
}

/// Vertical axis bounds for the weight chart
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisBounds {
    /// Lowest plotted weight - 2 through highest plotted weight + 2
    Fixed { min: f64, max: f64 },
    /// No data points: let the renderer fit whatever it has
    FitData,
}

/// Build the weight trend series
///
/// Daily mode keeps the trailing 30 days from `today` (inclusive at
/// exactly 30 days back) in chronological order. Monthly mode buckets
/// all logs by calendar month and plots the mean weight per month.
pub fn weight_series(weight_logs: &[WeightLog], mode: ChartMode, today: NaiveDate) -> Vec<ChartPoint> {
    let mut logs: Vec<&WeightLog> = weight_logs.iter().collect();
    logs.sort_by_key(|l| l.date);

    match mode {
        ChartMode::Daily => {
            let cutoff = today - Duration::days(30);
            logs.iter()
                .filter(|l| l.date >= cutoff)
                .map(|l| ChartPoint {
                    label: l.date.format("%m/%d").to_string(),
                    weight: l.weight_kg,
                })
                .collect()
        }
        ChartMode::Monthly => {
            let mut buckets: BTreeMap<(i32, u32), (f64, u32)> = BTreeMap::new();
            for log in &logs {
                let entry = buckets.entry((log.date.year(), log.date.month())).or_insert((0.0, 0));
                entry.0 += log.weight_kg;
                entry.1 += 1;
            }
            buckets
                .into_iter()
                .map(|((year, month), (sum, count))| ChartPoint {
                    label: format!("{:04}/{:02}", year, month),
                    weight: round1(sum / count as f64),
                })
                .collect()
        }
    }
}

/// Axis bounds: two kilograms of headroom either side of the data
pub fn axis_bounds(points: &[ChartPoint]) -> AxisBounds {
    let mut weights = points.iter().map(|p| p.weight);
    let first = match weights.next() {
        Some(w) => w,
        None => return AxisBounds::FitData,
    };
    let (min, max) = weights.fold((first, first), |(min, max), w| (min.min(w), max.max(w)));
    AxisBounds::Fixed {
        min: min - 2.0,
        max: max + 2.0,
    }
}
