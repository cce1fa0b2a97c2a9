#![forbid(unsafe_code)]

//! Core data layer and derived metrics for the diet tracker.
//!
//! This crate provides:
//! - Domain types (users, foods, meal logs, weight logs)
//! - The embedded record store with per-user scoping and live observers
//! - Session state (active user)
//! - Derived metrics (BMI, calorie totals, weight trend series)
//! - Backup export/import

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod session;
pub mod metrics;
pub mod backup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{
    DietStore, FoodPatch, MealLogPatch, Snapshot, StoreEvent, UserPatch, WeightLogPatch,
};
pub use session::SessionState;
pub use metrics::{
    axis_bounds, bmi, daily_calorie_total, target_delta, target_remaining, weight_delta,
    weight_series, AxisBounds, ChartMode, ChartPoint,
};
pub use backup::{export_document, import, parse_document, write_backup, BackupDocument};
