//! Core domain types for the diet tracker.
//!
//! This module defines the four persisted record types and their tags:
//! - Users and their profile targets
//! - Foods (per-user calorie catalog entries)
//! - Meal logs (an eating event on a date, referencing a food)
//! - Weight logs (one body-weight measurement per user per date)

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The four record collections held by the store
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Foods,
    MealLogs,
    WeightLogs,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Foods,
        Collection::MealLogs,
        Collection::WeightLogs,
    ];
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Users => "user",
            Collection::Foods => "food",
            Collection::MealLogs => "meal log",
            Collection::WeightLogs => "weight log",
        };
        f.write_str(name)
    }
}

/// Gender tag on a user profile
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Other
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(Error::Validation(format!("unknown gender: {}", other))),
        }
    }
}

/// Daily eating-occasion tag
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Display order used by the daily meal view
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(Error::Validation(format!("unknown meal type: {}", other))),
        }
    }
}

/// A user profile
///
/// Created via onboarding or settings, read by nearly every view,
/// deleted only through a full data reset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub height_cm: f64,
    pub target_weight_kg: f64,
    pub target_calories: i64,
    pub gender: Gender,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        height_cm: f64,
        target_weight_kg: f64,
        target_calories: i64,
        gender: Gender,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            height_cm,
            target_weight_kg,
            target_calories,
            gender,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("user name must not be empty".into()));
        }
        ensure_positive("height_cm", self.height_cm)?;
        ensure_positive("target_weight_kg", self.target_weight_kg)?;
        if self.target_calories <= 0 {
            return Err(Error::Validation(format!(
                "target_calories must be positive, got {}",
                self.target_calories
            )));
        }
        Ok(())
    }
}

/// A calorie catalog entry owned by one user
///
/// `unit` is a free-text label describing the quantity the calorie value
/// applies to, e.g. "100g" or "1 serving".
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub calories: f64,
    pub unit: String,
}

impl Food {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        calories: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            calories,
            unit: unit.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("food name must not be empty".into()));
        }
        if !self.calories.is_finite() || self.calories < 0.0 {
            return Err(Error::Validation(format!(
                "calories must be a non-negative number, got {}",
                self.calories
            )));
        }
        Ok(())
    }
}

/// One logged eating event
///
/// The referenced food may have been deleted since; stale references are
/// tolerated and simply stop contributing to calorie totals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub food_id: Uuid,
    pub quantity: f64,
}

impl MealLog {
    pub fn new(
        user_id: Uuid,
        date: NaiveDate,
        meal_type: MealType,
        food_id: Uuid,
        quantity: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            meal_type,
            food_id,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("quantity", self.quantity)
    }
}

/// One body-weight measurement
///
/// At most one weight log exists per (user, date) pair; see
/// `DietStore::log_weight` for the upsert path that maintains this.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub weight_kg: f64,
}

impl WeightLog {
    pub fn new(user_id: Uuid, date: NaiveDate, weight_kg: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date,
            weight_kg,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("weight_kg", self.weight_kg)
    }
}

fn ensure_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )));
    }
    Ok(())
}
