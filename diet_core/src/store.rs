//! The embedded record store.
//!
//! All four collections live in one JSON database file under the data
//! directory. Every mutating operation validates its input, applies the
//! change in memory, writes the whole database atomically (temp file +
//! exclusive lock + rename), and then notifies subscribers. After a
//! mutating call returns, a fresh read reflects the change.
//!
//! The store is accessed through `&mut self`, so two mutating calls can
//! never race. A multi-threaded caller has to wrap the store in a lock,
//! which the receiver type forces.

use crate::types::{Collection, Food, Gender, MealLog, MealType, User, WeightLog};
use crate::{Error, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Change notification published after a committed mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreEvent {
    pub collection: Collection,
}

/// The full record set of all four collections
///
/// This is both the on-disk shape of the database file and the unit of
/// atomic bulk operations (import, restore, reset).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub foods: Vec<Food>,
    #[serde(default)]
    pub meal_logs: Vec<MealLog>,
    #[serde(default)]
    pub weight_logs: Vec<WeightLog>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.foods.is_empty()
            && self.meal_logs.is_empty()
            && self.weight_logs.is_empty()
    }

    /// Check every record's field constraints and id uniqueness
    pub fn validate(&self) -> Result<()> {
        for user in &self.users {
            user.validate()?;
        }
        for food in &self.foods {
            food.validate()?;
        }
        for log in &self.meal_logs {
            log.validate()?;
        }
        for log in &self.weight_logs {
            log.validate()?;
        }
        check_unique_ids(Collection::Users, self.users.iter().map(|u| u.id))?;
        check_unique_ids(Collection::Foods, self.foods.iter().map(|f| f.id))?;
        check_unique_ids(Collection::MealLogs, self.meal_logs.iter().map(|l| l.id))?;
        check_unique_ids(
            Collection::WeightLogs,
            self.weight_logs.iter().map(|l| l.id),
        )?;
        Ok(())
    }

    /// Restore the sort order the query paths rely on: foods by
    /// (user, name), logs by (user, date). Stable, so records sharing a
    /// key keep their insertion order.
    fn sort(&mut self) {
        self.foods
            .sort_by(|a, b| (a.user_id, &a.name).cmp(&(b.user_id, &b.name)));
        self.meal_logs.sort_by_key(|l| (l.user_id, l.date));
        self.weight_logs.sort_by_key(|l| (l.user_id, l.date));
    }
}

fn check_unique_ids(collection: Collection, ids: impl Iterator<Item = Uuid>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::DuplicateKey { collection, id });
        }
    }
    Ok(())
}

/// Partial update for a user record
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub height_cm: Option<f64>,
    pub target_weight_kg: Option<f64>,
    pub target_calories: Option<i64>,
    pub gender: Option<Gender>,
}

impl UserPatch {
    fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(height_cm) = self.height_cm {
            user.height_cm = height_cm;
        }
        if let Some(target_weight_kg) = self.target_weight_kg {
            user.target_weight_kg = target_weight_kg;
        }
        if let Some(target_calories) = self.target_calories {
            user.target_calories = target_calories;
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
    }
}

/// Partial update for a food record
#[derive(Clone, Debug, Default)]
pub struct FoodPatch {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub unit: Option<String>,
}

impl FoodPatch {
    fn apply(self, food: &mut Food) {
        if let Some(name) = self.name {
            food.name = name;
        }
        if let Some(calories) = self.calories {
            food.calories = calories;
        }
        if let Some(unit) = self.unit {
            food.unit = unit;
        }
    }
}

/// Partial update for a meal log record
#[derive(Clone, Debug, Default)]
pub struct MealLogPatch {
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
    pub food_id: Option<Uuid>,
    pub quantity: Option<f64>,
}

impl MealLogPatch {
    fn apply(self, log: &mut MealLog) {
        if let Some(date) = self.date {
            log.date = date;
        }
        if let Some(meal_type) = self.meal_type {
            log.meal_type = meal_type;
        }
        if let Some(food_id) = self.food_id {
            log.food_id = food_id;
        }
        if let Some(quantity) = self.quantity {
            log.quantity = quantity;
        }
    }
}

/// Partial update for a weight log record
#[derive(Clone, Debug, Default)]
pub struct WeightLogPatch {
    pub date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
}

impl WeightLogPatch {
    fn apply(self, log: &mut WeightLog) {
        if let Some(date) = self.date {
            log.date = date;
        }
        if let Some(weight_kg) = self.weight_kg {
            log.weight_kg = weight_kg;
        }
    }
}

/// The embedded diet-tracker database
pub struct DietStore {
    path: PathBuf,
    data: Snapshot,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl DietStore {
    /// Open the database file, creating an empty store if it is missing
    ///
    /// A corrupt database file is surfaced as an error, never silently
    /// replaced: the file holds the user's only copy of their records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut data = load_snapshot(&path)?;
        data.sort();
        tracing::debug!(
            "Opened store at {:?} ({} users, {} foods, {} meal logs, {} weight logs)",
            path,
            data.users.len(),
            data.foods.len(),
            data.meal_logs.len(),
            data.weight_logs.len()
        );
        Ok(Self {
            path,
            data,
            subscribers: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a live observer; every committed mutation sends one event
    /// per affected collection
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, collection: Collection) {
        self.subscribers
            .retain(|tx| tx.send(StoreEvent { collection }).is_ok());
    }

    /// Persist the current record set, then notify observers
    ///
    /// On a failed write the previous on-disk state is reloaded into
    /// memory so the store and the file never diverge.
    fn commit(&mut self, changed: &[Collection]) -> Result<()> {
        match write_snapshot(&self.path, &self.data) {
            Ok(()) => {
                for collection in changed {
                    self.publish(*collection);
                }
                Ok(())
            }
            Err(e) => {
                if let Ok(mut prev) = load_snapshot(&self.path) {
                    prev.sort();
                    self.data = prev;
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub fn add_user(&mut self, user: User) -> Result<()> {
        user.validate()?;
        self.check_new_id(Collection::Users, user.id)?;
        self.data.users.push(user);
        self.commit(&[Collection::Users])
    }

    pub fn update_user(&mut self, id: Uuid, patch: UserPatch) -> Result<User> {
        let pos = self
            .data
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(Error::NotFound {
                collection: Collection::Users,
                id,
            })?;
        let mut updated = self.data.users[pos].clone();
        patch.apply(&mut updated);
        updated.validate()?;
        self.data.users[pos] = updated.clone();
        self.commit(&[Collection::Users])?;
        Ok(updated)
    }

    /// Idempotent: deleting an unknown id is a no-op
    pub fn delete_user(&mut self, id: Uuid) -> Result<()> {
        let before = self.data.users.len();
        self.data.users.retain(|u| u.id != id);
        if self.data.users.len() == before {
            return Ok(());
        }
        self.commit(&[Collection::Users])
    }

    pub fn list_users(&self) -> &[User] {
        &self.data.users
    }

    pub fn find_user(&self, id: Uuid) -> Option<&User> {
        self.data.users.iter().find(|u| u.id == id)
    }

    // ========================================================================
    // Foods
    // ========================================================================

    pub fn add_food(&mut self, food: Food) -> Result<()> {
        food.validate()?;
        self.check_new_id(Collection::Foods, food.id)?;
        self.data.foods.push(food);
        self.data.sort();
        self.commit(&[Collection::Foods])
    }

    pub fn update_food(&mut self, id: Uuid, patch: FoodPatch) -> Result<Food> {
        let pos = self
            .data
            .foods
            .iter()
            .position(|f| f.id == id)
            .ok_or(Error::NotFound {
                collection: Collection::Foods,
                id,
            })?;
        let mut updated = self.data.foods[pos].clone();
        patch.apply(&mut updated);
        updated.validate()?;
        self.data.foods[pos] = updated.clone();
        self.data.sort();
        self.commit(&[Collection::Foods])?;
        Ok(updated)
    }

    /// Idempotent; meal logs referencing the food are left in place and
    /// simply stop contributing to calorie totals
    pub fn delete_food(&mut self, id: Uuid) -> Result<()> {
        let before = self.data.foods.len();
        self.data.foods.retain(|f| f.id != id);
        if self.data.foods.len() == before {
            return Ok(());
        }
        self.commit(&[Collection::Foods])
    }

    pub fn find_food(&self, id: Uuid) -> Option<&Food> {
        self.data.foods.iter().find(|f| f.id == id)
    }

    /// All foods owned by the user, ordered by name
    pub fn foods_for(&self, user_id: Uuid) -> &[Food] {
        let start = self.data.foods.partition_point(|f| f.user_id < user_id);
        let end = self.data.foods.partition_point(|f| f.user_id <= user_id);
        &self.data.foods[start..end]
    }

    // ========================================================================
    // Meal logs
    // ========================================================================

    pub fn add_meal_log(&mut self, log: MealLog) -> Result<()> {
        log.validate()?;
        self.check_new_id(Collection::MealLogs, log.id)?;
        self.data.meal_logs.push(log);
        self.data.sort();
        self.commit(&[Collection::MealLogs])
    }

    pub fn update_meal_log(&mut self, id: Uuid, patch: MealLogPatch) -> Result<MealLog> {
        let pos = self
            .data
            .meal_logs
            .iter()
            .position(|l| l.id == id)
            .ok_or(Error::NotFound {
                collection: Collection::MealLogs,
                id,
            })?;
        let mut updated = self.data.meal_logs[pos].clone();
        patch.apply(&mut updated);
        updated.validate()?;
        self.data.meal_logs[pos] = updated.clone();
        self.data.sort();
        self.commit(&[Collection::MealLogs])?;
        Ok(updated)
    }

    pub fn delete_meal_log(&mut self, id: Uuid) -> Result<()> {
        let before = self.data.meal_logs.len();
        self.data.meal_logs.retain(|l| l.id != id);
        if self.data.meal_logs.len() == before {
            return Ok(());
        }
        self.commit(&[Collection::MealLogs])
    }

    /// All meal logs for the user, ordered by date
    pub fn meal_logs_for(&self, user_id: Uuid) -> &[MealLog] {
        let rows = &self.data.meal_logs;
        let start = rows.partition_point(|l| l.user_id < user_id);
        let end = rows.partition_point(|l| l.user_id <= user_id);
        &rows[start..end]
    }

    /// Compound-key lookup: one day's meal logs for the user
    pub fn meal_logs_on(&self, user_id: Uuid, date: NaiveDate) -> &[MealLog] {
        let rows = &self.data.meal_logs;
        let start = rows.partition_point(|l| (l.user_id, l.date) < (user_id, date));
        let end = rows.partition_point(|l| (l.user_id, l.date) <= (user_id, date));
        &rows[start..end]
    }

    // ========================================================================
    // Weight logs
    // ========================================================================

    pub fn add_weight_log(&mut self, log: WeightLog) -> Result<()> {
        log.validate()?;
        self.check_new_id(Collection::WeightLogs, log.id)?;
        self.data.weight_logs.push(log);
        self.data.sort();
        self.commit(&[Collection::WeightLogs])
    }

    pub fn update_weight_log(&mut self, id: Uuid, patch: WeightLogPatch) -> Result<WeightLog> {
        let pos = self
            .data
            .weight_logs
            .iter()
            .position(|l| l.id == id)
            .ok_or(Error::NotFound {
                collection: Collection::WeightLogs,
                id,
            })?;
        let mut updated = self.data.weight_logs[pos].clone();
        patch.apply(&mut updated);
        updated.validate()?;
        self.data.weight_logs[pos] = updated.clone();
        self.data.sort();
        self.commit(&[Collection::WeightLogs])?;
        Ok(updated)
    }

    pub fn delete_weight_log(&mut self, id: Uuid) -> Result<()> {
        let before = self.data.weight_logs.len();
        self.data.weight_logs.retain(|l| l.id != id);
        if self.data.weight_logs.len() == before {
            return Ok(());
        }
        self.commit(&[Collection::WeightLogs])
    }

    /// All weight logs for the user, ordered by date
    pub fn weight_logs_for(&self, user_id: Uuid) -> &[WeightLog] {
        let rows = &self.data.weight_logs;
        let start = rows.partition_point(|l| l.user_id < user_id);
        let end = rows.partition_point(|l| l.user_id <= user_id);
        &rows[start..end]
    }

    /// Compound-key lookup on (user, date)
    pub fn find_weight_log(&self, user_id: Uuid, date: NaiveDate) -> Option<&WeightLog> {
        self.data
            .weight_logs
            .binary_search_by(|l| (l.user_id, l.date).cmp(&(user_id, date)))
            .ok()
            .map(|idx| &self.data.weight_logs[idx])
    }

    /// Record a weight measurement, keeping at most one log per (user, date)
    ///
    /// Find-then-write: an existing log for the date is updated in place,
    /// otherwise a fresh record is inserted. The sequence cannot be
    /// interleaved with another write because it runs under `&mut self`.
    pub fn log_weight(&mut self, user_id: Uuid, date: NaiveDate, weight_kg: f64) -> Result<WeightLog> {
        match self.find_weight_log(user_id, date).map(|l| l.id) {
            Some(id) => {
                tracing::debug!("Updating weight log for {} on {}", user_id, date);
                self.update_weight_log(
                    id,
                    WeightLogPatch {
                        weight_kg: Some(weight_kg),
                        ..WeightLogPatch::default()
                    },
                )
            }
            None => {
                let log = WeightLog::new(user_id, date, weight_kg);
                self.add_weight_log(log.clone())?;
                Ok(log)
            }
        }
    }

    // ========================================================================
    // Whole-store operations
    // ========================================================================

    /// Clone of the full record set (used by export)
    pub fn snapshot(&self) -> Snapshot {
        self.data.clone()
    }

    /// Empty all four collections in one atomic write
    pub fn clear_all(&mut self) -> Result<()> {
        let prev = std::mem::take(&mut self.data);
        match self.commit(&Collection::ALL) {
            Ok(()) => {
                tracing::info!(
                    "Cleared store ({} users, {} foods, {} meal logs, {} weight logs removed)",
                    prev.users.len(),
                    prev.foods.len(),
                    prev.meal_logs.len(),
                    prev.weight_logs.len()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Insert a batch of records across collections in one atomic unit
    ///
    /// Nothing is applied unless the whole batch validates and no id
    /// collides with an existing record.
    pub fn bulk_add(&mut self, batch: Snapshot) -> Result<()> {
        batch.validate()?;
        for user in &batch.users {
            self.check_new_id(Collection::Users, user.id)?;
        }
        for food in &batch.foods {
            self.check_new_id(Collection::Foods, food.id)?;
        }
        for log in &batch.meal_logs {
            self.check_new_id(Collection::MealLogs, log.id)?;
        }
        for log in &batch.weight_logs {
            self.check_new_id(Collection::WeightLogs, log.id)?;
        }

        let mut changed = Vec::new();
        if !batch.users.is_empty() {
            changed.push(Collection::Users);
        }
        if !batch.foods.is_empty() {
            changed.push(Collection::Foods);
        }
        if !batch.meal_logs.is_empty() {
            changed.push(Collection::MealLogs);
        }
        if !batch.weight_logs.is_empty() {
            changed.push(Collection::WeightLogs);
        }
        if changed.is_empty() {
            return Ok(());
        }

        self.data.users.extend(batch.users);
        self.data.foods.extend(batch.foods);
        self.data.meal_logs.extend(batch.meal_logs);
        self.data.weight_logs.extend(batch.weight_logs);
        self.data.sort();
        self.commit(&changed)
    }

    /// Destructive overwrite of the entire store, all-or-nothing
    ///
    /// Used by import/restore. A validation or write failure leaves the
    /// prior content fully intact.
    pub fn replace_all(&mut self, mut snapshot: Snapshot) -> Result<()> {
        snapshot.validate()?;
        snapshot.sort();
        let prev = std::mem::replace(&mut self.data, snapshot);
        match self.commit(&Collection::ALL) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.data = prev;
                Err(e)
            }
        }
    }

    fn check_new_id(&self, collection: Collection, id: Uuid) -> Result<()> {
        let exists = match collection {
            Collection::Users => self.data.users.iter().any(|u| u.id == id),
            Collection::Foods => self.data.foods.iter().any(|f| f.id == id),
            Collection::MealLogs => self.data.meal_logs.iter().any(|l| l.id == id),
            Collection::WeightLogs => self.data.weight_logs.iter().any(|l| l.id == id),
        };
        if exists {
            return Err(Error::DuplicateKey { collection, id });
        }
        Ok(())
    }
}

/// Read the database file with a shared lock
///
/// A missing file is an empty store; a file that cannot be parsed is an
/// error the caller must deal with.
fn load_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        tracing::info!("No database file at {:?}, starting empty", path);
        return Ok(Snapshot::default());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    let read_result = reader.read_to_string(&mut contents);
    file.unlock()?;
    read_result?;

    let snapshot = serde_json::from_str::<Snapshot>(&contents)?;
    Ok(snapshot)
}

/// Atomically write the database file
///
/// 1. Write to a locked temp file in the same directory
/// 2. Sync to disk
/// 3. Rename over the original
fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "database path missing parent",
        ))
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        let contents = serde_json::to_string(snapshot)?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved database to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> DietStore {
        DietStore::open(dir.path().join("diet.json")).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_user(store: &mut DietStore, name: &str) -> Uuid {
        let user = User::new(name, 170.0, 65.0, 2000, Gender::Other);
        let id = user.id;
        store.add_user(user).unwrap();
        id
    }

    #[test]
    fn test_records_scoped_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");
        let bob = seeded_user(&mut store, "Bob");

        store.add_food(Food::new(alice, "Rice", 156.0, "100g")).unwrap();
        store.add_food(Food::new(bob, "Bread", 264.0, "100g")).unwrap();
        store
            .add_weight_log(WeightLog::new(alice, date(2024, 3, 1), 64.5))
            .unwrap();

        assert_eq!(store.foods_for(alice).len(), 1);
        assert_eq!(store.foods_for(alice)[0].name, "Rice");
        assert_eq!(store.foods_for(bob).len(), 1);
        assert_eq!(store.weight_logs_for(bob).len(), 0);
    }

    #[test]
    fn test_add_duplicate_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        store.add_food(food.clone()).unwrap();
        let result = store.add_food(food);
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
    }

    #[test]
    fn test_update_merges_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        let id = food.id;
        store.add_food(food).unwrap();

        let updated = store
            .update_food(
                id,
                FoodPatch {
                    calories: Some(168.0),
                    ..FoodPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.calories, 168.0);
        assert_eq!(updated.name, "Rice");
        assert_eq!(updated.unit, "100g");
    }

    #[test]
    fn test_update_missing_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        let result = store.update_food(Uuid::new_v4(), FoodPatch::default());
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_update_rejects_invalid_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let result = store.update_user(
            alice,
            UserPatch {
                height_cm: Some(-10.0),
                ..UserPatch::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));

        // The record is untouched
        assert_eq!(store.find_user(alice).unwrap().height_cm, 170.0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        let id = food.id;
        store.add_food(food).unwrap();

        store.delete_food(id).unwrap();
        assert!(store.find_food(id).is_none());

        // Second delete of the same id is a no-op, not an error
        store.delete_food(id).unwrap();
        store.delete_food(Uuid::new_v4()).unwrap();
    }

    #[test]
    fn test_log_weight_upserts_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");
        let day = date(2024, 3, 10);

        store.log_weight(alice, day, 66.0).unwrap();
        store.log_weight(alice, day, 65.4).unwrap();

        let logs = store.weight_logs_for(alice);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].weight_kg, 65.4);
        assert_eq!(logs[0].date, day);
    }

    #[test]
    fn test_log_weight_separate_days_and_users() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");
        let bob = seeded_user(&mut store, "Bob");
        let day = date(2024, 3, 10);

        store.log_weight(alice, day, 66.0).unwrap();
        store.log_weight(alice, date(2024, 3, 11), 65.8).unwrap();
        store.log_weight(bob, day, 80.0).unwrap();

        assert_eq!(store.weight_logs_for(alice).len(), 2);
        assert_eq!(store.weight_logs_for(bob).len(), 1);
        assert_eq!(
            store.find_weight_log(alice, day).unwrap().weight_kg,
            66.0
        );
    }

    #[test]
    fn test_weight_logs_ordered_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        store.log_weight(alice, date(2024, 3, 12), 65.0).unwrap();
        store.log_weight(alice, date(2024, 3, 10), 66.0).unwrap();
        store.log_weight(alice, date(2024, 3, 11), 65.5).unwrap();

        let dates: Vec<NaiveDate> = store
            .weight_logs_for(alice)
            .iter()
            .map(|l| l.date)
            .collect();
        assert_eq!(
            dates,
            vec![date(2024, 3, 10), date(2024, 3, 11), date(2024, 3, 12)]
        );
    }

    #[test]
    fn test_meal_logs_on_compound_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        let food_id = food.id;
        store.add_food(food).unwrap();

        let day = date(2024, 3, 10);
        store
            .add_meal_log(MealLog::new(alice, day, MealType::Breakfast, food_id, 1.0))
            .unwrap();
        store
            .add_meal_log(MealLog::new(alice, day, MealType::Dinner, food_id, 2.0))
            .unwrap();
        store
            .add_meal_log(MealLog::new(
                alice,
                date(2024, 3, 11),
                MealType::Lunch,
                food_id,
                1.0,
            ))
            .unwrap();

        assert_eq!(store.meal_logs_on(alice, day).len(), 2);
        assert_eq!(store.meal_logs_for(alice).len(), 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diet.json");
        let alice;
        {
            let mut store = DietStore::open(&path).unwrap();
            alice = seeded_user(&mut store, "Alice");
            store.log_weight(alice, date(2024, 3, 10), 66.0).unwrap();
        }

        let store = DietStore::open(&path).unwrap();
        assert_eq!(store.list_users().len(), 1);
        assert_eq!(store.weight_logs_for(alice).len(), 1);
    }

    #[test]
    fn test_corrupt_database_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diet.json");
        std::fs::write(&path, "{ not json }").unwrap();

        assert!(DietStore::open(&path).is_err());
    }

    #[test]
    fn test_clear_all_empties_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        let food_id = food.id;
        store.add_food(food).unwrap();
        store
            .add_meal_log(MealLog::new(
                alice,
                date(2024, 3, 10),
                MealType::Lunch,
                food_id,
                1.0,
            ))
            .unwrap();
        store.log_weight(alice, date(2024, 3, 10), 66.0).unwrap();

        store.clear_all().unwrap();

        assert!(store.list_users().is_empty());
        assert!(store.foods_for(alice).is_empty());
        assert!(store.meal_logs_for(alice).is_empty());
        assert!(store.weight_logs_for(alice).is_empty());
    }

    #[test]
    fn test_bulk_add_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let food = Food::new(alice, "Rice", 156.0, "100g");
        store.add_food(food.clone()).unwrap();

        // Batch contains a food whose id already exists: nothing applies
        let batch = Snapshot {
            foods: vec![Food::new(alice, "Bread", 264.0, "100g"), food],
            weight_logs: vec![WeightLog::new(alice, date(2024, 3, 10), 66.0)],
            ..Snapshot::default()
        };
        let result = store.bulk_add(batch);
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
        assert_eq!(store.foods_for(alice).len(), 1);
        assert!(store.weight_logs_for(alice).is_empty());

        // A clean batch applies in one unit
        let batch = Snapshot {
            foods: vec![Food::new(alice, "Bread", 264.0, "100g")],
            weight_logs: vec![WeightLog::new(alice, date(2024, 3, 10), 66.0)],
            ..Snapshot::default()
        };
        store.bulk_add(batch).unwrap();
        assert_eq!(store.foods_for(alice).len(), 2);
        assert_eq!(store.weight_logs_for(alice).len(), 1);
    }

    #[test]
    fn test_replace_all_overwrites_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");
        store.log_weight(alice, date(2024, 3, 10), 66.0).unwrap();

        let carol = User::new("Carol", 160.0, 52.0, 1800, Gender::Female);
        let carol_id = carol.id;
        let snapshot = Snapshot {
            users: vec![carol],
            ..Snapshot::default()
        };
        store.replace_all(snapshot).unwrap();

        assert!(store.find_user(alice).is_none());
        assert!(store.find_user(carol_id).is_some());
        assert!(store.weight_logs_for(alice).is_empty());
    }

    #[test]
    fn test_replace_all_rejects_invalid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let alice = seeded_user(&mut store, "Alice");

        let snapshot = Snapshot {
            users: vec![User::new("Broken", -5.0, 52.0, 1800, Gender::Other)],
            ..Snapshot::default()
        };
        assert!(store.replace_all(snapshot).is_err());

        // Prior content fully retained
        assert!(store.find_user(alice).is_some());
    }

    #[test]
    fn test_subscribers_notified_after_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);
        let events = store.subscribe();

        let alice = seeded_user(&mut store, "Alice");
        store.log_weight(alice, date(2024, 3, 10), 66.0).unwrap();

        let received: Vec<Collection> = events.try_iter().map(|e| e.collection).collect();
        assert_eq!(received, vec![Collection::Users, Collection::WeightLogs]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(&dir);

        drop(store.subscribe());
        seeded_user(&mut store, "Alice");
        assert!(store.subscribers.is_empty());
    }
}
