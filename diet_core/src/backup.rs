//! Backup export and import.
//!
//! A backup is one JSON document holding the full record set of all four
//! collections plus an export timestamp and a schema version. Import is a
//! destructive overwrite: the document either replaces the entire store
//! or, on any parse/validation failure, changes nothing.

use crate::store::{DietStore, Snapshot};
use crate::types::{Food, MealLog, User, WeightLog};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema version written into every export
pub const BACKUP_VERSION: u32 = 1;

/// Array fields a backup document must carry
const REQUIRED_FIELDS: [&str; 4] = ["users", "foods", "mealLogs", "weightLogs"];

/// The backup document shape
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BackupDocument {
    pub users: Vec<User>,
    pub foods: Vec<Food>,
    #[serde(rename = "mealLogs")]
    pub meal_logs: Vec<MealLog>,
    #[serde(rename = "weightLogs")]
    pub weight_logs: Vec<WeightLog>,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl From<BackupDocument> for Snapshot {
    fn from(doc: BackupDocument) -> Self {
        Snapshot {
            users: doc.users,
            foods: doc.foods,
            meal_logs: doc.meal_logs,
            weight_logs: doc.weight_logs,
        }
    }
}

/// Build a backup document from a store snapshot
pub fn export_document(snapshot: Snapshot, exported_at: DateTime<Utc>) -> BackupDocument {
    BackupDocument {
        users: snapshot.users,
        foods: snapshot.foods,
        meal_logs: snapshot.meal_logs,
        weight_logs: snapshot.weight_logs,
        timestamp: exported_at,
        version: BACKUP_VERSION,
    }
}

/// File name convention: `diet_tracker_backup_<epoch-millis>.json`
pub fn backup_file_name(exported_at: DateTime<Utc>) -> String {
    format!("diet_tracker_backup_{}.json", exported_at.timestamp_millis())
}

/// Write a backup of the store into `dir`, returning the file path
pub fn write_backup(store: &DietStore, dir: &Path, exported_at: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let doc = export_document(store.snapshot(), exported_at);
    let path = dir.join(backup_file_name(exported_at));
    std::fs::write(&path, serde_json::to_string(&doc)?)?;
    tracing::info!("Exported backup to {:?}", path);
    Ok(path)
}

/// Parse a backup document, checking the four array fields are present
/// before deserializing the records
pub fn parse_document(raw: &str) -> Result<BackupDocument> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::Validation("backup document is not a JSON object".into()))?;
    for field in REQUIRED_FIELDS {
        match object.get(field) {
            Some(v) if v.is_array() => {}
            Some(_) => {
                return Err(Error::Validation(format!(
                    "backup field `{}` is not an array",
                    field
                )))
            }
            None => {
                return Err(Error::Validation(format!(
                    "backup document missing field `{}`",
                    field
                )))
            }
        }
    }

    let doc: BackupDocument = serde_json::from_value(value)?;
    Ok(doc)
}

/// Import a backup document, atomically replacing all store content
///
/// Returns the imported document so callers can report what was restored.
/// On failure the prior store content is fully retained.
pub fn import(store: &mut DietStore, raw: &str) -> Result<BackupDocument> {
    let doc = parse_document(raw)?;
    store.replace_all(Snapshot::from(doc.clone()))?;
    tracing::info!(
        "Imported backup from {} ({} users, {} foods, {} meal logs, {} weight logs)",
        doc.timestamp,
        doc.users.len(),
        doc.foods.len(),
        doc.meal_logs.len(),
        doc.weight_logs.len()
    );
    Ok(doc)
}
