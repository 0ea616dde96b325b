//! Record DTOs - identità e timestamp comuni a ogni record persistito

use super::convertible::Convertible;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campi comuni di ogni record: da includere con `#[serde(flatten)]` e `#[sqlx(flatten)]`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BaseRecord {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    // null = attivo, valorizzato = soft-deleted; mai azzerato dal repository
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BaseRecord {
    pub const COLUMNS: &'static [&'static str] = &["id", "created_at", "updated_at", "deleted_at"];

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Convertible for BaseRecord {
    const FIELDS: &'static [&'static str] = BaseRecord::COLUMNS;
}

/// Riferimento a un record esistente (solo id)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecordReference {
    pub id: String,
}

impl Convertible for RecordReference {
    const FIELDS: &'static [&'static str] = &["id"];
}

/// DTO che identificano un record tramite il suo id (update e record completi)
pub trait Referenced {
    fn id(&self) -> &str;
}

impl Referenced for BaseRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Referenced for RecordReference {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_base_record_missing_deleted_at_defaults_to_none() {
        let Value::Object(map) = json!({
            "id": "123",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }) else {
            unreachable!()
        };

        let record = BaseRecord::from_dict(map).unwrap();
        assert_eq!(record.id, "123");
        assert!(record.deleted_at.is_none());
        assert!(!record.is_deleted());
    }

    #[test]
    fn test_base_record_rejects_invalid_timestamp() {
        let Value::Object(map) = json!({
            "id": "123",
            "created_at": "invalid_date",
            "updated_at": "2024-05-01T10:00:00Z"
        }) else {
            unreachable!()
        };

        assert!(BaseRecord::from_dict(map).is_err());
    }
}
