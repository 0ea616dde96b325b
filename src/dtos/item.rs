//! Item DTOs - Data Transfer Objects per gli item

use super::convertible::{Convertible, MaybeSet};
use super::record::{BaseRecord, Referenced};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Proiezione completa di un item restituita al client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemDTO {
    #[serde(flatten)]
    pub base: BaseRecord,
    pub name: String,
    pub order: i64,
}

impl Convertible for ItemDTO {
    const FIELDS: &'static [&'static str] = &["id", "created_at", "updated_at", "deleted_at", "name", "order"];
}

impl Referenced for ItemDTO {
    fn id(&self) -> &str {
        &self.base.id
    }
}

/// DTO per creare un nuovo item (senza id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateItemDTO {
    #[validate(length(min = 1, max = 255, message = "Item name must be between 1 and 255 characters"))]
    pub name: String,
    pub order: i64,
}

impl Convertible for CreateItemDTO {
    const FIELDS: &'static [&'static str] = &["name", "order"];
}

/// DTO per aggiornare un item: i campi omessi restano invariati
#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateItemDTO {
    pub id: String,
    #[serde(default, skip_serializing_if = "MaybeSet::is_unset")]
    #[validate(custom(function = "validate_name"))]
    pub name: MaybeSet<String>,
    #[serde(default, skip_serializing_if = "MaybeSet::is_unset")]
    pub order: MaybeSet<i64>,
}

impl Convertible for UpdateItemDTO {
    const FIELDS: &'static [&'static str] = &["id", "name", "order"];
}

impl Referenced for UpdateItemDTO {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Stessi limiti di `CreateItemDTO::name`, applicati solo se il campo è impostato
fn validate_name(name: &MaybeSet<String>) -> Result<(), ValidationError> {
    match name {
        MaybeSet::Set(name) if name.is_empty() || name.len() > 255 => {
            let mut error = ValidationError::new("length");
            error.message = Some("Item name must be between 1 and 255 characters".into());
            Err(error)
        }
        _ => Ok(()),
    }
}
