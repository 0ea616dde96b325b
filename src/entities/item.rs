//! Item entity - Entità di esempio servita dal binario

use crate::dtos::{BaseRecord, Convertible, ItemDTO};
use crate::repositories::Entity;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Item {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: BaseRecord,
    pub name: String,
    pub order: i64,
}

impl Item {
    /// Schema della tabella, con un indice composito per ogni coppia paginabile
    pub const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS "items" (
            "id" TEXT PRIMARY KEY NOT NULL,
            "created_at" TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            "updated_at" TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            "deleted_at" TEXT,
            "name" TEXT NOT NULL UNIQUE,
            "order" INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS "ix_items_order_id" ON "items" ("order", "id");
        CREATE INDEX IF NOT EXISTS "ix_items_created_at_id" ON "items" ("created_at", "id");
    "#;
}

impl Convertible for Item {
    const FIELDS: &'static [&'static str] = &["id", "created_at", "updated_at", "deleted_at", "name", "order"];
}

impl Entity for Item {
    const TABLE: &'static str = "items";
    type Record = ItemDTO;

    fn meta(&self) -> &BaseRecord {
        &self.base
    }
}
