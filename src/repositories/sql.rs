//! Helper SQL condivisi: identificatori quotati e binding di valori dinamici

use super::errors::RepositoryError;
use super::traits::{Db, DbRow, Entity};
use crate::dtos::Scalar;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Row, TypeInfo, ValueRef};

/// Timestamp corrente nello stesso formato testuale RFC3339 dei default di colonna
pub const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Colonne timestamp comuni a ogni record
const TIMESTAMP_FIELDS: &[&str] = &["created_at", "updated_at", "deleted_at"];

/// Riscrive i timestamp testuali in UTC con millisecondi, lo stesso formato di [`NOW`].
///
/// Sono confrontati come testo (ordinamento e cursori): formati misti romperebbero l'ordine.
pub fn normalize_timestamps(fields: &mut Map<String, Value>) -> Result<(), RepositoryError> {
    for key in TIMESTAMP_FIELDS {
        let Some(Value::String(text)) = fields.get_mut(*key) else {
            continue;
        };
        let parsed = DateTime::parse_from_rfc3339(text).map_err(|_| RepositoryError::InvalidTimestamp {
            field: key.to_string(),
            value: text.clone(),
        })?;
        *text = parsed.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    Ok(())
}

/// Quota un identificatore (tabella o colonna): `order` è una parola riservata
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Colonna quotata di `E`, solo se il nome è tra i campi dell'entity
pub fn column<E: Entity>(field: &str) -> Result<String, RepositoryError> {
    if E::has_field(field) {
        Ok(quote_ident(field))
    } else {
        Err(RepositoryError::UnknownField {
            entity: E::type_name(),
            field: field.to_string(),
        })
    }
}

pub fn push_scalar(query: &mut QueryBuilder<'_, Db>, value: &Scalar) {
    match value {
        Scalar::Bool(b) => query.push_bind(*b),
        Scalar::Int(i) => query.push_bind(*i),
        Scalar::Float(f) => query.push_bind(*f),
        Scalar::Text(s) => query.push_bind(s.clone()),
    };
}

/// Binding di un valore JSON arbitrario; array e oggetti vengono salvati come testo JSON
pub fn push_value(query: &mut QueryBuilder<'_, Db>, value: &Value) {
    match value {
        Value::Null => query.push_bind(None::<String>),
        Value::Bool(b) => query.push_bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.push_bind(i),
            None => query.push_bind(n.as_f64()),
        },
        Value::String(s) => query.push_bind(s.clone()),
        other => query.push_bind(other.to_string()),
    };
}

/// Legge il valore grezzo di una colonna così come è memorizzato.
///
/// Usato per i cursori: confrontare il valore memorizzato (e non quello
/// ri-serializzato dall'entity) mantiene esatti i confronti del keyset.
pub fn raw_value(row: &DbRow, column: &str) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(column)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let kind = raw.type_info().name().to_string();
    let value = match kind.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(column)?),
        "REAL" => Value::from(row.try_get_unchecked::<f64, _>(column)?),
        _ => Value::from(row.try_get_unchecked::<String, _>(column)?),
    };
    Ok(value)
}
