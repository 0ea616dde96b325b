//! Common repository traits
//!
//! This module defines what a type must provide to be persisted through the
//! generic [`Repository`](super::Repository).

use crate::dtos::{BaseRecord, ConversionError, Convertible, Fields};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{FromRow, Sqlite};

/// Database backend used by the repositories
pub type Db = Sqlite;
pub type DbRow = SqliteRow;
pub type DbConnection = SqliteConnection;

/// Persistence-side row of a table
///
/// Implementors flatten [`BaseRecord`] (with both `#[serde(flatten)]` and
/// `#[sqlx(flatten)]`) and list every column, base columns included, in
/// [`Convertible::FIELDS`].
///
/// # Type Parameters
/// * `Record` - DTO returned to callers for rows of this table
pub trait Entity:
    Convertible + for<'r> FromRow<'r, DbRow> + Send + Sync + Unpin + 'static
{
    /// Table name, used unquoted only inside quoted identifiers
    const TABLE: &'static str;

    type Record: Convertible + Send;

    /// Identity and timestamps of the row
    fn meta(&self) -> &BaseRecord;

    /// Checks whether `name` is a column of the table
    fn has_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    /// Converts the row into its record DTO
    ///
    /// # Returns
    /// * `Ok(Record)` - Full projection of the row
    /// * `Err(ConversionError)` - The row does not fit the record shape
    fn into_record(self) -> Result<Self::Record, ConversionError> {
        Self::Record::convert_from(&self, Fields::new())
    }
}
