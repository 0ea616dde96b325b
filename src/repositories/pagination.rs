//! Keyset pagination su (campo di ordinamento, campo univoco)
//!
//! Il campo univoco rompe i pareggi sul campo di ordinamento, così ogni riga ha una
//! posizione stabile anche con valori di ordinamento duplicati.

use super::errors::RepositoryError;
use super::sql::{push_value, raw_value};
use super::traits::{Db, DbRow};
use crate::dtos::{Cursor, CursorPagination, Pagination};
use sqlx::QueryBuilder;

/// Colonne (già quotate) e direzione della paginazione
pub struct Keyset<'a> {
    pub sort_column: &'a str,
    pub unique_column: &'a str,
    pub ascending: bool,
}

impl Keyset<'_> {
    fn comparator(&self) -> &'static str {
        if self.ascending { ">" } else { "<" }
    }

    fn direction(&self) -> &'static str {
        if self.ascending { "ASC" } else { "DESC" }
    }

    /// Righe successive al cursore: `sort > s OR (sort = s AND unique > u)`, con `<` in ordine discendente.
    ///
    /// SQLite ordina i NULL per primi in ordine ascendente e per ultimi in ordine
    /// discendente, quindi un cursore con valore nullo e le righe con valore nullo
    /// vanno confrontati con `IS NULL` / `IS NOT NULL`.
    pub fn push_after(&self, query: &mut QueryBuilder<'_, Db>, cursor: &Cursor) {
        let cmp = self.comparator();
        let (sort, unique) = (self.sort_column, self.unique_column);

        if cursor.sort.is_null() {
            query.push(format!("(({sort} IS NULL AND {unique} {cmp} "));
            push_value(query, &cursor.unique);
            query.push(")");
            if self.ascending {
                query.push(format!(" OR {sort} IS NOT NULL"));
            }
            query.push(")");
            return;
        }

        query.push(format!("({sort} {cmp} "));
        push_value(query, &cursor.sort);
        query.push(format!(" OR ({sort} = "));
        push_value(query, &cursor.sort);
        query.push(format!(" AND {unique} {cmp} "));
        push_value(query, &cursor.unique);
        query.push(")");
        if !self.ascending {
            query.push(format!(" OR {sort} IS NULL"));
        }
        query.push(")");
    }

    pub fn push_order_by(&self, query: &mut QueryBuilder<'_, Db>) {
        let direction = self.direction();
        query.push(format!(
            " ORDER BY {} {direction}, {} {direction}",
            self.sort_column, self.unique_column
        ));
    }
}

pub fn decode_cursor(raw: &str) -> Result<Cursor, RepositoryError> {
    Cursor::decode(raw).map_err(|err| RepositoryError::InvalidCursor(err.to_string()))
}

/// Metadati di paginazione della pagina appena letta.
///
/// `has_next` vale true quando la pagina è piena: l'ultima pagina piena ne
/// annuncia una successiva vuota. Su pagina vuota il cursore ricevuto viene
/// restituito invariato.
pub fn next_page(
    rows: &[DbRow],
    sort_field: &str,
    unique_field: &str,
    page_size: u32,
    incoming: Option<String>,
) -> Result<Option<Pagination>, RepositoryError> {
    if page_size == 0 {
        return Ok(None);
    }

    let cursor = match rows.last() {
        Some(last) => Some(
            Cursor::new(raw_value(last, sort_field)?, raw_value(last, unique_field)?).encode(),
        ),
        None => incoming,
    };

    Ok(Some(Pagination::Cursor(CursorPagination {
        cursor,
        has_next: rows.len() == page_size as usize,
    })))
}
