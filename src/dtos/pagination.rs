//! Pagination DTOs - cursore opaco e metadati di paginazione

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Posizione nel keyset: valori di (campo di ordinamento, campo univoco) dell'ultima riga vista
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cursor {
    pub sort: Value,
    pub unique: Value,
}

impl Cursor {
    pub fn new(sort: Value, unique: Value) -> Self {
        Self { sort, unique }
    }

    /// Stringa opaca da restituire al client
    pub fn encode(&self) -> String {
        // Value -> String non può fallire
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CursorPagination {
    pub cursor: Option<String>,
    pub has_next: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SkipPagination {
    pub total_items: u64,
    pub num_pages: u64,
    pub page: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Pagination {
    Cursor(CursorPagination),
    Skip(SkipPagination),
}

/// Pagina di record con i metadati per chiedere la successiva
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordSet<R> {
    pub records: Vec<R>,
    pub pagination: Option<Pagination>,
}

impl<R> RecordSet<R> {
    pub fn cursor(&self) -> Option<&CursorPagination> {
        match &self.pagination {
            Some(Pagination::Cursor(cursor)) => Some(cursor),
            _ => None,
        }
    }

    pub fn has_next(&self) -> bool {
        self.cursor().is_some_and(|c| c.has_next)
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor().and_then(|c| c.cursor.as_deref())
    }
}
