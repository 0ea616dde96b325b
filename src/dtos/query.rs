//! Query DTOs - parametri di paginazione ricevuti in query string

use crate::dtos::FilterExpression;
use crate::repositories::{QueryOptions, RepositoryError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    /// Nome di colonna ammesso in query string
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
}

/// DTO per query parameters di paginazione
///
/// `filter`, se presente, è un [`FilterExpression`] serializzato in JSON.
#[derive(Serialize, Deserialize, Debug, Default, Validate)]
pub struct PageQuery {
    #[validate(regex(path = *FIELD_NAME, message = "sort_field must be a column name"))]
    pub sort_field: Option<String>,
    #[validate(regex(path = *FIELD_NAME, message = "unique_field must be a column name"))]
    pub unique_field: Option<String>,
    pub ascending: Option<bool>,
    pub page_size: Option<u32>,
    #[validate(length(max = 2048, message = "cursor must be at most 2048 characters"))]
    pub cursor: Option<String>,
    #[validate(length(min = 2, message = "filter must be a JSON expression"))]
    pub filter: Option<String>,
}

impl PageQuery {
    /// Converte i parametri in opzioni del repository, con i default per quelli mancanti
    pub fn into_options(self) -> Result<QueryOptions, RepositoryError> {
        let defaults = QueryOptions::default();

        let filter = self
            .filter
            .as_deref()
            .map(serde_json::from_str::<FilterExpression>)
            .transpose()
            .map_err(|e| RepositoryError::UnsupportedFilter(e.to_string()))?;

        Ok(QueryOptions {
            sort_field: self.sort_field.unwrap_or(defaults.sort_field),
            unique_field: self.unique_field.unwrap_or(defaults.unique_field),
            ascending: self.ascending.unwrap_or(defaults.ascending),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            filter,
            respect_soft_delete: defaults.respect_soft_delete,
            cursor: self.cursor,
        })
    }
}
