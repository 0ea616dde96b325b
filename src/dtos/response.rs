//! Response DTOs - envelope comune di tutte le risposte API

use super::pagination::{Pagination, RecordSet};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Degraded,
    Processing,
    InputError,
    TransientError,
    NotFound,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(data),
            pagination: None,
            error: None,
        }
    }

    pub fn failure(status: ResponseStatus, error: ApiError) -> Self {
        Self {
            status,
            data: None,
            pagination: None,
            error: Some(error),
        }
    }
}

impl<R> From<RecordSet<R>> for ApiResponse<Vec<R>> {
    fn from(set: RecordSet<R>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(set.records),
            pagination: set.pagination,
            error: None,
        }
    }
}
