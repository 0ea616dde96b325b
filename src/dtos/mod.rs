//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene i tipi base dei DTO e dei record, il modello dei filtri,
//! i metadati di paginazione e l'envelope delle risposte API.

pub mod convertible;
pub mod filter;
pub mod item;
pub mod pagination;
pub mod query;
pub mod record;
pub mod response;

// Re-exports per facilitare l'import
pub use convertible::{ConversionError, Convertible, Fields, MaybeSet};
pub use filter::{
    BooleanExpression, BooleanOperator, FilterExpression, FilterValue, Operation, Operator, Scalar, Sort,
    SortDirection, Sorts,
};
pub use item::{CreateItemDTO, ItemDTO, UpdateItemDTO};
pub use pagination::{Cursor, CursorPagination, Pagination, RecordSet, SkipPagination};
pub use query::PageQuery;
pub use record::{BaseRecord, RecordReference, Referenced};
pub use response::{ApiError, ApiResponse, ResponseStatus};
