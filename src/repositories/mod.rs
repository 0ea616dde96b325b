//! Repositories module - CRUD generico e paginazione keyset
//!
//! Un solo [`Repository`] generico serve ogni tabella: i requisiti di una tabella
//! sono espressi dal trait [`Entity`] e verificati a compile time.

// ************************* NOTA SULLE QUERY ************************* //

/*
   Le macro query!/query_as! controllano le query a compile time, ma qui tabella e
   colonne sono noti solo tramite il trait Entity: tutte le query vengono quindi
   costruite con sqlx::QueryBuilder.
   Regole:
   - ogni valore passa da push_bind (mai concatenato nella stringa SQL)
   - ogni identificatore passa da quote_ident, dopo essere stato confrontato con E::FIELDS
   - il repository lavora sulla connessione ricevuta e non fa mai commit
*/

pub mod errors;
pub mod filter;
pub mod index_cache;
pub mod pagination;
pub mod repository;
pub mod sql;
pub mod traits;

// Re-esportazione per facilitare l'import
pub use errors::{ErrorKind, RepositoryError};
pub use index_cache::IndexCache;
pub use repository::{QueryOptions, Repository};
pub use traits::{Db, DbConnection, DbRow, Entity};
