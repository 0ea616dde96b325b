//! Entities module - Entità persistite
//!
//! Ogni entity corrisponde a una tabella nel database e implementa
//! [`Entity`](crate::repositories::Entity).

pub mod item;

// Re-exports per facilitare l'import
pub use item::Item;
