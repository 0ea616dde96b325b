//! IndexCache - memoria condivisa delle verifiche sugli indici compositi
//!
//! Stesso schema di `DashMap` dietro `Arc` usato per le mappe condivise dello stato:
//! clonare la cache condivide la stessa mappa.

use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

type IndexKey = (TypeId, String, String);

/// Coppie (entity, campo di ordinamento, campo univoco) con indice composito già verificato.
///
/// Solo esiti positivi vengono memorizzati, e non vengono mai invalidati:
/// se un indice viene rimosso a runtime la cache non se ne accorge.
#[derive(Clone, Default, Debug)]
pub struct IndexCache {
    verified: Arc<DashMap<IndexKey, bool>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_verified<E: 'static>(&self, sort_field: &str, unique_field: &str) -> bool {
        self.verified
            .get(&(TypeId::of::<E>(), sort_field.to_string(), unique_field.to_string()))
            .is_some_and(|entry| *entry)
    }

    pub fn mark_verified<E: 'static>(&self, sort_field: &str, unique_field: &str) {
        // inserimento idempotente: scrittori concorrenti scrivono lo stesso valore
        self.verified.insert(
            (TypeId::of::<E>(), sort_field.to_string(), unique_field.to_string()),
            true,
        );
    }

    pub fn len(&self) -> usize {
        self.verified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn test_verification_is_per_type_and_pair() {
        let cache = IndexCache::new();
        cache.mark_verified::<A>("order", "id");

        assert!(cache.is_verified::<A>("order", "id"));
        assert!(!cache.is_verified::<A>("id", "order"));
        assert!(!cache.is_verified::<B>("order", "id"));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = IndexCache::new();
        let clone = cache.clone();
        clone.mark_verified::<A>("created_at", "id");
        clone.mark_verified::<A>("created_at", "id");

        assert!(cache.is_verified::<A>("created_at", "id"));
        assert_eq!(cache.len(), 1);
    }
}
