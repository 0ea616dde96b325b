//! Repository - CRUD generico e paginazione keyset per qualsiasi [`Entity`]
//!
//! Il repository non possiede la transazione: lavora sulla connessione ricevuta
//! (di solito `&mut Transaction`) e non fa mai commit. Commit e rollback restano
//! al chiamante.

use super::errors::{RepositoryError, is_integrity_violation};
use super::filter::push_filter;
use super::index_cache::IndexCache;
use super::pagination::{Keyset, decode_cursor, next_page};
use super::sql::{NOW, column, normalize_timestamps, push_value, quote_ident};
use super::traits::{Db, DbConnection, DbRow, Entity};
use crate::core::config::RepositorySettings;
use crate::dtos::{Convertible, Fields, FilterExpression, RecordSet, Referenced, SortDirection, Sorts};
use serde_json::Value;
use sqlx::{Connection, FromRow, QueryBuilder};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Colonne gestite dal repository, mai scritte da un update
const PROTECTED_ON_UPDATE: [&str; 3] = ["id", "created_at", "deleted_at"];

/// Parametri di [`Repository::query`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub sort_field: String,
    pub unique_field: String,
    pub ascending: bool,
    pub page_size: u32,
    pub filter: Option<FilterExpression>,
    pub respect_soft_delete: bool,
    /// Cursore opaco restituito dalla pagina precedente
    pub cursor: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            sort_field: "created_at".to_string(),
            unique_field: "id".to_string(),
            ascending: true,
            page_size: 10,
            filter: None,
            respect_soft_delete: true,
            cursor: None,
        }
    }
}

impl QueryOptions {
    /// Imposta l'ordinamento da una lista di [`Sort`](crate::dtos::Sort).
    ///
    /// La paginazione keyset accetta esattamente due chiavi, campo di ordinamento e
    /// campo univoco, con la stessa direzione.
    pub fn with_sorts(mut self, sorts: &Sorts) -> Result<Self, RepositoryError> {
        let [sort, unique] = sorts.sorts.as_slice() else {
            return Err(RepositoryError::UnsupportedSort(format!(
                "expected a sort field and a unique field, got {} keys",
                sorts.sorts.len()
            )));
        };
        if sort.direction != unique.direction {
            return Err(RepositoryError::UnsupportedSort(
                "sort and unique fields must share the same direction".to_string(),
            ));
        }

        self.sort_field = sort.field.clone();
        self.unique_field = unique.field.clone();
        self.ascending = sort.direction == SortDirection::Asc;
        Ok(self)
    }
}

// REPOSITORY
pub struct Repository<'s, E: Entity> {
    session: &'s mut DbConnection,
    settings: Arc<RepositorySettings>,
    indexes: IndexCache,
    entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity> Repository<'s, E> {
    pub fn new(session: &'s mut DbConnection, settings: Arc<RepositorySettings>, indexes: IndexCache) -> Self {
        Self {
            session,
            settings,
            indexes,
            entity: PhantomData,
        }
    }

    pub async fn create_one<D: Convertible>(&mut self, dto: &D) -> Result<E::Record, RepositoryError> {
        let mut created = self.bulk_create(std::slice::from_ref(dto)).await?;
        // bulk_create restituisce una riga per ogni DTO
        created.pop().ok_or_else(|| RepositoryError::Database(sqlx::Error::RowNotFound))
    }

    /// Inserisce tutti i DTO dentro un'unica transazione annidata (SAVEPOINT).
    ///
    /// In caso di violazione di un vincolo il savepoint viene annullato, la transazione
    /// esterna resta utilizzabile e l'errore del driver viene restituito invariato
    /// dentro [`RepositoryError::Integrity`].
    #[instrument(skip(self, dtos), fields(entity = E::type_name(), dto = D::type_name(), count = dtos.len()))]
    pub async fn bulk_create<D: Convertible>(&mut self, dtos: &[D]) -> Result<Vec<E::Record>, RepositoryError> {
        debug!("Creating records");

        let rows = dtos
            .iter()
            .map(|dto| Self::insert_fields(dto))
            .collect::<Result<Vec<_>, _>>()?;

        let mut savepoint = self.session.begin().await?;
        debug!("Nested transaction begin");

        let mut created = Vec::with_capacity(rows.len());
        for fields in &rows {
            let mut query = Self::insert_query(fields);
            match query.build_query_as::<E>().fetch_one(&mut *savepoint).await {
                Ok(entity) => {
                    debug!(id = %entity.meta().id, "Added row to nested transaction");
                    created.push(entity);
                }
                Err(err) if is_integrity_violation(&err) => {
                    savepoint.rollback().await?;
                    error!(error = %err, "Integrity violation, nested transaction rolled back");
                    if self.settings.show_records_in_logs {
                        error!(records = ?rows, "Rejected records");
                    }
                    return Err(RepositoryError::Integrity(err));
                }
                // il drop del savepoint esegue il rollback
                Err(err) => return Err(err.into()),
            }
        }

        savepoint.commit().await?;
        info!("Added {} {} rows on the transaction", created.len(), E::type_name());

        created
            .into_iter()
            .map(|entity| entity.into_record().map_err(RepositoryError::from))
            .collect()
    }

    /// Aggiornamento parziale: solo i campi impostati nel DTO vengono scritti
    ///
    /// # Returns
    /// * `Ok(u64)` - Numero di righe aggiornate (0 se l'id non esiste)
    #[instrument(skip(self, dto), fields(entity = E::type_name(), dto = D::type_name(), id = %dto.id()))]
    pub async fn update_one<D: Convertible + Referenced>(&mut self, dto: &D) -> Result<u64, RepositoryError> {
        let updated = self.update_row(dto).await?;
        info!(updated, "Updated row on the transaction");
        Ok(updated)
    }

    #[instrument(skip(self, dtos), fields(entity = E::type_name(), dto = D::type_name(), count = dtos.len()))]
    pub async fn bulk_update<D: Convertible + Referenced>(&mut self, dtos: &[D]) -> Result<u64, RepositoryError> {
        let mut updated = 0;
        for dto in dtos {
            updated += self.update_row(dto).await?;
            debug!(id = %dto.id(), "Updated row on the transaction");
        }
        info!("Updated {} {} rows on the transaction", updated, E::type_name());
        Ok(updated)
    }

    pub async fn delete_one(&mut self, id: &str, soft_delete: bool) -> Result<u64, RepositoryError> {
        self.bulk_delete(&[id.to_string()], soft_delete).await
    }

    /// Soft delete imposta `deleted_at` solo sulle righe ancora attive; hard delete le rimuove
    #[instrument(skip(self, ids), fields(entity = E::type_name(), count = ids.len()))]
    pub async fn bulk_delete(&mut self, ids: &[String], soft_delete: bool) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            debug!("No ids to delete");
            return Ok(0);
        }

        let table = quote_ident(E::TABLE);
        let mut query: QueryBuilder<'_, Db> = if soft_delete {
            QueryBuilder::new(format!("UPDATE {table} SET \"deleted_at\" = {NOW} WHERE \"id\" IN ("))
        } else {
            QueryBuilder::new(format!("DELETE FROM {table} WHERE \"id\" IN ("))
        };
        Self::push_ids(&mut query, ids);
        query.push(")");
        if soft_delete {
            query.push(" AND \"deleted_at\" IS NULL");
        }

        let affected = query.build().execute(&mut *self.session).await?.rows_affected();

        let mode = if soft_delete { "Soft" } else { "Hard" };
        for id in ids {
            debug!(%id, "{mode} deleted {} on the transaction", E::type_name());
        }
        info!("{mode} deleted {} {} rows on the transaction", affected, E::type_name());

        Ok(affected)
    }

    /// Legge un record per id.
    ///
    /// Con `respect_soft_delete` una riga soft-deleted è indistinguibile da una riga assente.
    #[instrument(skip(self), fields(entity = E::type_name()))]
    pub async fn lookup(&mut self, id: &str, respect_soft_delete: bool) -> Result<E::Record, RepositoryError> {
        let entity: Option<E> = sqlx::query_as(&format!("SELECT * FROM {} WHERE \"id\" = ?", quote_ident(E::TABLE)))
            .bind(id)
            .fetch_optional(&mut *self.session)
            .await?;

        let not_found = || RepositoryError::NotFound {
            entity: E::type_name(),
            id: id.to_string(),
        };

        let Some(entity) = entity else {
            info!("Not found on the database");
            return Err(not_found());
        };

        if respect_soft_delete && entity.meta().is_deleted() {
            debug!("Ignoring soft deleted record");
            return Err(not_found());
        }

        info!("Found on the database");
        Ok(entity.into_record()?)
    }

    /// Restituisce il sottoinsieme di `ids` presente; gli id mancanti non sono un errore
    #[instrument(skip(self, ids), fields(entity = E::type_name(), count = ids.len()))]
    pub async fn bulk_lookup(
        &mut self,
        ids: &[String],
        respect_soft_delete: bool,
    ) -> Result<Vec<E::Record>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<'_, Db> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE \"id\" IN (", quote_ident(E::TABLE)));
        Self::push_ids(&mut query, ids);
        query.push(")");
        if respect_soft_delete {
            query.push(" AND \"deleted_at\" IS NULL");
        }

        let entities: Vec<E> = query.build_query_as().fetch_all(&mut *self.session).await?;
        info!("Found {} {} records on the database", entities.len(), E::type_name());

        entities
            .into_iter()
            .map(|entity| entity.into_record().map_err(RepositoryError::from))
            .collect()
    }

    /// Pagina di record ordinata per `(sort_field, unique_field)`.
    ///
    /// Fallisce prima di eseguire la query se `page_size` supera il massimo configurato,
    /// se i campi non sono colonne dell'entity o se manca un indice composito che li copra.
    #[instrument(
        skip(self, options),
        fields(
            entity = E::type_name(),
            sort_field = %options.sort_field,
            unique_field = %options.unique_field,
            page_size = options.page_size,
            ascending = options.ascending
        )
    )]
    pub async fn query(&mut self, options: QueryOptions) -> Result<RecordSet<E::Record>, RepositoryError> {
        if options.page_size > self.settings.pagination_max {
            return Err(RepositoryError::PageSizeExceeded {
                requested: options.page_size,
                max: self.settings.pagination_max,
            });
        }

        let sort_column = column::<E>(&options.sort_field)?;
        let unique_column = column::<E>(&options.unique_field)?;
        self.verify_composite_index(&options.sort_field, &options.unique_field)
            .await?;

        let cursor = options.cursor.as_deref().map(decode_cursor).transpose()?;

        let mut query: QueryBuilder<'_, Db> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE (", quote_ident(E::TABLE)));
        match &options.filter {
            Some(filter) => push_filter::<E>(&mut query, filter)?,
            None => {
                query.push("1 = 1");
            }
        }
        query.push(")");

        if options.respect_soft_delete {
            query.push(" AND \"deleted_at\" IS NULL");
        }

        let keyset = Keyset {
            sort_column: &sort_column,
            unique_column: &unique_column,
            ascending: options.ascending,
        };
        if let Some(cursor) = &cursor {
            query.push(" AND ");
            keyset.push_after(&mut query, cursor);
        }
        keyset.push_order_by(&mut query);
        query.push(" LIMIT ");
        query.push_bind(i64::from(options.page_size));

        debug!(sql = query.sql(), "Executing paginated query");
        let rows: Vec<DbRow> = query.build().fetch_all(&mut *self.session).await?;

        let pagination = next_page(
            &rows,
            &options.sort_field,
            &options.unique_field,
            options.page_size,
            options.cursor,
        )?;

        let records = rows
            .iter()
            .map(|row| {
                let entity = E::from_row(row)?;
                Ok(entity.into_record()?)
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        info!("Listed {} {} rows", records.len(), E::type_name());

        Ok(RecordSet { records, pagination })
    }

    /// Verifica (una volta sola per entity e coppia di campi) che esista un indice
    /// contenente entrambe le colonne, in qualunque ordine.
    async fn verify_composite_index(&mut self, sort_field: &str, unique_field: &str) -> Result<(), RepositoryError> {
        if self.indexes.is_verified::<E>(sort_field, unique_field) {
            debug!("Verified index exists (cached)");
            return Ok(());
        }

        let index_columns: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT il.name, ii.name
            FROM pragma_index_list(?) AS il
            JOIN pragma_index_info(il.name) AS ii
            "#,
        )
        .bind(E::TABLE)
        .fetch_all(&mut *self.session)
        .await?;

        let mut indexes: HashMap<String, Vec<String>> = HashMap::new();
        for (index, col) in index_columns {
            if let Some(col) = col {
                indexes.entry(index).or_default().push(col);
            }
        }

        let exists = indexes
            .values()
            .any(|cols| cols.iter().any(|c| c == sort_field) && cols.iter().any(|c| c == unique_field));

        if !exists {
            error!(table = E::TABLE, "No composite index for pagination");
            return Err(RepositoryError::MissingIndex {
                table: E::TABLE,
                sort_field: sort_field.to_string(),
                unique_field: unique_field.to_string(),
            });
        }

        self.indexes.mark_verified::<E>(sort_field, unique_field);
        debug!("Updated index cache");
        Ok(())
    }

    /// Mappa di colonne da inserire: chiavi sconosciute scartate, id generato se assente,
    /// timestamp nulli omessi così che si applichi il default della colonna
    fn insert_fields<D: Convertible>(dto: &D) -> Result<Fields, RepositoryError> {
        let mut fields = dto.to_dict(false)?;

        fields.retain(|key, value| {
            E::has_field(key)
                && !(value.is_null() && matches!(key.as_str(), "id" | "created_at" | "updated_at"))
        });

        if !fields.contains_key("id") {
            fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        normalize_timestamps(&mut fields)?;

        Ok(fields)
    }

    fn insert_query(fields: &Fields) -> QueryBuilder<'static, Db> {
        let mut query = QueryBuilder::new(format!("INSERT INTO {} (", quote_ident(E::TABLE)));
        for (i, key) in fields.keys().enumerate() {
            if i > 0 {
                query.push(", ");
            }
            query.push(quote_ident(key));
        }
        query.push(") VALUES (");
        for (i, value) in fields.values().enumerate() {
            if i > 0 {
                query.push(", ");
            }
            push_value(&mut query, value);
        }
        query.push(") RETURNING *");
        query
    }

    async fn update_row<D: Convertible + Referenced>(&mut self, dto: &D) -> Result<u64, RepositoryError> {
        let mut fields = dto.to_dict(true)?;
        fields.retain(|key, _| E::has_field(key) && !PROTECTED_ON_UPDATE.contains(&key.as_str()));
        fields.remove("updated_at");

        let mut query: QueryBuilder<'_, Db> = QueryBuilder::new(format!("UPDATE {} SET ", quote_ident(E::TABLE)));
        for (key, value) in &fields {
            query.push(quote_ident(key));
            query.push(" = ");
            push_value(&mut query, value);
            query.push(", ");
        }
        query.push(format!("\"updated_at\" = {NOW} WHERE \"id\" = "));
        query.push_bind(dto.id().to_string());

        debug!(columns = ?fields.keys().collect::<Vec<_>>(), "Updating row");
        let result = query.build().execute(&mut *self.session).await.map_err(|err| {
            if is_integrity_violation(&err) {
                error!(error = %err, "Integrity violation on update");
                RepositoryError::Integrity(err)
            } else {
                RepositoryError::Database(err)
            }
        })?;
        Ok(result.rows_affected())
    }

    fn push_ids(query: &mut QueryBuilder<'_, Db>, ids: &[String]) {
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
    }
}
