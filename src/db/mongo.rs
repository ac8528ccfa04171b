//! MongoDB client and typed collection wrapper
//!
//! Every document schema declares its own indexes and carries common
//! soft-delete metadata; reads exclude soft-deleted rows automatically.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, ReturnDocument},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::HearthError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify the connection
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, HearthError> {
        info!("Connecting to MongoDB at {}", uri);

        // Bound server selection so an unreachable MongoDB fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| HearthError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HearthError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, HearthError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Ping the database (readiness probes)
    pub async fn ping(&self) -> Result<(), HearthError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| HearthError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing and soft-delete filtering
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

/// Fold a `metadata.updated_at` touch into an arbitrary update document
fn with_updated_at(mut update: Document) -> Document {
    let now = DateTime::now();
    match update.get_document_mut("$set") {
        Ok(set) => {
            set.insert("metadata.updated_at", now);
        }
        Err(_) => {
            update.insert("$set", doc! { "metadata.updated_at": now });
        }
    }
    update
}

/// Add the soft-delete exclusion to a read filter
fn with_live_filter(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection handle and apply schema indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, HearthError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };
        mongo_collection.apply_indexes().await?;
        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), HearthError> {
        let schema_indices = T::into_indices();
        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| HearthError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, HearthError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| HearthError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| HearthError::Database("Failed to get inserted ID".into()))
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, HearthError> {
        self.inner
            .find_one(with_live_filter(filter))
            .await
            .map_err(|e| HearthError::Database(format!("Find failed: {}", e)))
    }

    /// Find many live documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, HearthError> {
        use futures_util::StreamExt;

        let cursor = self
            .inner
            .find(with_live_filter(filter))
            .await
            .map_err(|e| HearthError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Count live documents matching the filter
    pub async fn count(&self, filter: Document) -> Result<u64, HearthError> {
        self.inner
            .count_documents(with_live_filter(filter))
            .await
            .map_err(|e| HearthError::Database(format!("Count failed: {}", e)))
    }

    /// Update one live document, touching `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, HearthError> {
        self.inner
            .update_one(with_live_filter(filter), with_updated_at(update))
            .await
            .map_err(|e| HearthError::Database(format!("Update failed: {}", e)))
    }

    /// Update one document, inserting it if no match exists
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, HearthError> {
        let mut update = with_updated_at(update);
        update.insert(
            "$setOnInsert",
            doc! { "metadata.created_at": DateTime::now(), "metadata.is_deleted": false },
        );
        self.inner
            .update_one(with_live_filter(filter), update)
            .upsert(true)
            .await
            .map_err(|e| HearthError::Database(format!("Upsert failed: {}", e)))
    }

    /// Update all live documents matching the filter
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, HearthError> {
        self.inner
            .update_many(with_live_filter(filter), with_updated_at(update))
            .await
            .map_err(|e| HearthError::Database(format!("Update failed: {}", e)))
    }

    /// Atomically update one live document and return the post-update state.
    ///
    /// Single-document conditional updates are serializable at the store
    /// level; exactly one of any set of concurrent callers with a disjoint
    /// filter can win.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>, HearthError> {
        self.inner
            .find_one_and_update(with_live_filter(filter), with_updated_at(update))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| HearthError::Database(format!("Conditional update failed: {}", e)))
    }

    /// Soft-delete all live documents matching the filter, returning the count
    pub async fn soft_delete_many(&self, filter: Document) -> Result<u64, HearthError> {
        let now = DateTime::now();
        let result = self
            .inner
            .update_many(
                with_live_filter(filter),
                doc! { "$set": {
                    "metadata.is_deleted": true,
                    "metadata.deleted_at": now,
                    "metadata.updated_at": now,
                } },
            )
            .await
            .map_err(|e| HearthError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updated_at_folds_into_existing_set() {
        let update = with_updated_at(doc! { "$set": { "plan": "family" } });
        let set = update.get_document("$set").unwrap();
        assert!(set.contains_key("plan"));
        assert!(set.contains_key("metadata.updated_at"));
    }

    #[test]
    fn updated_at_creates_set_when_absent() {
        let update = with_updated_at(doc! { "$inc": { "extra_members": 7 } });
        assert!(update.contains_key("$inc"));
        let set = update.get_document("$set").unwrap();
        assert!(set.contains_key("metadata.updated_at"));
    }

    #[test]
    fn live_filter_excludes_soft_deleted() {
        let filter = with_live_filter(doc! { "circle_id": "C1" });
        let deleted = filter.get_document("metadata.is_deleted").unwrap();
        assert_eq!(deleted.get_bool("$ne").unwrap(), true);
    }
}
