//! Generic CRUD and query operations over named collections
//!
//! Every operation is a single driver call (two for [`BaseRepository::query`],
//! which also counts). Driver failures are returned unmodified as
//! [`AppError::Database`].

use crate::error::{AppError, AppResult};
use crate::search::{FieldMapping, Pagination, Query};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Collection, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Repository bound to one database and one field mapping
#[derive(Clone, Debug)]
pub struct BaseRepository {
    database: Database,
    mapping: Arc<FieldMapping>,
}

impl BaseRepository {
    pub fn new(database: Database, mapping: FieldMapping) -> Self {
        Self {
            database,
            mapping: Arc::new(mapping),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection::<T>(name)
    }

    /// Insert one record and return its generated id
    pub async fn save<T>(&self, collection: &str, record: &T) -> AppResult<Bson>
    where
        T: Serialize + Send + Sync,
    {
        let result = self.collection::<T>(collection).insert_one(record).await?;
        debug!("Inserted {} into {}", result.inserted_id, collection);
        Ok(result.inserted_id)
    }

    /// Apply `update` to the record with `id`, returning the modified count
    pub async fn update(
        &self,
        collection: &str,
        id: impl Into<Bson>,
        update: Document,
    ) -> AppResult<u64> {
        let result = self
            .collection::<Document>(collection)
            .update_one(doc! { "_id": id.into() }, update)
            .await?;
        Ok(result.modified_count)
    }

    /// Fetch exactly one record by id
    pub async fn read_by_id<T>(&self, collection: &str, id: impl Into<Bson>) -> AppResult<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let id = id.into();
        self.collection::<T>(collection)
            .find_one(doc! { "_id": id.clone() })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No record {} in {}", id, collection)))
    }

    /// Run a descriptor query: one page of records plus the total count
    pub async fn query<T>(&self, query: &Query, collection: &str) -> AppResult<(Pagination, Vec<T>)>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let filter = query.mark_filtered(&self.mapping)?;
        let sort = query.mark_sort(&self.mapping);
        let mut page = query.mark_page();
        let (limit, skip) = page.limit();

        let coll = self.collection::<T>(collection);
        let mut find = coll.find(filter.clone()).skip(skip).limit(limit);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        let list: Vec<T> = find.await?.try_collect().await?;

        let total = coll.count_documents(filter).await?;
        page.set_total_record(total);

        Ok((page, list))
    }
}

/// Interpret a textual id: 24-hex strings are ObjectIds, anything else a string
pub fn parse_id(raw: &str) -> Bson {
    match ObjectId::parse_str(raw) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(raw.to_string()),
    }
}

/// Render a generated id the way clients send it back
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
