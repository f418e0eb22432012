//! Note repository - the backing store for note listings and mutations.
//!
//! All queries are owner-scoped and exclude soft-deleted documents. The
//! listing query is the one the cache layer sits in front of: filtered,
//! paginated and sorted, returning a full `NoteListPage` payload.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Collection;
use tracing::debug;

use crate::cache::ListQuery;
use crate::database::models::{Note, NoteListPage, PageInfo, SearchInfo};
use crate::database::Database;

/// Backing store capability consumed by the service layer.
///
/// `NoteRepository` is the MongoDB implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Run the owner-scoped listing query: count plus one sorted page.
    async fn list_page(&self, owner: &str, query: &ListQuery) -> Result<NoteListPage>;

    /// Insert a new note and return it with its assigned ID.
    async fn create(&self, owner: &str, title: &str, content: &str) -> Result<Note>;

    /// Fetch a single non-deleted note by ID.
    async fn find_by_id(&self, owner: &str, id: &ObjectId) -> Result<Option<Note>>;

    /// Update title and content of a non-deleted note.
    /// Returns the updated document, or `None` if no note matched.
    async fn update(
        &self,
        owner: &str,
        id: &ObjectId,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>>;

    /// Soft-delete a note. Returns whether a document matched.
    async fn soft_delete(&self, owner: &str, id: &ObjectId) -> Result<bool>;
}

/// MongoDB-backed note repository.
pub struct NoteRepository {
    collection: Collection<Note>,
}

impl NoteRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.notes(),
        }
    }

    /// Filter matching one owner's live (non-deleted) notes, with an
    /// optional case-insensitive search over title and content.
    fn list_filter(owner: &str, search: &str) -> Document {
        let mut filter = doc! { "owner": owner, "deleted_at": null };

        if !search.is_empty() {
            let regex = doc! { "$regex": search, "$options": "i" };
            filter.insert(
                "$or",
                vec![doc! { "title": regex.clone() }, doc! { "content": regex }],
            );
        }

        filter
    }
}

#[async_trait]
impl NoteStore for NoteRepository {
    async fn list_page(&self, owner: &str, query: &ListQuery) -> Result<NoteListPage> {
        let filter = Self::list_filter(owner, query.search());

        let total_count = self.collection.count_documents(filter.clone()).await?;

        let options = FindOptions::builder()
            .sort(doc! { query.sort_field().as_str(): query.sort_order().direction() })
            .skip(query.skip())
            .limit(i64::from(query.page_size()))
            .build();

        let mut cursor = self.collection.find(filter).with_options(options).await?;
        let mut data = Vec::new();
        while let Some(note) = cursor.next().await {
            data.push(note?);
        }

        debug!(
            "Listed {} of {total_count} note(s) for owner {owner}",
            data.len()
        );

        Ok(NoteListPage {
            search: SearchInfo {
                query: query.search().to_string(),
                results_count: data.len(),
            },
            pagination: PageInfo::compute(query.page(), query.page_size(), total_count),
            data,
            cached: false,
        })
    }

    async fn create(&self, owner: &str, title: &str, content: &str) -> Result<Note> {
        let mut note = Note::new(owner, title, content);

        let result = self.collection.insert_one(&note).await?;
        note.id = result.inserted_id.as_object_id();

        Ok(note)
    }

    async fn find_by_id(&self, owner: &str, id: &ObjectId) -> Result<Option<Note>> {
        let filter = doc! { "_id": id, "owner": owner, "deleted_at": null };

        Ok(self.collection.find_one(filter).await?)
    }

    async fn update(
        &self,
        owner: &str,
        id: &ObjectId,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>> {
        let filter = doc! { "_id": id, "owner": owner, "deleted_at": null };
        let update = doc! {
            "$set": {
                "title": title,
                "content": content,
                "updated_at": DateTime::now(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?)
    }

    async fn soft_delete(&self, owner: &str, id: &ObjectId) -> Result<bool> {
        let filter = doc! { "_id": id, "owner": owner, "deleted_at": null };
        let update = doc! { "$set": { "deleted_at": DateTime::now() } };

        let result = self.collection.update_one(filter, update).await?;

        Ok(result.matched_count > 0)
    }
}
