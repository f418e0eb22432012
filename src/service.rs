//! Note service - note operations with caching and invalidation wired in.
//!
//! This is the surface a request handler calls. Listing reads through the
//! cache; every effective mutation purges the owner's cached listings
//! afterward. Cache trouble never surfaces here: the worst case is a
//! recomputed page or a stale one bounded by the TTL.

use std::sync::Arc;

use anyhow::Result;
use mongodb::bson::oid::ObjectId;

use crate::cache::{CacheStore, ListCache, ListQuery};
use crate::database::{Note, NoteListPage, NoteStore};

/// Note operations over an injected backing store and cache.
pub struct NoteService<B, S> {
    notes: Arc<B>,
    cache: Arc<ListCache<S>>,
}

impl<B, S> NoteService<B, S>
where
    B: NoteStore,
    S: CacheStore,
{
    pub fn new(notes: Arc<B>, cache: Arc<ListCache<S>>) -> Self {
        Self { notes, cache }
    }

    /// List an owner's notes, serving from the cache when possible.
    ///
    /// On a miss the backing query runs and its payload is cached
    /// fire-and-forget; two concurrent misses may both query and both
    /// write, which is harmless (last write wins under the TTL).
    pub async fn list_notes(&self, owner: &str, query: &ListQuery) -> Result<NoteListPage> {
        if let Some(page) = self.cache.lookup(owner, query).await {
            return Ok(page);
        }

        let page = self.notes.list_page(owner, query).await?;
        self.cache.store(owner, query, &page).await;

        Ok(page)
    }

    /// Create a note and invalidate the owner's cached listings.
    pub async fn create_note(&self, owner: &str, title: &str, content: &str) -> Result<Note> {
        let note = self.notes.create(owner, title, content).await?;
        self.cache.invalidate_owner(owner).await;

        Ok(note)
    }

    /// Fetch a single note. Not cached; only listings are.
    pub async fn get_note(&self, owner: &str, id: &ObjectId) -> Result<Option<Note>> {
        self.notes.find_by_id(owner, id).await
    }

    /// Update a note's title and content.
    ///
    /// Invalidates only when a document actually matched; a not-found
    /// update leaves the cache untouched.
    pub async fn update_note(
        &self,
        owner: &str,
        id: &ObjectId,
        title: &str,
        content: &str,
    ) -> Result<Option<Note>> {
        let updated = self.notes.update(owner, id, title, content).await?;

        if updated.is_some() {
            self.cache.invalidate_owner(owner).await;
        }

        Ok(updated)
    }

    /// Soft-delete a note, invalidating on an effective delete.
    pub async fn delete_note(&self, owner: &str, id: &ObjectId) -> Result<bool> {
        let deleted = self.notes.soft_delete(owner, id).await?;

        if deleted {
            self.cache.invalidate_owner(owner).await;
        }

        Ok(deleted)
    }

    /// The underlying cache, for stats and diagnostics.
    pub fn cache(&self) -> &ListCache<S> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::cache::{ListQuery, MemoryStore, SortField, SortOrder};
    use crate::database::{PageInfo, SearchInfo};

    /// In-memory backing store mirroring the repository's query semantics,
    /// with a counter for how often the listing query actually ran.
    #[derive(Default)]
    struct InMemoryNotes {
        notes: Mutex<Vec<Note>>,
        list_queries: AtomicU64,
    }

    impl InMemoryNotes {
        fn list_queries(&self) -> u64 {
            self.list_queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NoteStore for InMemoryNotes {
        async fn list_page(&self, owner: &str, query: &ListQuery) -> Result<NoteListPage> {
            self.list_queries.fetch_add(1, Ordering::SeqCst);

            let search = query.search().to_lowercase();
            let mut matches: Vec<Note> = self
                .notes
                .lock()
                .iter()
                .filter(|note| note.owner == owner && !note.is_deleted())
                .filter(|note| {
                    search.is_empty()
                        || note.title.to_lowercase().contains(&search)
                        || note.content.to_lowercase().contains(&search)
                })
                .cloned()
                .collect();

            matches.sort_by(|a, b| {
                let ordering = match query.sort_field() {
                    SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                    SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                    SortField::Title => a.title.cmp(&b.title),
                };
                match query.sort_order() {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });

            let total_count = matches.len() as u64;
            let data: Vec<Note> = matches
                .into_iter()
                .skip(query.skip() as usize)
                .take(query.page_size() as usize)
                .collect();

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
            note.id = Some(ObjectId::new());
            self.notes.lock().push(note.clone());
            Ok(note)
        }

        async fn find_by_id(&self, owner: &str, id: &ObjectId) -> Result<Option<Note>> {
            Ok(self
                .notes
                .lock()
                .iter()
                .find(|note| note.id.as_ref() == Some(id) && note.owner == owner && !note.is_deleted())
                .cloned())
        }

        async fn update(
            &self,
            owner: &str,
            id: &ObjectId,
            title: &str,
            content: &str,
        ) -> Result<Option<Note>> {
            let mut notes = self.notes.lock();
            let note = notes
                .iter_mut()
                .find(|note| note.id.as_ref() == Some(id) && note.owner == owner && !note.is_deleted());

            Ok(note.map(|note| {
                note.title = title.to_string();
                note.content = content.to_string();
                note.updated_at = mongodb::bson::DateTime::now();
                note.clone()
            }))
        }

        async fn soft_delete(&self, owner: &str, id: &ObjectId) -> Result<bool> {
            let mut notes = self.notes.lock();
            let note = notes
                .iter_mut()
                .find(|note| note.id.as_ref() == Some(id) && note.owner == owner && !note.is_deleted());

            Ok(match note {
                Some(note) => {
                    note.deleted_at = Some(mongodb::bson::DateTime::now());
                    true
                }
                None => false,
            })
        }
    }

    /// A backing store that always fails, to prove backing errors still
    /// propagate while cache errors never do.
    struct FailingNotes;

    #[async_trait]
    impl NoteStore for FailingNotes {
        async fn list_page(&self, _owner: &str, _query: &ListQuery) -> Result<NoteListPage> {
            Err(anyhow!("backing store down"))
        }

        async fn create(&self, _owner: &str, _title: &str, _content: &str) -> Result<Note> {
            Err(anyhow!("backing store down"))
        }

        async fn find_by_id(&self, _owner: &str, _id: &ObjectId) -> Result<Option<Note>> {
            Err(anyhow!("backing store down"))
        }

        async fn update(
            &self,
            _owner: &str,
            _id: &ObjectId,
            _title: &str,
            _content: &str,
        ) -> Result<Option<Note>> {
            Err(anyhow!("backing store down"))
        }

        async fn soft_delete(&self, _owner: &str, _id: &ObjectId) -> Result<bool> {
            Err(anyhow!("backing store down"))
        }
    }

    fn service_with(
        notes: Arc<InMemoryNotes>,
        store: Arc<MemoryStore>,
    ) -> NoteService<InMemoryNotes, MemoryStore> {
        NoteService::new(notes, Arc::new(ListCache::new(store, Duration::from_secs(900))))
    }

    #[tokio::test]
    async fn list_create_list_round_trip() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("scriptorium=debug")
            .with_test_writer()
            .try_init();

        let notes = Arc::new(InMemoryNotes::default());
        let service = service_with(Arc::clone(&notes), MemoryStore::new());
        let query = ListQuery::default();

        for i in 1..=3 {
            service
                .create_note("u1", &format!("note {i}"), "body")
                .await
                .unwrap();
        }

        // First list misses and queries the backing store.
        let first = service.list_notes("u1", &query).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.data.len(), 3);
        assert_eq!(first.pagination.total_count, 3);
        assert_eq!(notes.list_queries(), 1);

        // Second identical list is served from the cache.
        let second = service.list_notes("u1", &query).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.data, first.data);
        assert_eq!(notes.list_queries(), 1);

        // A new note invalidates, so the next list re-queries and sees it.
        service.create_note("u1", "note 4", "body").await.unwrap();
        let third = service.list_notes("u1", &query).await.unwrap();
        assert!(!third.cached);
        assert_eq!(third.data.len(), 4);
        assert_eq!(third.pagination.total_count, 4);
        assert_eq!(notes.list_queries(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_invalidate() {
        let notes = Arc::new(InMemoryNotes::default());
        let service = service_with(Arc::clone(&notes), MemoryStore::new());
        let query = ListQuery::default();

        let note = service.create_note("u1", "title", "body").await.unwrap();
        let id = note.id.unwrap();

        service.list_notes("u1", &query).await.unwrap();
        assert!(service.list_notes("u1", &query).await.unwrap().cached);

        let updated = service
            .update_note("u1", &id, "new title", "new body")
            .await
            .unwrap()
            .expect("note should exist");
        assert_eq!(updated.title, "new title");

        let after_update = service.list_notes("u1", &query).await.unwrap();
        assert!(!after_update.cached);
        assert_eq!(after_update.data[0].title, "new title");

        assert!(service.delete_note("u1", &id).await.unwrap());
        let after_delete = service.list_notes("u1", &query).await.unwrap();
        assert!(!after_delete.cached);
        assert!(after_delete.data.is_empty());

        // The note is soft-deleted, not gone from the collection.
        assert_eq!(notes.notes.lock().len(), 1);
        assert!(service.get_note("u1", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ineffective_mutations_leave_the_cache_alone() {
        let notes = Arc::new(InMemoryNotes::default());
        let service = service_with(Arc::clone(&notes), MemoryStore::new());
        let query = ListQuery::default();

        service.create_note("u1", "only", "body").await.unwrap();
        service.list_notes("u1", &query).await.unwrap();

        let missing = ObjectId::new();
        assert!(service
            .update_note("u1", &missing, "t", "c")
            .await
            .unwrap()
            .is_none());
        assert!(!service.delete_note("u1", &missing).await.unwrap());

        // Still a hit: nothing changed, so nothing was invalidated.
        assert!(service.list_notes("u1", &query).await.unwrap().cached);
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let notes = Arc::new(InMemoryNotes::default());
        let service = service_with(Arc::clone(&notes), MemoryStore::new());
        let query = ListQuery::default();

        service.create_note("alice", "a-note", "body").await.unwrap();
        service.create_note("bob", "b-note", "body").await.unwrap();

        service.list_notes("alice", &query).await.unwrap();
        service.list_notes("bob", &query).await.unwrap();

        // Alice's mutation must not evict Bob's cached listing.
        service.create_note("alice", "a-two", "body").await.unwrap();

        assert!(!service.list_notes("alice", &query).await.unwrap().cached);
        let bob = service.list_notes("bob", &query).await.unwrap();
        assert!(bob.cached);
        assert_eq!(bob.data.len(), 1);
        assert_eq!(bob.data[0].owner, "bob");
    }

    #[tokio::test]
    async fn search_and_pagination_flow_through() {
        let notes = Arc::new(InMemoryNotes::default());
        let service = service_with(Arc::clone(&notes), MemoryStore::new());

        service.create_note("u1", "Rust patterns", "traits").await.unwrap();
        service.create_note("u1", "Shopping", "milk and rust remover").await.unwrap();
        service.create_note("u1", "Travel", "pack light").await.unwrap();

        let query = ListQuery::default().with_search("rust");
        let page = service.list_notes("u1", &query).await.unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.search.query, "rust");
        assert_eq!(page.search.results_count, 2);

        let paged = ListQuery::default()
            .with_page_size(2)
            .with_page(2)
            .with_sort(SortField::Title, SortOrder::Asc);
        let page2 = service.list_notes("u1", &paged).await.unwrap();

        assert_eq!(page2.data.len(), 1);
        assert_eq!(page2.data[0].title, "Travel");
        assert!(page2.pagination.has_prev_page);
        assert!(!page2.pagination.has_next_page);
    }

    #[tokio::test]
    async fn unavailable_cache_never_fails_requests() {
        let notes = Arc::new(InMemoryNotes::default());
        let store = MemoryStore::new();
        store.set_available(false);
        let service = service_with(Arc::clone(&notes), Arc::clone(&store));
        let query = ListQuery::default();

        let note = service.create_note("u1", "first", "body").await.unwrap();
        let listed = service.list_notes("u1", &query).await.unwrap();
        assert!(!listed.cached);
        assert_eq!(listed.data.len(), 1);

        // Every list hits the backing store while the cache is down.
        service.list_notes("u1", &query).await.unwrap();
        assert_eq!(notes.list_queries(), 2);

        let id = note.id.unwrap();
        assert!(service
            .update_note("u1", &id, "renamed", "body")
            .await
            .unwrap()
            .is_some());
        assert!(service.delete_note("u1", &id).await.unwrap());
    }

    #[tokio::test]
    async fn backing_store_errors_still_propagate() {
        let service = NoteService::new(
            Arc::new(FailingNotes),
            Arc::new(ListCache::new(MemoryStore::new(), Duration::from_secs(900))),
        );

        let err = service
            .list_notes("u1", &ListQuery::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backing store down"));

        assert!(service.create_note("u1", "t", "c").await.is_err());
    }
}
