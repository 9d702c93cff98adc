use super::models::{PropertyDraft, PropertyRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::RwLock};
use uuid::Uuid;

/// Persistence boundary for property records.
///
/// Implementations assign ids on `insert` and must never change `id` or
/// `created_at` afterwards. Any storage failure is returned as an error; the
/// lifecycle layer decides what that means for the caller.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<PropertyRecord>>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<PropertyRecord>>;
    async fn insert(&self, draft: PropertyDraft) -> Result<PropertyRecord>;
    /// Returns `None` when no record has this id.
    async fn replace(
        &self,
        id: Uuid,
        record: PropertyRecord,
    ) -> Result<Option<PropertyRecord>>;
    /// Returns `true` if a record was removed.
    async fn remove(&self, id: Uuid) -> Result<bool>;
}

/// HashMap-backed repository for tests and embedding.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<Uuid, PropertyRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PropertyRepository for InMemoryRepository {
    async fn find(&self, id: Uuid) -> Result<Option<PropertyRecord>> {
        Ok(self.records.read().expect("lock poisoned").get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<PropertyRecord>> {
        let mut all: Vec<PropertyRecord> = self
            .records
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn insert(&self, draft: PropertyDraft) -> Result<PropertyRecord> {
        let record = PropertyRecord::from_draft(Uuid::new_v4(), draft);
        self.records
            .write()
            .expect("lock poisoned")
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn replace(
        &self,
        id: Uuid,
        mut record: PropertyRecord,
    ) -> Result<Option<PropertyRecord>> {
        let mut records = self.records.write().expect("lock poisoned");
        let Some(existing) = records.get_mut(&id) else {
            return Ok(None);
        };
        record.id = existing.id;
        record.created_at = existing.created_at;
        *existing = record.clone();
        Ok(Some(record))
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        Ok(self
            .records
            .write()
            .expect("lock poisoned")
            .remove(&id)
            .is_some())
    }
}
