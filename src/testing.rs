//! Test doubles shared by the unit tests.

use super::{
    auth::{Principal, Role},
    blob_store::BlobStore,
    models::{ImageUpload, PropertyDraft, PropertyRecord},
    repository::{InMemoryRepository, PropertyRepository},
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};
use uuid::Uuid;

pub fn admin() -> Principal {
    Principal {
        id: "admin-1".to_string(),
        role: Role::Admin,
    }
}

pub fn upload(file_name: &str) -> ImageUpload {
    ImageUpload {
        file_name: file_name.to_string(),
        bytes: Bytes::from(format!("bytes of {file_name}")),
    }
}

/// Blob store that hands out `https://blobs.test/properties/<name>` URLs and
/// remembers what it was asked to do. Failures and delays are injected per
/// file name (puts) or per key (deletes).
#[derive(Default)]
pub struct RecordingBlobStore {
    fail_puts: HashSet<String>,
    fail_deletes: HashSet<String>,
    delays_ms: HashMap<String, u64>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl RecordingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_put(mut self, file_name: &str) -> Self {
        self.fail_puts.insert(file_name.to_string());
        self
    }

    pub fn fail_delete(mut self, key: &str) -> Self {
        self.fail_deletes.insert(key.to_string());
        self
    }

    pub fn delay(mut self, file_name: &str, ms: u64) -> Self {
        self.delays_ms.insert(file_name.to_string(), ms);
        self
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("https://blobs.test/properties/{file_name}")
    }

    /// File names in the order their uploads completed.
    pub fn put_order(&self) -> Vec<String> {
        self.puts.lock().expect("lock poisoned").clone()
    }

    /// Every key a deletion was attempted for, failed or not.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deletes.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn put(&self, _bytes: Bytes, suggested_name: &str) -> Result<String> {
        if let Some(ms) = self.delays_ms.get(suggested_name) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.fail_puts.contains(suggested_name) {
            bail!("storage rejected {suggested_name}");
        }
        self.puts
            .lock()
            .expect("lock poisoned")
            .push(suggested_name.to_string());
        Ok(self.url_for(suggested_name))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes
            .lock()
            .expect("lock poisoned")
            .push(key.to_string());
        if self.fail_deletes.contains(key) {
            bail!("storage could not delete {key}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoCall {
    Find,
    List,
    Insert,
    Replace,
    Remove,
}

/// In-memory repository whose calls can be switched to fail at any point,
/// so a test can seed records first and break storage afterwards.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryRepository,
    failing: Mutex<HashSet<RepoCall>>,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, call: RepoCall) {
        self.failing.lock().expect("lock poisoned").insert(call);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn check(&self, call: RepoCall) -> Result<()> {
        if self.failing.lock().expect("lock poisoned").contains(&call) {
            bail!("db timeout on {call:?}");
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyRepository for FlakyRepository {
    async fn find(&self, id: Uuid) -> Result<Option<PropertyRecord>> {
        self.check(RepoCall::Find)?;
        self.inner.find(id).await
    }

    async fn list(&self) -> Result<Vec<PropertyRecord>> {
        self.check(RepoCall::List)?;
        self.inner.list().await
    }

    async fn insert(&self, draft: PropertyDraft) -> Result<PropertyRecord> {
        self.check(RepoCall::Insert)?;
        self.inner.insert(draft).await
    }

    async fn replace(
        &self,
        id: Uuid,
        record: PropertyRecord,
    ) -> Result<Option<PropertyRecord>> {
        self.check(RepoCall::Replace)?;
        self.inner.replace(id, record).await
    }

    async fn remove(&self, id: Uuid) -> Result<bool> {
        self.check(RepoCall::Remove)?;
        self.inner.remove(id).await
    }
}
