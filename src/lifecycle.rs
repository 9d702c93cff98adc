//! The only writer of property records.
//!
//! A record's `images` and the objects in the blob store have to stay in
//! step across two systems that cannot share a transaction. The rules:
//!
//! - Uploads happen first and persistence happens once, after every upload
//!   resolved. A failed upload means nothing is persisted.
//! - Uploads from a call that ends up failing are discarded best-effort.
//!   If that cleanup fails too, the objects are orphaned and a warning is
//!   logged.
//! - `update` never deletes blobs. Images that are no longer kept are
//!   reported back as released, and [Lifecycle::release_images] deletes them
//!   on request.
//! - `delete` tries every image independently and removes the record no
//!   matter how many of those deletions failed.

use super::{
    auth::Principal,
    blob_store::{object_key, BlobStore},
    config::MAX_IMAGES_PER_REQUEST,
    models::{
        FieldError, ImageUpload, PropertyAttributes, PropertyDraft,
        PropertyRecord, ValidationErrors,
    },
    repository::PropertyRepository,
};
use chrono::Utc;
use futures::future::join_all;
use std::{collections::HashSet, sync::Arc};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid property: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("property {0} not found")]
    NotFound(Uuid),
    #[error("failed to upload {file_name}: {reason}")]
    Upload { file_name: String, reason: String },
    #[error("persistence failure: {reason}")]
    Persistence { op: Operation, reason: String },
}

/// Which repository access a [Error::Persistence] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Save,
    Delete,
}

impl Error {
    fn persistence(op: Operation, err: anyhow::Error) -> Self {
        Self::Persistence {
            op,
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What happened to one image during a batch deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDeletion {
    pub url: String,
    pub key: Option<String>,
    pub outcome: std::result::Result<(), String>,
}

impl ImageDeletion {
    pub fn is_deleted(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct Updated {
    pub record: PropertyRecord,
    /// URLs that were on the record before but are not anymore. Their blobs
    /// are still in the store.
    pub released: Vec<String>,
}

pub struct Lifecycle {
    repo: Arc<dyn PropertyRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl Lifecycle {
    pub fn new(
        repo: Arc<dyn PropertyRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self { repo, blobs }
    }

    pub async fn list(&self) -> Result<Vec<PropertyRecord>> {
        self.repo
            .list()
            .await
            .map_err(|e| Error::persistence(Operation::Fetch, e))
    }

    pub async fn get(&self, id: Uuid) -> Result<PropertyRecord> {
        self.repo
            .find(id)
            .await
            .map_err(|e| Error::persistence(Operation::Fetch, e))?
            .ok_or(Error::NotFound(id))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        attributes: PropertyAttributes,
        images: Vec<ImageUpload>,
    ) -> Result<PropertyRecord> {
        attributes.validate()?;
        check_image_count(images.len())?;

        let urls = self.upload_all(images).await?;
        let draft = PropertyDraft {
            attributes,
            images: urls.clone(),
            created_at: Utc::now(),
        };
        let record = match self.repo.insert(draft).await {
            Ok(record) => record,
            Err(e) => {
                self.discard(&urls).await;
                return Err(Error::persistence(Operation::Save, e));
            }
        };

        info!(
            id = %record.id,
            by = %principal,
            images = record.images.len(),
            "created property"
        );
        Ok(record)
    }

    /// Replace the attributes of a record wholesale. The new image list is
    /// `keep` (in the order given) followed by the fresh uploads.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        attributes: PropertyAttributes,
        keep: Vec<String>,
        images: Vec<ImageUpload>,
    ) -> Result<Updated> {
        attributes.validate()?;
        check_image_count(images.len())?;

        let current = self.get(id).await?;
        let keep = kept_images(&current, keep)?;

        let uploaded = self.upload_all(images).await?;
        let mut urls = keep;
        urls.extend(uploaded.iter().cloned());

        let record = PropertyRecord {
            id: current.id,
            attributes,
            images: urls,
            created_at: current.created_at,
        };
        let saved = match self.repo.replace(id, record).await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                self.discard(&uploaded).await;
                return Err(Error::NotFound(id));
            }
            Err(e) => {
                self.discard(&uploaded).await;
                return Err(Error::persistence(Operation::Save, e));
            }
        };

        let released: Vec<String> = current
            .images
            .into_iter()
            .filter(|url| !saved.images.contains(url))
            .collect();
        if !released.is_empty() {
            warn!(
                id = %id,
                count = released.len(),
                "images released from property but left in the blob store"
            );
        }

        info!(
            id = %id,
            by = %principal,
            images = saved.images.len(),
            uploaded = uploaded.len(),
            "updated property"
        );
        Ok(Updated {
            record: saved,
            released,
        })
    }

    /// Delete every image of the record, then the record itself. Image
    /// deletion failures are reported per image and never stop the record
    /// from being removed.
    pub async fn delete(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Vec<ImageDeletion>> {
        let record = self.get(id).await?;
        let deletions = self.delete_images(&record.images).await;

        let removed = self
            .repo
            .remove(id)
            .await
            .map_err(|e| Error::persistence(Operation::Delete, e))?;
        if !removed {
            return Err(Error::NotFound(id));
        }

        let failed = deletions.iter().filter(|d| !d.is_deleted()).count();
        info!(
            id = %id,
            by = %principal,
            images = deletions.len(),
            failed,
            "deleted property"
        );
        Ok(deletions)
    }

    /// Delete blobs that an update released. URLs still referenced by any
    /// record are refused rather than deleted.
    pub async fn release_images(
        &self,
        principal: &Principal,
        urls: &[String],
    ) -> Result<Vec<ImageDeletion>> {
        let referenced: HashSet<String> = self
            .list()
            .await?
            .into_iter()
            .flat_map(|r| r.images)
            .collect();

        let (in_use, free): (Vec<String>, Vec<String>) = urls
            .iter()
            .cloned()
            .partition(|url| referenced.contains(url));

        let mut results = self.delete_images(&free).await;
        results.extend(in_use.into_iter().map(|url| ImageDeletion {
            key: object_key(&url),
            url,
            outcome: Err("still referenced by a property".to_string()),
        }));

        info!(
            by = %principal,
            requested = urls.len(),
            deleted = results.iter().filter(|d| d.is_deleted()).count(),
            "released images"
        );
        Ok(results)
    }

    /// Upload concurrently. The returned URLs follow the input order, not the
    /// order in which uploads finish.
    async fn upload_all(&self, images: Vec<ImageUpload>) -> Result<Vec<String>> {
        let uploads = images.into_iter().map(|image| async move {
            let result = self.blobs.put(image.bytes, &image.file_name).await;
            (image.file_name, result)
        });
        let results = join_all(uploads).await;

        let mut urls = Vec::with_capacity(results.len());
        let mut failure = None;
        for (file_name, result) in results {
            match result {
                Ok(url) => urls.push(url),
                Err(e) if failure.is_none() => {
                    failure = Some(Error::Upload {
                        file_name,
                        reason: format!("{e:#}"),
                    })
                }
                Err(_) => {}
            }
        }

        match failure {
            None => Ok(urls),
            Some(err) => {
                self.discard(&urls).await;
                Err(err)
            }
        }
    }

    async fn delete_images(&self, urls: &[String]) -> Vec<ImageDeletion> {
        let deletions = urls.iter().map(|url| async move {
            let key = object_key(url);
            let outcome = match &key {
                Some(key) => self
                    .blobs
                    .delete(key)
                    .await
                    .map_err(|e| format!("{e:#}")),
                None => Err("cannot derive an object key from url".to_string()),
            };
            if let Err(e) = &outcome {
                warn!(url = %url, error = %e, "failed to delete image");
            }
            ImageDeletion {
                url: url.clone(),
                key,
                outcome,
            }
        });

        join_all(deletions).await
    }

    /// Best-effort removal of blobs uploaded by a call that failed.
    async fn discard(&self, urls: &[String]) {
        for deletion in self.delete_images(urls).await {
            if !deletion.is_deleted() {
                warn!(url = %deletion.url, "orphaned image left in the blob store");
            }
        }
    }
}

fn check_image_count(count: usize) -> Result<()> {
    if count > MAX_IMAGES_PER_REQUEST {
        return Err(ValidationErrors(vec![FieldError::new(
            "images",
            format!("at most {MAX_IMAGES_PER_REQUEST} images per request"),
        )])
        .into());
    }
    Ok(())
}

/// The caller's kept images, which must all belong to `current`. Duplicates
/// are dropped, keeping the first.
fn kept_images(current: &PropertyRecord, keep: Vec<String>) -> Result<Vec<String>> {
    let unknown: Vec<&String> = keep
        .iter()
        .filter(|url| !current.images.contains(url))
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationErrors(vec![FieldError::new(
            "existingImages",
            format!(
                "not images of this property: {}",
                unknown
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )])
        .into());
    }

    let mut seen = HashSet::new();
    Ok(keep.into_iter().filter(|url| seen.insert(url.clone())).collect())
}
