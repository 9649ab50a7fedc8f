// src/flow/photos.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use axum::body::Bytes;
use uuid::Uuid;

use crate::config::{ALLOWED_PHOTO_TYPES, MAX_PHOTOS, MAX_PHOTO_BYTES};

use super::FlowError;

#[derive(Debug, Clone)]
pub struct Preview {
    pub content_type: String,
    pub bytes: Bytes,
}

type PreviewTable = Mutex<HashMap<Uuid, Preview>>;

/// Table of live preview images, addressable by id until their handle drops.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    table: Arc<PreviewTable>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(table: &PreviewTable) -> MutexGuard<'_, HashMap<Uuid, Preview>> {
        table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a preview and returns the handle that owns it.
    pub fn acquire(&self, content_type: &str, bytes: Bytes) -> PreviewHandle {
        let id = Uuid::new_v4();
        Self::lock(&self.table).insert(
            id,
            Preview {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        PreviewHandle {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Preview> {
        Self::lock(&self.table).get(&id).cloned()
    }

    /// Number of previews currently held.
    pub fn len(&self) -> usize {
        Self::lock(&self.table).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owning reference to a registered preview. Dropping it releases the preview.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    table: Weak<PreviewTable>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            PreviewRegistry::lock(&table).remove(&self.id);
        }
    }
}

/// An uploaded file before it has been checked.
#[derive(Debug, Clone)]
pub struct CandidatePhoto {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// An accepted photo together with its preview.
#[derive(Debug)]
pub struct PhotoAsset {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    preview: PreviewHandle,
}

impl PhotoAsset {
    pub fn preview_id(&self) -> Uuid {
        self.preview.id()
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Checks a single candidate against the bucket rules.
pub fn check_candidate(candidate: &CandidatePhoto) -> Result<(), FlowError> {
    if !ALLOWED_PHOTO_TYPES.contains(&candidate.content_type.as_str()) {
        return Err(FlowError::Resource(
            "Only image files are allowed (JPG, PNG, GIF)".to_string(),
        ));
    }
    if candidate.bytes.len() > MAX_PHOTO_BYTES {
        return Err(FlowError::Resource("Images must be less than 5MB".to_string()));
    }
    Ok(())
}

/// Ordered photo list of one flow.
#[derive(Debug)]
pub struct PhotoCollector {
    assets: Vec<PhotoAsset>,
    previews: PreviewRegistry,
}

impl PhotoCollector {
    pub fn new(previews: PreviewRegistry) -> Self {
        Self {
            assets: Vec::new(),
            previews,
        }
    }

    /// Accepts a batch all-or-nothing: the first bad candidate, or a batch
    /// that would go past [`MAX_PHOTOS`], rejects the whole batch and leaves
    /// the collection untouched.
    pub fn accept(&mut self, candidates: Vec<CandidatePhoto>) -> Result<usize, FlowError> {
        if self.assets.len() + candidates.len() > MAX_PHOTOS {
            return Err(FlowError::Resource(format!(
                "You can upload at most {} photos",
                MAX_PHOTOS
            )));
        }
        candidates.iter().try_for_each(check_candidate)?;

        let count = candidates.len();
        for candidate in candidates {
            let preview = self
                .previews
                .acquire(&candidate.content_type, candidate.bytes.clone());
            self.assets.push(PhotoAsset {
                file_name: candidate.file_name,
                content_type: candidate.content_type,
                bytes: candidate.bytes,
                preview,
            });
        }
        Ok(count)
    }

    /// Removes the photo at `index`, releasing its preview.
    pub fn remove(&mut self, index: usize) -> Result<(), FlowError> {
        if index >= self.assets.len() {
            return Err(FlowError::Validation(format!("No photo at position {}", index)));
        }
        self.assets.remove(index);
        Ok(())
    }

    pub fn assets(&self) -> &[PhotoAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
