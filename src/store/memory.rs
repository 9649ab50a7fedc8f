// src/store/memory.rs

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Bytes;
use sqlx::types::Json;

use super::{BlobStore, BucketPolicy, BucketStatus, QuestionSource, RecordStore, StoreError};
use crate::models::{
    question::{NewQuestion, Question},
    submission::{PhotoRef, ResponseRow},
    user::UserDetails,
};

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ListQuestions,
    CreateUser,
    Upload,
    InsertPhotoRefs,
    InsertResponses,
    DeleteUser,
    RemoveBlobs,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
struct Inner {
    questions: Vec<Question>,
    users: BTreeMap<i64, UserDetails>,
    photo_refs: Vec<PhotoRef>,
    responses: Vec<ResponseRow>,
    bucket: Option<BucketPolicy>,
    objects: BTreeMap<String, StoredObject>,
    next_question_id: i64,
    next_user_id: i64,
    failures: HashSet<FailPoint>,
    upload_delay: Option<Duration>,
}

/// In-process backend implementing every store contract.
///
/// Used by the test suites; child rows are dropped with their user the way the
/// database cascades them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose photo bucket already exists.
    pub fn with_bucket(name: &str) -> Self {
        let store = Self::new();
        store.lock().bucket = Some(BucketPolicy::photos(name));
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Makes every upload wait `delay` before it is applied, like a slow remote.
    pub fn delay_uploads(&self, delay: Duration) {
        self.lock().upload_delay = Some(delay);
    }

    fn check(&self, inner: &Inner, point: FailPoint) -> Result<(), StoreError> {
        if inner.failures.contains(&point) {
            return Err(StoreError::Unavailable(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    pub fn users(&self) -> Vec<(i64, UserDetails)> {
        self.lock()
            .users
            .iter()
            .map(|(id, u)| (*id, u.clone()))
            .collect()
    }

    pub fn photo_refs(&self) -> Vec<PhotoRef> {
        self.lock().photo_refs.clone()
    }

    pub fn responses(&self) -> Vec<ResponseRow> {
        self.lock().responses.clone()
    }

    pub fn object_paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.lock().objects.get(path).cloned()
    }

    pub fn bucket(&self) -> Option<BucketPolicy> {
        self.lock().bucket.clone()
    }
}

#[async_trait]
impl QuestionSource for MemoryStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let inner = self.lock();
        self.check(&inner, FailPoint::ListQuestions)?;
        Ok(inner.questions.clone())
    }

    async fn count_questions(&self) -> Result<i64, StoreError> {
        let inner = self.lock();
        self.check(&inner, FailPoint::ListQuestions)?;
        Ok(inner.questions.len() as i64)
    }

    async fn insert_questions(&self, questions: &[NewQuestion]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        for q in questions {
            inner.next_question_id += 1;
            let id = inner.next_question_id;
            inner.questions.push(Question {
                id,
                question_text: q.question_text.clone(),
                category: q.category.clone(),
                options: q.options.clone().map(Json),
                question_type: q.question_type,
                created_at: Some(chrono::Utc::now()),
            });
        }
        Ok(questions.len())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(&self, details: &UserDetails) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        self.check(&inner, FailPoint::CreateUser)?;
        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.insert(id, details.clone());
        Ok(id)
    }

    async fn insert_photo_refs(&self, rows: &[PhotoRef]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check(&inner, FailPoint::InsertPhotoRefs)?;
        inner.photo_refs.extend_from_slice(rows);
        Ok(())
    }

    async fn insert_responses(&self, rows: &[ResponseRow]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check(&inner, FailPoint::InsertResponses)?;
        inner.responses.extend_from_slice(rows);
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check(&inner, FailPoint::DeleteUser)?;
        inner.users.remove(&user_id);
        inner.photo_refs.retain(|r| r.user_id != user_id);
        inner.responses.retain(|r| r.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn ensure_bucket(&self, policy: &BucketPolicy) -> Result<BucketStatus, StoreError> {
        let mut inner = self.lock();
        if inner.bucket.is_some() {
            return Ok(BucketStatus::AlreadyExists);
        }
        inner.bucket = Some(policy.clone());
        Ok(BucketStatus::Created)
    }

    async fn upload(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<(), StoreError> {
        let delay = self.lock().upload_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        self.check(&inner, FailPoint::Upload)?;
        let policy = inner
            .bucket
            .as_ref()
            .ok_or_else(|| StoreError::BucketMissing("memory".to_string()))?;
        policy.check(content_type, bytes.len())?;
        if inner.objects.contains_key(path) {
            return Err(StoreError::Rejected(format!("object '{}' already exists", path)));
        }
        inner.objects.insert(
            path.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check(&inner, FailPoint::RemoveBlobs)?;
        for path in paths {
            inner.objects.remove(path);
        }
        Ok(())
    }
}
