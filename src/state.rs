// src/state.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::extract::FromRef;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::Config,
    flow::{
        AssessmentFlow, FlowError,
        photos::PreviewRegistry,
        submission::SubmissionReport,
    },
    store::Backend,
};

pub type SharedFlow = Arc<Mutex<AssessmentFlow>>;

struct SessionEntry {
    flow: SharedFlow,
    touched: Instant,
}

/// Live assessment flows keyed by session id.
///
/// Each flow sits behind its own lock so that two sessions never wait on each
/// other; the outer map lock is only held to look up, insert or remove.
#[derive(Clone, Default)]
pub struct FlowSessions {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl FlowSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, flow: AssessmentFlow) -> (Uuid, SharedFlow) {
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(flow));
        self.inner.write().await.insert(
            id,
            SessionEntry {
                flow: shared.clone(),
                touched: Instant::now(),
            },
        );
        (id, shared)
    }

    /// Looks up a session and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<SharedFlow> {
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.touched = Instant::now();
        Some(entry.flow.clone())
    }

    /// Drops the session. Its previews go once the last handle to the flow is gone.
    pub async fn remove(&self, id: Uuid) -> Option<SharedFlow> {
        self.inner.write().await.remove(&id).map(|entry| entry.flow)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Removes sessions idle for at least `ttl` and returns how many went.
    ///
    /// A flow that is locked by a request or in the middle of a submission is
    /// kept until a later sweep.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let expired: Vec<SharedFlow> = {
            let mut sessions = self.inner.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| entry.touched.elapsed() >= ttl)
                .filter(|(_, entry)| match entry.flow.try_lock() {
                    Ok(flow) => !flow.is_submitting(),
                    Err(_) => false,
                })
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| sessions.remove(id))
                .map(|entry| entry.flow)
                .collect()
        };
        // Dropped after the map lock is released, which frees their previews
        expired.len()
    }

    /// Spawns the periodic expiry sweep.
    pub fn spawn_sweeper(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            tracing::info!("Session sweeper started (ttl {:?}, every {:?})", ttl, every);
            loop {
                ticker.tick().await;
                let swept = sessions.sweep_expired(ttl).await;
                if swept > 0 {
                    tracing::info!("Expired {} idle assessment sessions", swept);
                }
            }
        })
    }

    /// Submits the flow of session `id`.
    ///
    /// The remote writes and the bookkeeping after them run on their own task,
    /// so a caller that goes away mid-submit never strands the flow in the
    /// submitting state or skips the compensations. The flow lock is not held
    /// during the writes; concurrent requests see the submitting state.
    /// On success the session ends.
    pub async fn submit(
        &self,
        id: Uuid,
        shared: SharedFlow,
        backend: Backend,
    ) -> Result<SubmissionReport, FlowError> {
        let submission = shared.lock().await.begin_submission()?;
        tracing::info!(
            "Submitting assessment {}: {} photos, {} answers",
            id,
            submission.photos.len(),
            submission.answers.len()
        );

        let sessions = self.clone();
        let task = tokio::spawn(async move {
            let result = submission.execute(&backend).await;
            let report = shared.lock().await.finish_submission(result)?;
            sessions.remove(id).await;
            Ok::<_, FlowError>(report)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Submission task for assessment {} failed: {}", id, e);
                Err(FlowError::RemoteWrite)
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub config: Config,
    pub sessions: FlowSessions,
    pub previews: PreviewRegistry,
}

impl AppState {
    pub fn new(backend: Backend, config: Config) -> Self {
        Self {
            backend,
            config,
            sessions: FlowSessions::new(),
            previews: PreviewRegistry::new(),
        }
    }
}

impl FromRef<AppState> for Backend {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for FlowSessions {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for PreviewRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.previews.clone()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use sqlx::types::Json;

    use super::*;
    use crate::{
        flow::{Phase, photos::CandidatePhoto},
        models::{
            question::{Question, QuestionType},
            user::UpdateDetailsRequest,
        },
        store::memory::{FailPoint, MemoryStore},
    };

    fn flow(previews: &PreviewRegistry) -> AssessmentFlow {
        let question = Question {
            id: 1,
            question_text: "How much do you value alone time?".to_string(),
            category: "Lifestyle Preferences".to_string(),
            options: None::<Json<Vec<String>>>,
            question_type: QuestionType::Scale,
            created_at: None,
        };
        AssessmentFlow::new(vec![question], previews.clone()).unwrap()
    }

    fn with_photos(previews: &PreviewRegistry) -> AssessmentFlow {
        let mut f = flow(previews);
        f.record_answer(1, "7").unwrap();
        f.advance().unwrap();
        f.accept_photos(
            ["a.jpg", "b.jpg", "c.jpg"]
                .into_iter()
                .map(|name| CandidatePhoto {
                    file_name: name.to_string(),
                    content_type: "image/jpeg".to_string(),
                    bytes: Bytes::from_static(b"jpeg"),
                })
                .collect(),
        )
        .unwrap();
        f
    }

    /// Three photos, valid details, parked on the details step.
    fn ready(previews: &PreviewRegistry) -> AssessmentFlow {
        let mut f = with_photos(previews);
        f.advance().unwrap();
        f.update_details(UpdateDetailsRequest {
            full_name: Some("Jo Doe".to_string()),
            email: Some("jo@example.com".to_string()),
            gender: Some("female".to_string()),
            age: Some("29".to_string()),
        })
        .unwrap();
        f
    }

    fn slow_backend(delay: Duration) -> (MemoryStore, Backend) {
        let store = MemoryStore::with_bucket("user-photos");
        store.delay_uploads(delay);
        let backend = Backend::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        );
        (store, backend)
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_removable() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();

        let (a, _) = sessions.create(flow(&previews)).await;
        let (b, _) = sessions.create(flow(&previews)).await;
        assert_ne!(a, b);
        assert_eq!(sessions.len().await, 2);

        sessions
            .get(a)
            .await
            .unwrap()
            .lock()
            .await
            .record_answer(1, "4")
            .unwrap();
        assert!(sessions.get(b).await.unwrap().lock().await.answers().is_empty());

        assert!(sessions.remove(a).await.is_some());
        assert!(sessions.get(a).await.is_none());
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn idle_sessions_expire_and_release_their_previews() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();

        let (idle, shared) = sessions.create(with_photos(&previews)).await;
        drop(shared);
        assert_eq!(previews.len(), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let (fresh, _) = sessions.create(flow(&previews)).await;

        assert_eq!(sessions.sweep_expired(Duration::from_millis(40)).await, 1);
        assert!(sessions.get(idle).await.is_none());
        assert!(sessions.get(fresh).await.is_some());
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn using_a_session_keeps_it_alive() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (id, _) = sessions.create(flow(&previews)).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(sessions.get(id).await.is_some());

        assert_eq!(sessions.sweep_expired(Duration::from_millis(40)).await, 0);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn submitting_sessions_are_not_swept() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (id, shared) = sessions.create(ready(&previews)).await;
        let _submission = shared.lock().await.begin_submission().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sessions.sweep_expired(Duration::ZERO).await, 0);
        assert!(sessions.get(id).await.is_some());
    }

    #[tokio::test]
    async fn sweeper_runs_on_its_own() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (_, shared) = sessions.create(with_photos(&previews)).await;
        drop(shared);

        let sweeper = sessions.spawn_sweeper(Duration::from_millis(20), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(150)).await;
        sweeper.abort();

        assert_eq!(sessions.len().await, 0);
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn submit_ends_the_session() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (store, backend) = slow_backend(Duration::ZERO);
        let (id, shared) = sessions.create(ready(&previews)).await;

        let report = sessions.submit(id, shared, backend).await.unwrap();

        assert_eq!(report.photo_paths.len(), 3);
        assert_eq!(store.users().len(), 1);
        assert!(sessions.get(id).await.is_none());
        assert!(previews.is_empty());
    }

    #[tokio::test]
    async fn dropped_submit_still_completes() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (store, backend) = slow_backend(Duration::from_millis(200));
        let (id, shared) = sessions.create(ready(&previews)).await;

        // The caller gives up while the uploads are still running.
        let gave_up = tokio::time::timeout(
            Duration::from_millis(50),
            sessions.submit(id, shared.clone(), backend),
        )
        .await;
        assert!(gave_up.is_err());
        assert!(shared.lock().await.is_submitting());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(matches!(shared.lock().await.phase(), Phase::Submitted { .. }));
        assert!(sessions.get(id).await.is_none());
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.object_paths().len(), 3);
    }

    #[tokio::test]
    async fn dropped_failing_submit_is_compensated_and_retryable() {
        let previews = PreviewRegistry::new();
        let sessions = FlowSessions::new();
        let (store, backend) = slow_backend(Duration::from_millis(200));
        store.fail_on(FailPoint::Upload);
        let (id, shared) = sessions.create(ready(&previews)).await;

        let gave_up = tokio::time::timeout(
            Duration::from_millis(50),
            sessions.submit(id, shared.clone(), backend.clone()),
        )
        .await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        {
            let flow = shared.lock().await;
            assert_eq!(flow.phase(), Phase::Editing);
            assert!(flow.last_error().is_some());
        }
        assert!(store.users().is_empty());
        assert!(store.object_paths().is_empty());

        store.clear_failures();
        store.delay_uploads(Duration::ZERO);
        let report = sessions.submit(id, shared, backend).await.unwrap();
        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0, report.user_id);
        assert!(sessions.get(id).await.is_none());
    }
}
