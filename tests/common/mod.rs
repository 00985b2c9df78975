use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use chrono::{Duration, NaiveDateTime, Utc};
use deedbook::config::{AppConfig, EngineConfig};
use deedbook::db;
use deedbook::engine::{AnalysisInput, EngineError, Evaluator, RuleEngine, Verdict};
use deedbook::models::{Deed, DeedPatch, NewDeed};
use deedbook::routes;
use deedbook::state::AppState;
use deedbook::store::{matches_search, DeedPage, DeedStore, ListQuery, StoreError, StoreResult};
use http_body_util::BodyExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Deeds kept in insertion order; listing walks them newest first.
#[derive(Default)]
pub struct MemoryDeedStore {
    deeds: Mutex<Vec<Deed>>,
    clock: Mutex<Option<NaiveDateTime>>,
}

impl MemoryDeedStore {
    /// Strictly increasing timestamps so ordering by creation is stable.
    async fn tick(&self) -> NaiveDateTime {
        let mut clock = self.clock.lock().await;
        let next = match *clock {
            Some(previous) => previous + Duration::milliseconds(1),
            None => Utc::now().naive_utc(),
        };
        *clock = Some(next);
        next
    }

    #[allow(dead_code)]
    pub async fn snapshot(&self, id: Uuid) -> Option<Deed> {
        let guard = self.deeds.lock().await;
        guard.iter().find(|deed| deed.id == id).cloned()
    }

    #[allow(dead_code)]
    pub async fn len(&self) -> usize {
        self.deeds.lock().await.len()
    }
}

#[async_trait]
impl DeedStore for MemoryDeedStore {
    async fn create(&self, deed: NewDeed) -> StoreResult<Deed> {
        let now = self.tick().await;
        let stored = Deed {
            id: deed.id,
            title: deed.title,
            document_type: deed.document_type,
            has_inquiry_history: deed.has_inquiry_history,
            inquiry_date: deed.inquiry_date,
            deed_date: deed.deed_date,
            uses_tashil_law: deed.uses_tashil_law,
            inquiry_response_has_issue: deed.inquiry_response_has_issue,
            text: deed.text,
            analysis_result: None,
            analysis_date: None,
            created_at: now,
            updated_at: now,
        };
        self.deeds.lock().await.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Deed> {
        let guard = self.deeds.lock().await;
        guard
            .iter()
            .find(|deed| deed.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: Uuid, patch: DeedPatch) -> StoreResult<Deed> {
        let now = self.tick().await;
        let mut guard = self.deeds.lock().await;
        let deed = guard
            .iter_mut()
            .find(|deed| deed.id == id)
            .ok_or(StoreError::NotFound)?;
        if !patch.is_empty() {
            patch.apply_to(deed);
            deed.updated_at = now;
        }
        Ok(deed.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut guard = self.deeds.lock().await;
        let before = guard.len();
        guard.retain(|deed| deed.id != id);
        if guard.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<DeedPage> {
        let needle = query.needle();
        let guard = self.deeds.lock().await;
        let matching: Vec<&Deed> = guard
            .iter()
            .rev()
            .filter(|deed| needle.as_deref().map_or(true, |n| matches_search(deed, n)))
            .collect();
        let total = matching.len() as i64;
        let deeds = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(DeedPage { deeds, total })
    }

    async fn record_analysis(
        &self,
        id: Uuid,
        result: &str,
        analyzed_at: NaiveDateTime,
    ) -> StoreResult<Deed> {
        let mut guard = self.deeds.lock().await;
        let deed = guard
            .iter_mut()
            .find(|deed| deed.id == id)
            .ok_or(StoreError::NotFound)?;
        deed.analysis_result = Some(result.to_string());
        deed.analysis_date = Some(analyzed_at);
        deed.updated_at = analyzed_at;
        Ok(deed.clone())
    }
}

/// Wraps the rule engine and counts invocations.
#[derive(Default)]
pub struct CountingEvaluator {
    calls: AtomicUsize,
}

impl CountingEvaluator {
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for CountingEvaluator {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn evaluate(&self, input: &AnalysisInput) -> Result<Verdict, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Evaluator::evaluate(&RuleEngine::new(), input).await
    }
}

/// Always fails the way a crashed engine process does.
#[derive(Default)]
pub struct FailingEvaluator {
    calls: AtomicUsize,
}

impl FailingEvaluator {
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for FailingEvaluator {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn evaluate(&self, _input: &AnalysisInput) -> Result<Verdict, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::Execution {
            message: "engine exited with exit status: 1".to_string(),
            diagnostics: Some("Traceback: rule table missing".to_string()),
        })
    }
}

pub struct TestApp {
    #[allow(dead_code)]
    pub state: AppState,
    router: Router,
    store: Arc<MemoryDeedStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_evaluator(Arc::new(CountingEvaluator::default()))
    }

    pub fn with_evaluator(evaluator: Arc<dyn Evaluator>) -> Self {
        let config = AppConfig {
            database_url: "postgres://unused@localhost/deedbook_test".to_string(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            engine: EngineConfig::default(),
        };

        let store = Arc::new(MemoryDeedStore::default());
        let store_for_state: Arc<dyn DeedStore> = store.clone();
        let state = AppState::new(config, store_for_state, evaluator);
        let router = routes::create_router(state.clone());

        Self {
            state,
            router,
            store,
        }
    }

    #[allow(dead_code)]
    pub fn store(&self) -> Arc<MemoryDeedStore> {
        self.store.clone()
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    #[allow(dead_code)]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload).await
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        self.send(request).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body.collect().await?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_json(response: hyper::Response<Body>) -> Result<serde_json::Value> {
    let bytes = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
