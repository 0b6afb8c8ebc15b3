//! Fake Backend Client - 用于测试的生成服务
//!
//! 按脚本依次返回任务状态，不实际发起网络请求。记录每个接口的调用次数
//! 以及同时在途的状态查询数量。

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::api_base::ApiBase;
use crate::application::ports::{
    BackendError, DeleteResponse, GenerationBackendPort, GenerationItem, HealthStatus,
    HistoryPage, LyricsRequest, LyricsResponse, SubmitResponse, TaskStatusResponse,
};
use crate::domain::generation::{GenerationRequest, TaskId, TaskStatus};

pub type ScriptedStatus = Result<TaskStatusResponse, BackendError>;

/// 构造一条脚本状态
pub fn scripted_status(task_id: &str, status: &str, audio_urls: &[&str]) -> ScriptedStatus {
    Ok(TaskStatusResponse {
        task_id: task_id.to_string(),
        status: TaskStatus::parse(status),
        audio_urls: audio_urls.iter().map(|url| url.to_string()).collect(),
        generation_meta: None,
    })
}

/// Fake Backend Client
///
/// 状态脚本按顺序消费，最后一条会一直重复返回。
pub struct FakeBackendClient {
    api_base: ApiBase,
    submit_result: Mutex<Result<SubmitResponse, BackendError>>,
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    status_delay: Duration,
    lyrics: String,
    history: Mutex<Vec<GenerationItem>>,
    health: HealthStatus,
    calls: DashMap<&'static str, usize>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    submitted: Mutex<Vec<GenerationRequest>>,
}

impl FakeBackendClient {
    pub fn new(api_base: ApiBase) -> Self {
        Self {
            api_base,
            submit_result: Mutex::new(Ok(SubmitResponse {
                id: 1,
                task_id: "fake-task".to_string(),
                status: TaskStatus::Queued,
            })),
            statuses: Mutex::new(VecDeque::new()),
            status_delay: Duration::ZERO,
            lyrics: "[Verse]\nla la la".to_string(),
            history: Mutex::new(Vec::new()),
            health: HealthStatus {
                status: "ok".to_string(),
                acestep: true,
                ollama: true,
            },
            calls: DashMap::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit_result(self, result: Result<SubmitResponse, BackendError>) -> Self {
        *self.submit_result.lock().unwrap_or_else(|e| e.into_inner()) = result;
        self
    }

    pub fn with_statuses(self, statuses: Vec<ScriptedStatus>) -> Self {
        *self.statuses.lock().unwrap_or_else(|e| e.into_inner()) = statuses.into();
        self
    }

    /// 每次状态查询的模拟耗时
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = lyrics.into();
        self
    }

    pub fn with_history(self, items: Vec<GenerationItem>) -> Self {
        *self.history.lock().unwrap_or_else(|e| e.into_inner()) = items;
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    /// 某个接口被调用的次数（submit / task_status / lyrics / history / delete / health）
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.get(endpoint).map(|count| *count).unwrap_or(0)
    }

    pub fn status_calls(&self) -> usize {
        self.calls("task_status")
    }

    /// 观察到的最大同时在途状态查询数
    pub fn max_concurrent_status_checks(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted_requests(&self) -> Vec<GenerationRequest> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, endpoint: &'static str) {
        *self.calls.entry(endpoint).or_insert(0) += 1;
    }

    fn next_status(&self) -> ScriptedStatus {
        let mut statuses = self.statuses.lock().unwrap_or_else(|e| e.into_inner());
        if statuses.len() > 1 {
            statuses
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::NetworkError("empty script".to_string())))
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| Err(BackendError::NetworkError("empty script".to_string())))
        }
    }
}

#[async_trait]
impl GenerationBackendPort for FakeBackendClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, BackendError> {
        self.record("submit");
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        self.submit_result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, BackendError> {
        self.record("task_status");
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let result = self.next_status();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(task_id = %task_id, ok = result.is_ok(), "FakeBackendClient: status served");
        result
    }

    async fn generate_lyrics(
        &self,
        request: &LyricsRequest,
    ) -> Result<LyricsResponse, BackendError> {
        self.record("lyrics");
        Ok(LyricsResponse {
            lyrics: self.lyrics.clone(),
            language: request.language.clone(),
        })
    }

    async fn history(&self, page: u32, page_size: u32) -> Result<HistoryPage, BackendError> {
        self.record("history");
        let items = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let offset = (page.saturating_sub(1) as usize) * page_size as usize;
        Ok(HistoryPage {
            items: items
                .iter()
                .skip(offset)
                .take(page_size as usize)
                .cloned()
                .collect(),
            total: items.len() as u64,
        })
    }

    async fn delete_generation(&self, id: i64) -> Result<DeleteResponse, BackendError> {
        self.record("delete");
        let mut items = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(BackendError::ServiceError {
                status: 404,
                detail: "Generation not found".to_string(),
            });
        }
        Ok(DeleteResponse { ok: true })
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.record("health");
        Ok(self.health.clone())
    }

    fn resolve_audio_url(&self, path: &str) -> String {
        self.api_base.audio_url(path)
    }
}
