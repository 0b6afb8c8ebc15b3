//! Task Tracker - 远程生成任务跟踪
//!
//! 提交后立即查询一次状态，之后按固定间隔轮询，直到观察到终态或被拆除。
//!
//! 约束:
//! - 同一任务同一时刻最多一个在途查询（顺序轮询，上一次返回后才会等待下一个间隔）
//! - 每次查询返回后先检查存活标记，拆除之后到达的结果一律丢弃
//! - 观察到的状态单调推进，终态只出现一次
//! - 查询失败（网络或服务端错误）不是终态，下个间隔重试
//! - `succeeded` 但没有音频地址视为未完成，继续轮询

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::error::{ApplicationError, GENERATION_FAILED_MESSAGE};
use crate::application::ports::{GenerationBackendPort, TaskStatusResponse};
use crate::config::PollConfig;
use crate::domain::generation::{GenerationRequest, TaskId, TaskStatus};
use crate::domain::playback::AudioVariant;

/// 任务最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// 按后端返回顺序排列的已解析音频变体
    Succeeded(Vec<AudioVariant>),
    /// 展示给用户的失败文案
    Failed(String),
}

/// 任务句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    /// 持久化记录 ID
    pub id: i64,
    pub task_id: TaskId,
}

/// 任务快照
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    /// 只在观察到终态时设置，之后不再变化
    pub outcome: Option<TaskOutcome>,
}

impl TaskSnapshot {
    fn queued() -> Self {
        Self {
            status: TaskStatus::Queued,
            outcome: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// 跟踪器配置
#[derive(Debug, Clone)]
pub struct TaskTrackerConfig {
    pub poll_interval: Duration,
}

impl Default for TaskTrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
        }
    }
}

impl From<&PollConfig> for TaskTrackerConfig {
    fn from(config: &PollConfig) -> Self {
        Self {
            poll_interval: config.interval(),
        }
    }
}

/// 任务跟踪器
#[derive(Clone)]
pub struct TaskTracker {
    backend: Arc<dyn GenerationBackendPort>,
    config: TaskTrackerConfig,
}

impl TaskTracker {
    pub fn new(backend: Arc<dyn GenerationBackendPort>, config: TaskTrackerConfig) -> Self {
        Self { backend, config }
    }

    /// 提交生成请求并开始跟踪
    ///
    /// 请求在本地校验失败时不发起任何网络请求。
    pub async fn submit(&self, request: GenerationRequest) -> Result<TrackedTask, ApplicationError> {
        request.validate()?;

        let response = self.backend.submit(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "Generation submit failed");
            ApplicationError::from(e)
        })?;

        let task_id = TaskId::new(response.task_id)
            .map_err(|_| ApplicationError::InvalidResponse("missing task_id".to_string()))?;

        tracing::info!(
            id = response.id,
            task_id = %task_id,
            batch_size = request.batch_size,
            "Generation submitted"
        );

        Ok(self.track(TaskHandle {
            id: response.id,
            task_id,
        }))
    }

    /// 跟踪一个已存在的任务
    ///
    /// 必须在 Tokio 运行时中调用。
    pub fn track(&self, handle: TaskHandle) -> TrackedTask {
        let (state_tx, state_rx) = watch::channel(TaskSnapshot::queued());
        let cancel = CancellationToken::new();

        tokio::spawn(poll_until_terminal(
            self.backend.clone(),
            handle.task_id.clone(),
            self.config.poll_interval,
            state_tx,
            cancel.clone(),
        ));

        TrackedTask {
            handle,
            state: state_rx,
            cancel,
        }
    }
}

/// 正在跟踪的任务
///
/// 丢弃即拆除：轮询停止，之后到达的查询结果不会再生效。
pub struct TrackedTask {
    handle: TaskHandle,
    state: watch::Receiver<TaskSnapshot>,
    cancel: CancellationToken,
}

impl TrackedTask {
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.state.borrow().status.clone()
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.state.borrow().outcome.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.state.clone()
    }

    /// 等待终态；任务在此之前被拆除时返回 None
    pub async fn wait(&self) -> Option<TaskOutcome> {
        let mut state = self.state.clone();
        let result = state
            .wait_for(|snapshot| snapshot.outcome.is_some())
            .await
            .ok()
            .and_then(|snapshot| snapshot.outcome.clone());
        result
    }

    /// 停止轮询
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(task_id = %self.handle.task_id, "Task tracking torn down");
            self.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.state.borrow().is_terminal()
    }
}

impl Drop for TrackedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 轮询循环
async fn poll_until_terminal(
    backend: Arc<dyn GenerationBackendPort>,
    task_id: TaskId,
    interval: Duration,
    state: watch::Sender<TaskSnapshot>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut checks: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        checks += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = backend.task_status(&task_id) => result,
        };

        // 拆除之后到达的结果不再生效
        if cancel.is_cancelled() {
            break;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_transport() => {
                tracing::debug!(task_id = %task_id, check = checks, error = %e, "Status check failed, retrying");
                continue;
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, check = checks, error = %e, "Status check rejected, retrying");
                continue;
            }
        };

        if apply_status(&state, response, backend.as_ref()) {
            let snapshot = state.borrow().clone();
            match &snapshot.outcome {
                Some(TaskOutcome::Succeeded(variants)) => tracing::info!(
                    task_id = %task_id,
                    checks = checks,
                    variants = variants.len(),
                    "Generation succeeded"
                ),
                _ => tracing::warn!(task_id = %task_id, checks = checks, "Generation failed"),
            }
            return;
        }
    }

    tracing::debug!(task_id = %task_id, checks = checks, "Polling stopped");
}

/// 应用一次查询结果，返回是否到达终态
fn apply_status(
    state: &watch::Sender<TaskSnapshot>,
    response: TaskStatusResponse,
    backend: &dyn GenerationBackendPort,
) -> bool {
    match response.status {
        TaskStatus::Succeeded if !response.audio_urls.is_empty() => {
            let variants = AudioVariant::from_locators(
                response
                    .audio_urls
                    .iter()
                    .map(|path| backend.resolve_audio_url(path)),
            );
            state.send_modify(|snapshot| {
                snapshot.status = TaskStatus::Succeeded;
                snapshot.outcome = Some(TaskOutcome::Succeeded(variants));
            });
            true
        }
        TaskStatus::Failed => {
            state.send_modify(|snapshot| {
                snapshot.status = TaskStatus::Failed;
                snapshot.outcome = Some(TaskOutcome::Failed(GENERATION_FAILED_MESSAGE.to_string()));
            });
            true
        }
        // 成功但还没有音频，按生成中处理
        TaskStatus::Succeeded => {
            advance(state, TaskStatus::Running);
            false
        }
        status => {
            advance(state, status);
            false
        }
    }
}

fn advance(state: &watch::Sender<TaskSnapshot>, next: TaskStatus) {
    state.send_if_modified(|snapshot| {
        if snapshot.status != next && snapshot.status.can_advance_to(&next) {
            snapshot.status = next;
            true
        } else {
            false
        }
    });
}
