//! Generation Controller - 结果视图编排
//!
//! 最多持有一个正在跟踪的任务。新的提交会先拆除旧任务，
//! 旧任务之后的任何查询结果都不会再影响当前阶段。

use crate::application::error::ApplicationError;
use crate::application::tracker::{TaskHandle, TaskOutcome, TaskSnapshot, TaskTracker, TrackedTask};
use crate::domain::generation::{GenerationRequest, TaskStatus};
use crate::domain::playback::AudioVariant;

/// 结果视图所处阶段
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationPhase {
    Idle,
    Submitting,
    /// 提交被拒绝（本地校验或后端错误），携带展示文案
    SubmitError(String),
    Queued,
    /// 包括后端返回的未知非终态
    Running,
    Succeeded(Vec<AudioVariant>),
    Failed(String),
}

impl GenerationPhase {
    fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        match &snapshot.outcome {
            Some(TaskOutcome::Succeeded(variants)) => Self::Succeeded(variants.clone()),
            Some(TaskOutcome::Failed(message)) => Self::Failed(message.clone()),
            None if snapshot.status == TaskStatus::Queued => Self::Queued,
            None => Self::Running,
        }
    }

    /// 提交中或任务未结束
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Queued | Self::Running)
    }

    pub fn progress_label(&self) -> Option<&'static str> {
        match self {
            Self::Queued => Some(TaskStatus::Queued.progress_label()),
            Self::Running => Some(TaskStatus::Running.progress_label()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::SubmitError(message) | Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// 解析完成前始终为空
    pub fn variants(&self) -> &[AudioVariant] {
        match self {
            Self::Succeeded(variants) => variants,
            _ => &[],
        }
    }
}

/// Generation Controller
pub struct GenerationController {
    tracker: TaskTracker,
    current: Option<TrackedTask>,
    phase: GenerationPhase,
}

impl GenerationController {
    pub fn new(tracker: TaskTracker) -> Self {
        Self {
            tracker,
            current: None,
            phase: GenerationPhase::Idle,
        }
    }

    /// 提交新的生成请求，取代当前任务
    pub async fn generate(&mut self, request: GenerationRequest) -> Result<TaskHandle, ApplicationError> {
        if let Some(previous) = self.current.take() {
            tracing::info!(task_id = %previous.handle().task_id, "Superseding tracked generation");
        }
        self.phase = GenerationPhase::Submitting;

        match self.tracker.submit(request).await {
            Ok(task) => {
                let handle = task.handle().clone();
                self.current = Some(task);
                self.phase = GenerationPhase::Queued;
                Ok(handle)
            }
            Err(e) => {
                self.phase = GenerationPhase::SubmitError(e.user_message());
                Err(e)
            }
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        match &self.current {
            Some(task) => GenerationPhase::from_snapshot(&task.snapshot()),
            None => self.phase.clone(),
        }
    }

    /// 等待当前任务结束，返回最终阶段
    pub async fn wait(&self) -> GenerationPhase {
        if let Some(task) = &self.current {
            task.wait().await;
        }
        self.phase()
    }

    pub fn variants(&self) -> Vec<AudioVariant> {
        self.phase().variants().to_vec()
    }

    pub fn current_task(&self) -> Option<&TrackedTask> {
        self.current.as_ref()
    }

    /// 放弃当前任务，回到空闲
    pub fn reset(&mut self) {
        self.current = None;
        self.phase = GenerationPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BackendError, SubmitResponse};
    use crate::application::tracker::TaskTrackerConfig;
    use crate::application::{AudioWidget, PlaybackArbiter};
    use crate::infrastructure::adapters::{
        scripted_status, ApiBase, FakeBackendClient, FakeMediaEngineFactory,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_millis(2000);

    fn controller(backend: Arc<FakeBackendClient>) -> GenerationController {
        GenerationController::new(TaskTracker::new(
            backend,
            TaskTrackerConfig {
                poll_interval: INTERVAL,
            },
        ))
    }

    fn backend() -> FakeBackendClient {
        let api_base =
            ApiBase::for_page_origin("http://localhost:3000", 3000, 8000, "/api").unwrap();
        FakeBackendClient::new(api_base).with_submit_result(Ok(SubmitResponse {
            id: 1,
            task_id: "task-1".to_string(),
            status: TaskStatus::Queued,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_of_two_resolves_two_variants() {
        let backend = Arc::new(backend().with_statuses(vec![
            scripted_status("task-1", "queued", &[]),
            scripted_status("task-1", "running", &[]),
            scripted_status("task-1", "succeeded", &["/audio/a.wav", "/audio/b.wav"]),
        ]));
        let mut controller = controller(backend.clone());
        assert_eq!(controller.phase(), GenerationPhase::Idle);

        let request = GenerationRequest::new("ambient piano").with_batch_size(2);
        controller.generate(request).await.unwrap();
        assert_eq!(controller.phase(), GenerationPhase::Queued);
        assert_eq!(
            controller.phase().progress_label(),
            Some("Waiting in queue...")
        );
        assert!(controller.variants().is_empty());

        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(controller.phase(), GenerationPhase::Running);
        assert_eq!(controller.phase().progress_label(), Some("Generating..."));
        assert!(controller.variants().is_empty());

        let phase = controller.wait().await;
        assert!(!phase.is_busy());
        let variants = controller.variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].locator(), "http://localhost:8000/api/audio/a.wav");
        assert_eq!(variants[1].locator(), "http://localhost:8000/api/audio/b.wav");
        assert_eq!(backend.submitted_requests()[0].batch_size, 2);

        let factory = FakeMediaEngineFactory::default();
        let arbiter = PlaybackArbiter::new(16);
        let widget = AudioWidget::mount(variants, Arc::new(factory.clone()), &arbiter);
        assert_eq!(
            widget.snapshot().labels(),
            vec!["Variant 1".to_string(), "Variant 2".to_string()]
        );
        widget.unmount().await;
        assert_eq!(factory.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_generation_shows_single_message() {
        let backend = Arc::new(
            backend().with_statuses(vec![scripted_status("task-1", "failed", &[])]),
        );
        let mut controller = controller(backend.clone());
        controller
            .generate(GenerationRequest::new("ambient piano"))
            .await
            .unwrap();

        let phase = controller.wait().await;
        assert_eq!(
            phase,
            GenerationPhase::Failed("Generation failed. Try again.".to_string())
        );
        assert_eq!(phase.error_message(), Some("Generation failed. Try again."));
        assert!(controller.variants().is_empty());

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_error_is_surfaced() {
        let backend = Arc::new(backend().with_submit_result(Err(BackendError::ServiceError {
            status: 422,
            detail: "prompt too long".to_string(),
        })));
        let mut controller = controller(backend.clone());

        let result = controller
            .generate(GenerationRequest::new("ambient piano"))
            .await;
        assert!(result.is_err());
        assert_eq!(
            controller.phase(),
            GenerationPhase::SubmitError("prompt too long".to_string())
        );
        assert!(controller.current_task().is_none());
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_never_reaches_backend() {
        let backend = Arc::new(backend());
        let mut controller = controller(backend.clone());

        let result = controller
            .generate(GenerationRequest::new("ambient piano").with_batch_size(0))
            .await;
        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        assert!(matches!(
            controller.phase(),
            GenerationPhase::SubmitError(_)
        ));
        assert_eq!(backend.calls("submit"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_submission_tears_down_previous() {
        let backend = Arc::new(
            backend().with_statuses(vec![scripted_status("task-1", "running", &[])]),
        );
        let mut controller = controller(backend.clone());

        controller
            .generate(GenerationRequest::new("first"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.status_calls(), 1);

        controller
            .generate(GenerationRequest::new("second"))
            .await
            .unwrap();
        // 只有第二个任务还在轮询：立即一次 + 4 个间隔
        tokio::time::sleep(INTERVAL * 5 - Duration::from_millis(100)).await;
        assert_eq!(backend.status_calls(), 6);
        assert_eq!(backend.submitted_requests().len(), 2);
        assert_eq!(controller.phase(), GenerationPhase::Running);

        controller.reset();
        assert_eq!(controller.phase(), GenerationPhase::Idle);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(backend.status_calls(), 6);
    }
}
