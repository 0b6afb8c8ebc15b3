//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（GenerationBackend、MediaEngine）
//! - tracker: 远程任务轮询跟踪
//! - playback: 播放仲裁与多变体播放器
//! - generation: 结果视图编排
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod generation;
pub mod playback;
pub mod ports;
pub mod queries;
pub mod tracker;

// Re-exports
pub use commands::{
    handlers::{DeleteGenerationHandler, GenerateLyricsHandler},
    DeleteGeneration, GenerateLyrics,
};

pub use error::{ApplicationError, GENERATION_FAILED_MESSAGE};

pub use generation::{GenerationController, GenerationPhase};

pub use playback::{
    ArbiterRegistration, AudioWidget, PlaybackArbiter, PlaybackError, PlaybackSignal,
    PlaybackSnapshot,
};

pub use ports::{
    BackendError, EngineError, EngineEvent, GenerationBackendPort, MediaEngine,
    MediaEngineFactory,
};

pub use queries::{
    handlers::{GetHealthHandler, GetHistoryHandler, HistoryEntry, HistoryView},
    GetHealth, GetHistory,
};

pub use tracker::{TaskHandle, TaskOutcome, TaskSnapshot, TaskTracker, TaskTrackerConfig, TrackedTask};
