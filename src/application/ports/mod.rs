//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod generation_backend;
mod media_engine;

pub use generation_backend::{
    BackendError, DeleteResponse, GenerationBackendPort, GenerationItem, HealthStatus,
    HistoryPage, LyricsRequest, LyricsResponse, SubmitResponse, TaskStatusResponse,
    GENERIC_REQUEST_FAILURE,
};
pub use media_engine::{
    EngineError, EngineEvent, EngineEventReceiver, EngineEventSender, MediaEngine,
    MediaEngineFactory,
};
