//! Media Engine Port - 音频解码/波形渲染引擎抽象
//!
//! 引擎本身不在本 crate 实现，这里只约定能力与事件流。
//! 引擎通过创建时传入的 `EngineEventSender` 异步上报事件；
//! 调用方法本身不会同步触发任何事件回调。

use thiserror::Error;
use tokio::sync::mpsc;

/// 引擎错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine instance already destroyed")]
    Destroyed,

    #[error("Resource not ready")]
    NotReady,
}

/// 引擎事件
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// 资源解码完成，可以播放
    Ready { duration_secs: f64 },
    /// 播放进度
    Progress { position_secs: f64 },
    /// 播放到结尾
    Finished,
    /// 开始播放
    PlayStarted,
    /// 已暂停
    Paused,
}

pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// 单个引擎实例
///
/// 一个实例只绑定一个音频地址。销毁后的实例调用任何方法都可能返回错误。
pub trait MediaEngine: Send {
    /// 开始加载音频资源；就绪后上报 `EngineEvent::Ready`
    fn load(&mut self, locator: &str) -> Result<(), EngineError>;

    /// 播放/暂停切换；资源未就绪时引擎可以拒绝
    fn play_pause(&mut self) -> Result<(), EngineError>;

    fn pause(&mut self) -> Result<(), EngineError>;

    /// 跳转到指定位置（秒）
    fn seek_to(&mut self, position_secs: f64) -> Result<(), EngineError>;

    /// 释放解码和渲染资源
    fn destroy(&mut self) -> Result<(), EngineError>;
}

/// 引擎工厂
pub trait MediaEngineFactory: Send + Sync {
    fn create(&self, events: EngineEventSender) -> Result<Box<dyn MediaEngine>, EngineError>;
}
