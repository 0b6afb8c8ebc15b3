//! Musegen - 音乐生成客户端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Generation Context: 生成请求、任务标识与状态
//! - Playback Context: 音频变体、播放器身份
//!
//! 应用层 (application/):
//! - Ports: 端口定义（GenerationBackend, MediaEngine）
//! - Tracker: 任务轮询
//! - Playback: 单声道仲裁 + 多变体播放器
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 后端客户端、地址解析、测试用 Fake 实现

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
