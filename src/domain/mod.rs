//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Generation Context: 生成请求与远程任务状态
//! - Playback Context: 音频变体与播放器身份

pub mod generation;
pub mod playback;
