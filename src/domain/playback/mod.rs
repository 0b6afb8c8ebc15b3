//! Playback Context - 播放限界上下文
//!
//! 职责:
//! - 音频变体（有序、只读）
//! - 播放器身份
//! - 时间展示格式

mod value_objects;

pub use value_objects::{format_clock, AudioVariant, PlayerId, StepDirection};
