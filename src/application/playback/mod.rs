//! Playback - 多播放器协调
//!
//! - arbiter: 单声道仲裁（任一时刻最多一个播放器发声）
//! - widget: 单个结果的多变体播放器

mod arbiter;
mod widget;

pub use arbiter::{ArbiterRegistration, PlaybackArbiter, PlaybackSignal};
pub use widget::{AudioWidget, PlaybackError, PlaybackSnapshot};
