//! Playback Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 播放器唯一标识（每个 AudioWidget 创建时分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 音频变体 - 批次中的一个可播放结果
///
/// 不变量:
/// - `index` 等于其在批次中的位置（插入顺序即展示顺序）
/// - `locator` 为可直接获取的绝对地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioVariant {
    index: usize,
    locator: String,
}

impl AudioVariant {
    /// 按顺序从已解析的地址列表构建变体
    pub fn from_locators<I, S>(locators: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        locators
            .into_iter()
            .enumerate()
            .map(|(index, locator)| Self {
                index,
                locator: locator.into(),
            })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn label(&self) -> String {
        format!("Variant {}", self.index + 1)
    }
}

/// 切换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Previous,
    Next,
}

/// 将秒数格式化为 `m:ss`
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
