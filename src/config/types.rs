//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 后端接口配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 任务轮询配置
    #[serde(default)]
    pub poll: PollConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 历史记录配置
    #[serde(default)]
    pub history: HistoryConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 后端接口配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 页面来源（决定直连后端还是同源访问）
    #[serde(default = "default_page_origin")]
    pub page_origin: String,

    /// 本地开发时前端所在端口
    #[serde(default = "default_dev_port")]
    pub dev_port: u16,

    /// 本地开发时后端所在端口
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    /// 公共接口前缀
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_page_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_dev_port() -> u16 {
    3000
}

fn default_backend_port() -> u16 {
    8000
}

fn default_prefix() -> String {
    "/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_origin: default_page_origin(),
            dev_port: default_dev_port(),
            backend_port: default_backend_port(),
            prefix: default_prefix(),
            timeout_secs: default_timeout(),
        }
    }
}

/// 任务轮询配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    2000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 播放仲裁广播通道容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// 历史记录配置
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// 每页条数
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    15
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
