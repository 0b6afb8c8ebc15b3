//! Generation Backend Port - 生成服务后端抽象
//!
//! 定义与远程生成服务交互的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::generation::{GenerationRequest, TaskId, TaskStatus};

/// 默认的用户可见错误信息
pub const GENERIC_REQUEST_FAILURE: &str = "Request failed";

/// Backend 错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 非 2xx 响应，`detail` 已按错误体解析规则提取
    #[error("{detail}")]
    ServiceError { status: u16, detail: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// 传输层错误（超时、断连），轮询时会被吞掉
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::Timeout)
    }

    /// 展示给用户的错误详情
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceError { detail, .. } if !detail.is_empty() => detail.clone(),
            Self::ServiceError { .. } | Self::NetworkError(_) | Self::Timeout => {
                GENERIC_REQUEST_FAILURE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// `POST /music/generate` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: i64,
    pub task_id: String,
    pub status: TaskStatus,
}

/// `GET /music/status/{task_id}` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    /// 相对路径，需经 ApiBase 解析后才能播放
    #[serde(default)]
    pub audio_urls: Vec<String>,
    #[serde(default)]
    pub generation_meta: Option<serde_json::Value>,
}

/// `POST /lyrics/generate` 请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsRequest {
    /// 歌曲主题
    pub theme: String,
    pub language: String,
    pub genre: String,
    pub mood: String,
}

impl LyricsRequest {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            language: "en".to_string(),
            genre: "Pop".to_string(),
            mood: "Happy".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }
}

/// `POST /lyrics/generate` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsResponse {
    pub lyrics: String,
    pub language: String,
}

/// 历史记录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationItem {
    pub id: i64,
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub lyrics: String,
    pub duration: Option<f32>,
    pub bpm: Option<u16>,
    #[serde(default)]
    pub key_scale: String,
    #[serde(default)]
    pub vocal_language: String,
    #[serde(default)]
    pub audio_urls: Vec<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// `GET /history` 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<GenerationItem>,
    pub total: u64,
}

/// `DELETE /history/{id}` 响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

/// `GET /health` 响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// 音乐生成服务
    pub acestep: bool,
    /// 歌词生成服务
    pub ollama: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.acestep && self.ollama
    }
}

/// 时间戳可能不带时区（按 UTC 处理）
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        None => Ok(None),
    }
}

/// Generation Backend Port
///
/// 远程生成服务（任务队列、歌词、历史记录）的抽象接口
#[async_trait]
pub trait GenerationBackendPort: Send + Sync {
    /// 提交生成请求
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, BackendError>;

    /// 查询一次任务状态
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, BackendError>;

    /// 生成歌词
    async fn generate_lyrics(&self, request: &LyricsRequest)
        -> Result<LyricsResponse, BackendError>;

    /// 分页获取历史记录（page 从 1 开始）
    async fn history(&self, page: u32, page_size: u32) -> Result<HistoryPage, BackendError>;

    /// 删除历史记录
    async fn delete_generation(&self, id: i64) -> Result<DeleteResponse, BackendError>;

    /// 检查后端及其两个依赖服务
    async fn health(&self) -> Result<HealthStatus, BackendError>;

    /// 将后端返回的相对音频路径解析为可直接获取的地址
    fn resolve_audio_url(&self, path: &str) -> String;
}
