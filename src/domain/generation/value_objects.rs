//! Generation Context - Value Objects

use serde::{Deserialize, Serialize};

use super::DomainError;

/// 远程任务唯一标识（后端返回的不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::EmptyTaskId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态
///
/// 不变量:
/// - 只沿 `queued -> running -> {succeeded | failed}` 推进
/// - 未知状态字符串视为运行中，但绝不会被当作 `succeeded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    /// 后端返回的其他状态，按 running 处理
    Other(String),
}

impl TaskStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running | Self::Other(_) => 1,
            Self::Succeeded | Self::Failed => 2,
        }
    }

    /// 是否允许从当前状态迁移到 `next`
    ///
    /// 终态之后不再迁移；状态回退（如 running 之后又报告 queued）被忽略。
    pub fn can_advance_to(&self, next: &TaskStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }

    /// 进行中状态的展示文案
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Queued => "Waiting in queue...",
            _ => "Generating...",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 拍号（空字符串表示自动）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeSignature {
    #[default]
    #[serde(rename = "")]
    Auto,
    /// 2/4
    #[serde(rename = "2")]
    TwoFour,
    /// 3/4
    #[serde(rename = "3")]
    ThreeFour,
    /// 4/4
    #[serde(rename = "4")]
    FourFour,
    /// 6/8
    #[serde(rename = "6")]
    SixEight,
}

impl TimeSignature {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auto => "",
            Self::TwoFour => "2",
            Self::ThreeFour => "3",
            Self::FourFour => "4",
            Self::SixEight => "6",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "" => Some(Self::Auto),
            "2" => Some(Self::TwoFour),
            "3" => Some(Self::ThreeFour),
            "4" => Some(Self::FourFour),
            "6" => Some(Self::SixEight),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::TwoFour => "2/4",
            Self::ThreeFour => "3/4",
            Self::FourFour => "4/4",
            Self::SixEight => "6/8",
        }
    }
}

/// 生成请求
///
/// 由调用方构建，提交一次后不再修改。字段名即后端 `POST /music/generate` 的 JSON 字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// 风格描述
    pub prompt: String,
    /// 歌词（可为空）
    pub lyrics: String,
    /// 目标时长（秒），None 表示自动
    pub duration: Option<f32>,
    pub bpm: Option<u16>,
    /// 调式，空字符串表示自动
    pub key_scale: String,
    pub time_signature: TimeSignature,
    pub vocal_language: String,
    /// 是否启用 LM 扩展推理
    pub thinking: bool,
    /// 生成变体数量
    pub batch_size: u8,
    pub inference_steps: u8,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            lyrics: String::new(),
            duration: Some(60.0),
            bpm: Some(120),
            key_scale: String::new(),
            time_signature: TimeSignature::Auto,
            vocal_language: "en".to_string(),
            thinking: true,
            batch_size: 2,
            inference_steps: 8,
        }
    }
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = lyrics.into();
        self
    }

    pub fn with_duration(mut self, duration: Option<f32>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_bpm(mut self, bpm: Option<u16>) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn with_key_scale(mut self, key_scale: impl Into<String>) -> Self {
        self.key_scale = key_scale.into();
        self
    }

    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = time_signature;
        self
    }

    pub fn with_vocal_language(mut self, language: impl Into<String>) -> Self {
        self.vocal_language = language.into();
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = thinking;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u8) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_inference_steps(mut self, steps: u8) -> Self {
        self.inference_steps = steps;
        self
    }

    /// 按后端的参数范围校验
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.prompt.is_empty() && self.lyrics.is_empty() {
            return Err(DomainError::MissingContent);
        }
        if let Some(duration) = self.duration {
            if !(10.0..=300.0).contains(&duration) {
                return Err(DomainError::DurationOutOfRange(duration));
            }
        }
        if let Some(bpm) = self.bpm {
            if !(30..=300).contains(&bpm) {
                return Err(DomainError::BpmOutOfRange(bpm));
            }
        }
        if !(1..=8).contains(&self.batch_size) {
            return Err(DomainError::BatchSizeOutOfRange(self.batch_size));
        }
        if !(1..=50).contains(&self.inference_steps) {
            return Err(DomainError::InferenceStepsOutOfRange(self.inference_steps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_keeps_unknown_values() {
        assert_eq!(TaskStatus::parse("queued"), TaskStatus::Queued);
        assert_eq!(TaskStatus::parse("succeeded"), TaskStatus::Succeeded);
        let other = TaskStatus::parse("processing");
        assert_eq!(other, TaskStatus::Other("processing".to_string()));
        assert!(!other.is_terminal());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(TaskStatus::Queued.can_advance_to(&TaskStatus::Running));
        assert!(TaskStatus::Running.can_advance_to(&TaskStatus::Other("x".into())));
        assert!(TaskStatus::Running.can_advance_to(&TaskStatus::Failed));
        assert!(!TaskStatus::Running.can_advance_to(&TaskStatus::Queued));
        assert!(!TaskStatus::Succeeded.can_advance_to(&TaskStatus::Failed));
        assert!(!TaskStatus::Failed.can_advance_to(&TaskStatus::Running));
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(TaskStatus::Queued.progress_label(), "Waiting in queue...");
        assert_eq!(TaskStatus::Running.progress_label(), "Generating...");
    }

    #[test]
    fn test_empty_task_id_rejected() {
        assert_eq!(TaskId::new("  "), Err(DomainError::EmptyTaskId));
        assert_eq!(TaskId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_request_serializes_backend_field_names() {
        let request = GenerationRequest::new("ambient piano")
            .with_duration(None)
            .with_time_signature(TimeSignature::SixEight);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["prompt"], "ambient piano");
        assert_eq!(json["lyrics"], "");
        assert!(json["duration"].is_null());
        assert_eq!(json["bpm"], 120);
        assert_eq!(json["key_scale"], "");
        assert_eq!(json["time_signature"], "6");
        assert_eq!(json["vocal_language"], "en");
        assert_eq!(json["thinking"], true);
        assert_eq!(json["batch_size"], 2);
        assert_eq!(json["inference_steps"], 8);
    }

    #[test]
    fn test_auto_time_signature_is_empty_code() {
        let json = serde_json::to_value(TimeSignature::Auto).unwrap();
        assert_eq!(json, "");
        assert_eq!(TimeSignature::from_code("4"), Some(TimeSignature::FourFour));
        assert_eq!(TimeSignature::from_code("5"), None);
    }

    #[test]
    fn test_validation() {
        assert!(GenerationRequest::new("lofi").validate().is_ok());
        assert!(GenerationRequest::new("")
            .with_lyrics("[Verse]\nhello")
            .validate()
            .is_ok());
        assert_eq!(
            GenerationRequest::new("").validate(),
            Err(DomainError::MissingContent)
        );
        // 只做空值判断，不裁剪空白
        assert!(GenerationRequest::new(" ").validate().is_ok());
        assert_eq!(
            GenerationRequest::new("x").with_duration(Some(5.0)).validate(),
            Err(DomainError::DurationOutOfRange(5.0))
        );
        assert_eq!(
            GenerationRequest::new("x").with_bpm(Some(301)).validate(),
            Err(DomainError::BpmOutOfRange(301))
        );
        assert_eq!(
            GenerationRequest::new("x").with_batch_size(0).validate(),
            Err(DomainError::BatchSizeOutOfRange(0))
        );
        assert_eq!(
            GenerationRequest::new("x").with_inference_steps(51).validate(),
            Err(DomainError::InferenceStepsOutOfRange(51))
        );
    }
}
