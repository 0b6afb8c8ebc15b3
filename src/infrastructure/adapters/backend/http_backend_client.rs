//! HTTP Backend Client - 调用远程生成服务
//!
//! 实现 GenerationBackendPort trait，所有接口均为 JSON over HTTP:
//! - POST   {base}/music/generate
//! - GET    {base}/music/status/{task_id}
//! - POST   {base}/lyrics/generate
//! - GET    {base}/history?page=&page_size=
//! - DELETE {base}/history/{id}
//! - GET    {base}/health
//!
//! 非 2xx 响应统一转换为 `BackendError::ServiceError`，detail 取自错误体的 `detail` 字段。

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::api_base::ApiBase;
use crate::application::ports::{
    BackendError, DeleteResponse, GenerationBackendPort, HealthStatus, HistoryPage,
    LyricsRequest, LyricsResponse, SubmitResponse, TaskStatusResponse, GENERIC_REQUEST_FAILURE,
};
use crate::domain::generation::{GenerationRequest, TaskId};

/// HTTP Backend 客户端配置
#[derive(Debug, Clone)]
pub struct HttpBackendClientConfig {
    pub api_base: ApiBase,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl HttpBackendClientConfig {
    pub fn new(api_base: ApiBase) -> Self {
        Self {
            api_base,
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP Backend 客户端
pub struct HttpBackendClient {
    client: Client,
    config: HttpBackendClientConfig,
}

impl HttpBackendClient {
    pub fn new(config: HttpBackendClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        self.config.api_base.endpoint(path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = builder
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body, status.canonical_reason());
            tracing::debug!(status = %status, detail = %detail, "Backend request rejected");
            return Err(BackendError::ServiceError {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::NetworkError(format!("Cannot connect to backend: {}", e))
    } else {
        BackendError::NetworkError(e.to_string())
    }
}

/// 从错误响应体中提取用户可见的 detail
///
/// - JSON 体: `detail` 为非空字符串时直接使用，为其他非空值时使用其 JSON 文本
/// - 非 JSON 体: 使用状态码描述
/// - 都没有时使用通用文案
pub(crate) fn error_detail(body: &str, status_text: Option<&str>) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) | None => {
                GENERIC_REQUEST_FAILURE.to_string()
            }
            Some(other) => other.to_string(),
        },
        Err(_) => status_text
            .filter(|text| !text.is_empty())
            .unwrap_or(GENERIC_REQUEST_FAILURE)
            .to_string(),
    }
}

#[async_trait]
impl GenerationBackendPort for HttpBackendClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, BackendError> {
        tracing::debug!(
            url = %self.url("/music/generate"),
            prompt_len = request.prompt.len(),
            lyrics_len = request.lyrics.len(),
            batch_size = request.batch_size,
            "Submitting generation request"
        );

        let response: SubmitResponse = self
            .send_json(self.client.post(self.url("/music/generate")).json(request))
            .await?;

        tracing::info!(
            id = response.id,
            task_id = %response.task_id,
            status = %response.status,
            "Generation request accepted"
        );
        Ok(response)
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, BackendError> {
        let url = self.url(&format!("/music/status/{}", task_id));
        self.send_json(self.client.get(url)).await
    }

    async fn generate_lyrics(
        &self,
        request: &LyricsRequest,
    ) -> Result<LyricsResponse, BackendError> {
        tracing::debug!(
            language = %request.language,
            genre = %request.genre,
            mood = %request.mood,
            "Requesting lyrics"
        );
        self.send_json(self.client.post(self.url("/lyrics/generate")).json(request))
            .await
    }

    async fn history(&self, page: u32, page_size: u32) -> Result<HistoryPage, BackendError> {
        let url = self.url(&format!("/history?page={}&page_size={}", page, page_size));
        self.send_json(self.client.get(url)).await
    }

    async fn delete_generation(&self, id: i64) -> Result<DeleteResponse, BackendError> {
        let url = self.url(&format!("/history/{}", id));
        let response: DeleteResponse = self.send_json(self.client.delete(url)).await?;
        tracing::info!(id = id, ok = response.ok, "Generation deleted");
        Ok(response)
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.send_json(
            self.client
                .get(self.url("/health"))
                .timeout(Duration::from_secs(5)),
        )
        .await
    }

    fn resolve_audio_url(&self, path: &str) -> String {
        self.config.api_base.audio_url(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let api = ApiBase::for_page_origin("http://localhost:3000", 3000, 8000, "/api").unwrap();
        let config = HttpBackendClientConfig::new(api).with_timeout(60);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.api_base.base(), "http://localhost:8000/api");
    }

    #[test]
    fn test_error_detail_from_json_body() {
        let body = r#"{"detail": "ACE-Step unavailable: connection refused"}"#;
        assert_eq!(
            error_detail(body, Some("Bad Gateway")),
            "ACE-Step unavailable: connection refused"
        );
    }

    #[test]
    fn test_error_detail_without_detail_field() {
        assert_eq!(error_detail(r#"{"error": "x"}"#, Some("Bad Gateway")), "Request failed");
        assert_eq!(error_detail(r#"{"detail": ""}"#, Some("Bad Gateway")), "Request failed");
        assert_eq!(error_detail(r#"{"detail": null}"#, None), "Request failed");
    }

    #[test]
    fn test_error_detail_structured() {
        let body = r#"{"detail": [{"loc": ["body", "batch_size"], "msg": "too large"}]}"#;
        let detail = error_detail(body, Some("Unprocessable Entity"));
        assert!(detail.contains("batch_size"));
    }

    #[test]
    fn test_error_detail_falls_back_to_status_text() {
        assert_eq!(
            error_detail("<html>gateway</html>", Some("Bad Gateway")),
            "Bad Gateway"
        );
        assert_eq!(error_detail("", None), "Request failed");
    }
}
