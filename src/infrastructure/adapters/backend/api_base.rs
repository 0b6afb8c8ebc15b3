//! API Base - 接口地址与音频地址解析
//!
//! 解析规则:
//! - 页面端口等于开发端口（默认 3000）时，直连后端 `{scheme}://{hostname}:{backend_port}`
//! - 否则使用页面同源地址
//!
//! 接口地址与音频地址都为 `{host}{prefix}{path}`，直接字符串拼接（path 以 `/` 开头）。

use reqwest::Url;
use thiserror::Error;

use crate::config::ApiConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiBaseError {
    #[error("Invalid page origin: {0}")]
    InvalidOrigin(String),
}

/// 当前生效的 API 前缀（含 host）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    base: String,
}

impl ApiBase {
    pub fn for_page_origin(
        page_origin: &str,
        dev_port: u16,
        backend_port: u16,
        prefix: &str,
    ) -> Result<Self, ApiBaseError> {
        let url = Url::parse(page_origin)
            .map_err(|e| ApiBaseError::InvalidOrigin(format!("{}: {}", page_origin, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| ApiBaseError::InvalidOrigin(page_origin.to_string()))?;

        let api_host = if url.port() == Some(dev_port) {
            format!("{}://{}:{}", url.scheme(), host, backend_port)
        } else {
            url.origin().ascii_serialization()
        };

        Ok(Self {
            base: format!("{}{}", api_host, prefix.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiBaseError> {
        Self::for_page_origin(
            &config.page_origin,
            config.dev_port,
            config.backend_port,
            &config.prefix,
        )
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// 接口地址
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// 后端返回的相对音频路径 -> 可直接获取的地址
    pub fn audio_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_port_targets_backend_directly() {
        let api = ApiBase::for_page_origin("http://localhost:3000", 3000, 8000, "/api").unwrap();
        assert_eq!(api.base(), "http://localhost:8000/api");
        assert_eq!(
            api.audio_url("/music/audio?path=/x/a.mp3"),
            "http://localhost:8000/api/music/audio?path=/x/a.mp3"
        );
    }

    #[test]
    fn test_dev_port_keeps_page_hostname_and_scheme() {
        let api = ApiBase::for_page_origin("https://192.168.1.5:3000/generate", 3000, 8000, "/api")
            .unwrap();
        assert_eq!(api.endpoint("/health"), "https://192.168.1.5:8000/api/health");
    }

    #[test]
    fn test_other_ports_use_same_origin() {
        let api = ApiBase::for_page_origin("https://music.example.com", 3000, 8000, "/api").unwrap();
        assert_eq!(api.endpoint("/music/generate"), "https://music.example.com/api/music/generate");

        let api = ApiBase::for_page_origin("http://music.local:8080/", 3000, 8000, "/api/").unwrap();
        assert_eq!(api.audio_url("/a.wav"), "http://music.local:8080/api/a.wav");
    }

    #[test]
    fn test_invalid_origin() {
        assert!(ApiBase::for_page_origin("not a url", 3000, 8000, "/api").is_err());
    }
}
