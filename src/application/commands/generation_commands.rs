//! Generation Commands

use crate::application::ports::LyricsRequest;

/// 根据主题生成歌词
#[derive(Debug, Clone)]
pub struct GenerateLyrics {
    pub request: LyricsRequest,
}

impl GenerateLyrics {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            request: LyricsRequest::new(theme),
        }
    }
}

/// 删除一条生成记录
#[derive(Debug, Clone)]
pub struct DeleteGeneration {
    pub id: i64,
}
