//! History Query Handlers

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationBackendPort, GenerationItem, HealthStatus};
use crate::application::queries::{GetHealth, GetHistory};
use crate::domain::generation::TaskStatus;
use crate::domain::playback::AudioVariant;

// ============================================================================
// Response DTOs
// ============================================================================

/// 历史记录条目（音频地址已解析）
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub task_id: String,
    pub status: TaskStatus,
    pub prompt: String,
    pub lyrics: String,
    pub duration: Option<f32>,
    pub bpm: Option<u16>,
    pub key_scale: String,
    pub vocal_language: String,
    pub variants: Vec<AudioVariant>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    fn from_item(item: GenerationItem, backend: &dyn GenerationBackendPort) -> Self {
        let variants = AudioVariant::from_locators(
            item.audio_urls
                .iter()
                .map(|path| backend.resolve_audio_url(path)),
        );
        Self {
            id: item.id,
            task_id: item.task_id,
            status: item.status,
            prompt: item.prompt,
            lyrics: item.lyrics,
            duration: item.duration,
            bpm: item.bpm,
            key_scale: item.key_scale,
            vocal_language: item.vocal_language,
            variants,
            created_at: item.created_at,
            completed_at: item.completed_at,
        }
    }
}

/// 一页历史记录
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub items: Vec<HistoryEntry>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl HistoryView {
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size)) as u32
    }

    /// 只有一页时不需要分页控件
    pub fn is_paginated(&self) -> bool {
        self.total_pages() > 1
    }

    pub fn previous_page(&self) -> u32 {
        self.page.saturating_sub(1).max(1)
    }

    pub fn next_page(&self) -> u32 {
        self.page.saturating_add(1).min(self.total_pages().max(1))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetHistory Handler
pub struct GetHistoryHandler {
    backend: Arc<dyn GenerationBackendPort>,
    page_size: u32,
}

impl GetHistoryHandler {
    pub fn new(backend: Arc<dyn GenerationBackendPort>, page_size: u32) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
        }
    }

    pub async fn handle(&self, query: GetHistory) -> Result<HistoryView, ApplicationError> {
        let page = query.page.max(1);
        let result = self.backend.history(page, self.page_size).await?;

        tracing::debug!(
            page = page,
            items = result.items.len(),
            total = result.total,
            "History page fetched"
        );

        Ok(HistoryView {
            items: result
                .items
                .into_iter()
                .map(|item| HistoryEntry::from_item(item, self.backend.as_ref()))
                .collect(),
            total: result.total,
            page,
            page_size: self.page_size,
        })
    }
}

/// GetHealth Handler
pub struct GetHealthHandler {
    backend: Arc<dyn GenerationBackendPort>,
}

impl GetHealthHandler {
    pub fn new(backend: Arc<dyn GenerationBackendPort>) -> Self {
        Self { backend }
    }

    pub async fn handle(&self, _query: GetHealth) -> Result<HealthStatus, ApplicationError> {
        let health = self.backend.health().await?;
        if !health.is_healthy() {
            tracing::warn!(
                acestep = health.acestep,
                ollama = health.ollama,
                "Backend degraded"
            );
        }
        Ok(health)
    }
}
