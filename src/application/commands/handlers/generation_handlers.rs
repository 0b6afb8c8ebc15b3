//! Generation Command Handlers

use std::sync::Arc;

use crate::application::commands::{DeleteGeneration, GenerateLyrics};
use crate::application::error::ApplicationError;
use crate::application::ports::{GenerationBackendPort, LyricsResponse, GENERIC_REQUEST_FAILURE};

// ============================================================================
// GenerateLyrics
// ============================================================================

/// GenerateLyrics Handler
pub struct GenerateLyricsHandler {
    backend: Arc<dyn GenerationBackendPort>,
}

impl GenerateLyricsHandler {
    pub fn new(backend: Arc<dyn GenerationBackendPort>) -> Self {
        Self { backend }
    }

    /// 主题为空时不发起请求
    pub async fn handle(&self, command: GenerateLyrics) -> Result<LyricsResponse, ApplicationError> {
        let request = command.request;
        if request.theme.trim().is_empty() {
            return Err(ApplicationError::validation("Theme is required"));
        }

        let response = self.backend.generate_lyrics(&request).await?;

        tracing::info!(
            language = %request.language,
            genre = %request.genre,
            mood = %request.mood,
            chars = response.lyrics.chars().count(),
            "Lyrics generated"
        );

        Ok(response)
    }
}

// ============================================================================
// DeleteGeneration
// ============================================================================

/// DeleteGeneration Handler
pub struct DeleteGenerationHandler {
    backend: Arc<dyn GenerationBackendPort>,
}

impl DeleteGenerationHandler {
    pub fn new(backend: Arc<dyn GenerationBackendPort>) -> Self {
        Self { backend }
    }

    pub async fn handle(&self, command: DeleteGeneration) -> Result<(), ApplicationError> {
        let response = self.backend.delete_generation(command.id).await?;
        if !response.ok {
            return Err(ApplicationError::BackendError(
                GENERIC_REQUEST_FAILURE.to_string(),
            ));
        }

        tracing::info!(id = command.id, "Generation deleted");
        Ok(())
    }
}
