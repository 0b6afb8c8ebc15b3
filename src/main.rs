//! Musegen - 音乐生成客户端
//!
//! 命令行入口：提交生成任务并等待结果、生成歌词、浏览/删除历史、检查后端健康状态

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use musegen::application::commands::handlers::{DeleteGenerationHandler, GenerateLyricsHandler};
use musegen::application::commands::{DeleteGeneration, GenerateLyrics};
use musegen::application::ports::{GenerationBackendPort, LyricsRequest};
use musegen::application::queries::handlers::{GetHealthHandler, GetHistoryHandler};
use musegen::application::queries::{GetHealth, GetHistory};
use musegen::application::{
    GenerationController, GenerationPhase, TaskSnapshot, TaskTracker, TaskTrackerConfig,
};
use musegen::config::{load_config, load_config_from_path, print_config, AppConfig, LogConfig};
use musegen::infrastructure::adapters::{ApiBase, HttpBackendClient, HttpBackendClientConfig};

use cli::{Cli, Command, GenerateArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match cli.config.as_deref() {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    print_config(&config);

    let backend = build_backend(&config)?;

    match cli.command {
        Command::Generate(args) => run_generate(backend, &config, args).await,
        Command::Lyrics {
            theme,
            language,
            genre,
            mood,
        } => {
            let handler = GenerateLyricsHandler::new(backend);
            let command = GenerateLyrics {
                request: LyricsRequest::new(theme)
                    .with_language(language)
                    .with_genre(genre)
                    .with_mood(mood),
            };
            let response = handler.handle(command).await?;
            println!("{}", response.lyrics);
            Ok(())
        }
        Command::History { page } => {
            let handler = GetHistoryHandler::new(backend, config.history.page_size);
            let view = handler.handle(GetHistory { page }).await?;
            for entry in &view.items {
                println!(
                    "#{} [{}] {} ({})",
                    entry.id,
                    entry.status,
                    entry.prompt,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
                for variant in &entry.variants {
                    println!("    {}: {}", variant.label(), variant.locator());
                }
            }
            if view.is_paginated() {
                println!("Page {} of {}", view.page, view.total_pages());
            }
            Ok(())
        }
        Command::Delete { id } => {
            let handler = DeleteGenerationHandler::new(backend);
            handler.handle(DeleteGeneration { id }).await?;
            println!("Deleted #{}", id);
            Ok(())
        }
        Command::Health => {
            let handler = GetHealthHandler::new(backend);
            let health = handler.handle(GetHealth).await?;
            println!(
                "status: {}, acestep: {}, ollama: {}",
                health.status, health.acestep, health.ollama
            );
            Ok(())
        }
    }
}

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},musegen={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // 结果输出到 stdout，日志走 stderr
    if log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn GenerationBackendPort>> {
    let api_base = ApiBase::from_config(&config.api)?;
    tracing::info!(api_base = %api_base.base(), "Resolved API base");

    let client_config = HttpBackendClientConfig::new(api_base).with_timeout(config.api.timeout_secs);
    Ok(Arc::new(HttpBackendClient::new(client_config)?))
}

async fn run_generate(
    backend: Arc<dyn GenerationBackendPort>,
    config: &AppConfig,
    args: GenerateArgs,
) -> anyhow::Result<()> {
    let tracker = TaskTracker::new(backend, TaskTrackerConfig::from(&config.poll));
    let mut controller = GenerationController::new(tracker);

    let handle = match controller.generate(args.into_request()).await {
        Ok(handle) => handle,
        Err(e) => anyhow::bail!("{}", e.user_message()),
    };
    println!("Submitted #{} (task {})", handle.id, handle.task_id);

    let Some(mut updates) = controller.current_task().map(|task| task.subscribe()) else {
        anyhow::bail!("Generation was not tracked");
    };

    tokio::select! {
        _ = report_progress(&mut updates) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt, abandoning generation");
            controller.reset();
            return Ok(());
        }
    }

    match controller.phase() {
        GenerationPhase::Succeeded(variants) => {
            for variant in &variants {
                println!("{}: {}", variant.label(), variant.locator());
            }
            Ok(())
        }
        phase => {
            let message = phase
                .error_message()
                .unwrap_or("Generation did not complete")
                .to_string();
            anyhow::bail!(message)
        }
    }
}

/// 每次状态变化打印一次进度文案，直到终态
async fn report_progress(updates: &mut watch::Receiver<TaskSnapshot>) {
    let mut last_label = None;
    loop {
        let (label, terminal) = {
            let snapshot = updates.borrow_and_update();
            (
                snapshot.status.progress_label(),
                snapshot.is_terminal(),
            )
        };
        if terminal {
            return;
        }
        if last_label != Some(label) {
            eprintln!("{}", label);
            last_label = Some(label);
        }
        if updates.changed().await.is_err() {
            return;
        }
    }
}
