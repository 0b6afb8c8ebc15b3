//! 命令行参数定义

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use musegen::domain::generation::{GenerationRequest, TimeSignature};

#[derive(Parser)]
#[command(name = "musegen")]
#[command(about = "Submit music generation jobs and browse their results")]
pub struct Cli {
    /// 配置文件路径（默认搜索 config.toml / config.local.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate music and wait for the variants
    Generate(GenerateArgs),

    /// Generate lyrics from a theme
    Lyrics {
        theme: String,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, default_value = "Pop")]
        genre: String,
        #[arg(long, default_value = "Happy")]
        mood: String,
    },

    /// List past generations
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Delete a generation from history
    Delete { id: i64 },

    /// Check backend health
    Health,
}

#[derive(clap::Args)]
pub struct GenerateArgs {
    /// Style description
    #[arg(default_value = "")]
    pub prompt: String,

    #[arg(long, default_value = "")]
    pub lyrics: String,

    /// Target duration in seconds, omit with --auto-duration
    #[arg(long, default_value_t = 60.0)]
    pub duration: f32,

    #[arg(long)]
    pub auto_duration: bool,

    #[arg(long, default_value_t = 120)]
    pub bpm: u16,

    #[arg(long)]
    pub auto_bpm: bool,

    /// e.g. "C major", empty for auto
    #[arg(long, default_value = "")]
    pub key_scale: String,

    /// auto, 2, 3, 4 or 6
    #[arg(long, default_value = "auto", value_parser = parse_time_signature)]
    pub time_signature: TimeSignature,

    #[arg(long, default_value = "en")]
    pub vocal_language: String,

    #[arg(long)]
    pub no_thinking: bool,

    #[arg(long, default_value_t = 2)]
    pub batch_size: u8,

    #[arg(long, default_value_t = 8)]
    pub inference_steps: u8,
}

impl GenerateArgs {
    pub fn into_request(self) -> GenerationRequest {
        GenerationRequest::new(self.prompt)
            .with_lyrics(self.lyrics)
            .with_duration((!self.auto_duration).then_some(self.duration))
            .with_bpm((!self.auto_bpm).then_some(self.bpm))
            .with_key_scale(self.key_scale)
            .with_time_signature(self.time_signature)
            .with_vocal_language(self.vocal_language)
            .with_thinking(!self.no_thinking)
            .with_batch_size(self.batch_size)
            .with_inference_steps(self.inference_steps)
    }
}

fn parse_time_signature(raw: &str) -> Result<TimeSignature, String> {
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(TimeSignature::Auto);
    }
    TimeSignature::from_code(raw).ok_or_else(|| format!("unsupported time signature: {}", raw))
}
