//! Playback Arbiter - 单声道播放仲裁
//!
//! 进程级广播通道：任一播放器开始播放时广播自己的 `PlayerId`，
//! 其他正在播放的播放器收到后自行暂停。播放器之间互不持有引用，
//! 也没有需要手动增删的注册表。
//!
//! 每个播放器在创建时 `register()` 得到一个 `ArbiterRegistration`，
//! 其生命周期即订阅的生命周期，丢弃即退订。

use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::PlaybackConfig;
use crate::domain::playback::PlayerId;

/// "我开始播放了"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSignal {
    pub player: PlayerId,
}

/// 播放仲裁通道
///
/// 克隆开销很小，所有克隆共享同一个通道。
#[derive(Debug, Clone)]
pub struct PlaybackArbiter {
    sender: broadcast::Sender<PlaybackSignal>,
}

impl PlaybackArbiter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 分配身份并订阅通道
    pub fn register(&self) -> ArbiterRegistration {
        let registration = ArbiterRegistration {
            player: PlayerId::new(),
            sender: self.sender.clone(),
            receiver: self.sender.subscribe(),
        };
        tracing::debug!(
            player = %registration.player,
            listeners = self.listener_count(),
            "Player registered"
        );
        registration
    }

    /// 当前订阅者数量
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PlaybackArbiter {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for PlaybackArbiter {
    fn from(config: &PlaybackConfig) -> Self {
        Self::new(config.channel_capacity)
    }
}

/// 单个播放器在仲裁通道上的订阅
pub struct ArbiterRegistration {
    player: PlayerId,
    sender: broadcast::Sender<PlaybackSignal>,
    receiver: broadcast::Receiver<PlaybackSignal>,
}

impl ArbiterRegistration {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// 广播"我开始播放了"，返回收到广播的订阅者数量（含自己）
    pub fn announce_playing(&self) -> usize {
        match self.sender.send(PlaybackSignal {
            player: self.player,
        }) {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!(player = %self.player, error = %e, "No playback listeners");
                0
            }
        }
    }

    /// 等待其他播放器开始播放，自己的广播被忽略
    ///
    /// 可安全地放在 `select!` 中取消。通道关闭时返回 None。
    pub async fn next_foreign_play(&mut self) -> Option<PlayerId> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) if signal.player == self.player => continue,
                Ok(signal) => return Some(signal.player),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        player = %self.player,
                        skipped = skipped,
                        "Playback signals lagged"
                    );
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ArbiterRegistration {
    fn drop(&mut self) {
        tracing::debug!(player = %self.player, "Player unregistered");
    }
}
