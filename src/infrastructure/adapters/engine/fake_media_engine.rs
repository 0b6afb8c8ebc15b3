//! Fake Media Engine - 用于测试的内存引擎
//!
//! 不做真实解码，只模拟引擎状态与事件：
//! - load 后立即上报 Ready（地址在 unreachable 列表中时永不就绪）
//! - 未就绪时拒绝 play_pause / seek_to
//! - 销毁后的实例调用任何方法都返回 `EngineError::Destroyed`
//!
//! 工厂记录所有创建过的实例，供测试检查。

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    EngineError, EngineEvent, EngineEventSender, MediaEngine, MediaEngineFactory,
};

/// Fake 引擎配置
#[derive(Debug, Clone)]
pub struct FakeEngineConfig {
    /// 就绪时上报的音频时长（秒）
    pub duration_secs: f64,
    /// 永远不会就绪的地址
    pub unreachable: Vec<String>,
}

impl Default for FakeEngineConfig {
    fn default() -> Self {
        Self {
            duration_secs: 180.0,
            unreachable: Vec::new(),
        }
    }
}

/// 单个实例的可观察状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineRecord {
    pub instance_id: u64,
    pub locator: Option<String>,
    pub ready: bool,
    pub playing: bool,
    pub destroyed: bool,
    pub pause_calls: usize,
    pub destroy_calls: usize,
}

struct Registry {
    config: FakeEngineConfig,
    next_id: AtomicU64,
    records: DashMap<u64, EngineRecord>,
    senders: DashMap<u64, EngineEventSender>,
}

impl Registry {
    fn emit(&self, instance_id: u64, event: EngineEvent) {
        if let Some(sender) = self.senders.get(&instance_id) {
            // 接收端已丢弃说明 widget 已换掉该实例
            let _ = sender.send(event);
        }
    }
}

/// Fake 引擎工厂
#[derive(Clone)]
pub struct FakeMediaEngineFactory {
    registry: Arc<Registry>,
}

impl FakeMediaEngineFactory {
    pub fn new(config: FakeEngineConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                config,
                next_id: AtomicU64::new(1),
                records: DashMap::new(),
                senders: DashMap::new(),
            }),
        }
    }

    /// 所有实例，按创建顺序
    pub fn records(&self) -> Vec<EngineRecord> {
        let mut records: Vec<EngineRecord> = self
            .registry
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.instance_id);
        records
    }

    pub fn created_count(&self) -> usize {
        self.registry.records.len()
    }

    /// 尚未销毁的实例数
    pub fn live_count(&self) -> usize {
        self.registry
            .records
            .iter()
            .filter(|entry| !entry.destroyed)
            .count()
    }

    /// 正在发声的实例数
    pub fn audible_count(&self) -> usize {
        self.registry
            .records
            .iter()
            .filter(|entry| entry.playing && !entry.destroyed)
            .count()
    }

    /// 绑定到该地址的最新实例
    pub fn latest_for(&self, locator: &str) -> Option<EngineRecord> {
        self.records()
            .into_iter()
            .rev()
            .find(|record| record.locator.as_deref() == Some(locator))
    }

    /// 模拟播放进度
    pub fn emit_progress(&self, instance_id: u64, position_secs: f64) {
        self.registry
            .emit(instance_id, EngineEvent::Progress { position_secs });
    }

    /// 模拟播放到结尾
    pub fn emit_finished(&self, instance_id: u64) {
        if let Some(mut record) = self.registry.records.get_mut(&instance_id) {
            record.playing = false;
        }
        self.registry.emit(instance_id, EngineEvent::Finished);
    }
}

impl Default for FakeMediaEngineFactory {
    fn default() -> Self {
        Self::new(FakeEngineConfig::default())
    }
}

impl MediaEngineFactory for FakeMediaEngineFactory {
    fn create(&self, events: EngineEventSender) -> Result<Box<dyn MediaEngine>, EngineError> {
        let instance_id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        self.registry.records.insert(
            instance_id,
            EngineRecord {
                instance_id,
                ..Default::default()
            },
        );
        self.registry.senders.insert(instance_id, events);
        tracing::debug!(instance_id = instance_id, "FakeMediaEngine created");

        Ok(Box::new(FakeMediaEngine {
            instance_id,
            registry: self.registry.clone(),
        }))
    }
}

struct FakeMediaEngine {
    instance_id: u64,
    registry: Arc<Registry>,
}

impl FakeMediaEngine {
    /// 在记录上执行操作，销毁后的实例直接报错
    fn with_live_record<R>(
        &self,
        f: impl FnOnce(&mut EngineRecord) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let mut record = self
            .registry
            .records
            .get_mut(&self.instance_id)
            .ok_or(EngineError::Destroyed)?;
        if record.destroyed {
            return Err(EngineError::Destroyed);
        }
        f(&mut record)
    }
}

impl MediaEngine for FakeMediaEngine {
    fn load(&mut self, locator: &str) -> Result<(), EngineError> {
        let reachable = !self
            .registry
            .config
            .unreachable
            .iter()
            .any(|candidate| candidate == locator);
        self.with_live_record(|record| {
            record.locator = Some(locator.to_string());
            record.ready = reachable;
            Ok(())
        })?;

        if reachable {
            self.registry.emit(
                self.instance_id,
                EngineEvent::Ready {
                    duration_secs: self.registry.config.duration_secs,
                },
            );
        }
        Ok(())
    }

    fn play_pause(&mut self) -> Result<(), EngineError> {
        let event = self.with_live_record(|record| {
            if !record.ready {
                return Err(EngineError::NotReady);
            }
            record.playing = !record.playing;
            Ok(if record.playing {
                EngineEvent::PlayStarted
            } else {
                EngineEvent::Paused
            })
        })?;
        self.registry.emit(self.instance_id, event);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        let was_playing = self.with_live_record(|record| {
            record.pause_calls += 1;
            let was_playing = record.playing;
            record.playing = false;
            Ok(was_playing)
        })?;
        if was_playing {
            self.registry.emit(self.instance_id, EngineEvent::Paused);
        }
        Ok(())
    }

    fn seek_to(&mut self, position_secs: f64) -> Result<(), EngineError> {
        let duration = self.registry.config.duration_secs;
        self.with_live_record(|record| {
            if record.ready {
                Ok(())
            } else {
                Err(EngineError::NotReady)
            }
        })?;
        self.registry.emit(
            self.instance_id,
            EngineEvent::Progress {
                position_secs: position_secs.clamp(0.0, duration),
            },
        );
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), EngineError> {
        let mut record = self
            .registry
            .records
            .get_mut(&self.instance_id)
            .ok_or(EngineError::Destroyed)?;
        record.destroy_calls += 1;
        if record.destroyed {
            return Err(EngineError::Destroyed);
        }
        record.destroyed = true;
        record.playing = false;
        drop(record);

        self.registry.senders.remove(&self.instance_id);
        tracing::debug!(instance_id = self.instance_id, "FakeMediaEngine destroyed");
        Ok(())
    }
}
