//! Engine Adapter - 媒体引擎实现

mod fake_media_engine;

pub use fake_media_engine::{EngineRecord, FakeEngineConfig, FakeMediaEngineFactory};
