//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod backend;
pub mod engine;

pub use backend::*;
pub use engine::*;
