//! Generation Context - 生成任务限界上下文
//!
//! 职责:
//! - 生成请求参数及其校验
//! - 远程任务标识与状态（单调推进）

mod errors;
mod value_objects;

pub use errors::DomainError;
pub use value_objects::{GenerationRequest, TaskId, TaskStatus, TimeSignature};
