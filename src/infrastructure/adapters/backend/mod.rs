//! Backend Adapter - 生成服务客户端实现

mod api_base;
mod fake_backend_client;
mod http_backend_client;

pub use api_base::{ApiBase, ApiBaseError};
pub use fake_backend_client::{scripted_status, FakeBackendClient, ScriptedStatus};
pub use http_backend_client::*;
