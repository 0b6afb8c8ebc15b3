//! Command Handlers 实现

mod generation_handlers;

pub use generation_handlers::*;
