//! History Queries

/// 分页获取生成历史（页码从 1 开始）
#[derive(Debug, Clone)]
pub struct GetHistory {
    pub page: u32,
}

/// 获取后端健康状态
#[derive(Debug, Clone)]
pub struct GetHealth;
