//! Cache Queries

/// 获取缓存统计查询
#[derive(Debug, Clone, Default)]
pub struct GetCacheStats;
