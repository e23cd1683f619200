// ==========================================
// 青少年科创竞赛管理系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod competition_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use competition_config_trait::CompetitionConfigReader;
pub use config_manager::{config_keys, ConfigManager, ConfigValueError};
