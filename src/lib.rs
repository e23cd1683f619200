// ==========================================
// 青少年科创竞赛管理系统 - 晋级与资格引擎核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 报名资格、队伍构成、阶段晋级、截止治理的规则中枢
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 名册文件
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能观测（SQL 计数/慢查询）
pub mod perf;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ActorContext, CoachRole, CompetitionMode, DeadlineType, EligibilityStatus, MemberStatus,
    ParticipantRole, TeamStatus, ValidationContext,
};

// 领域实体
pub use domain::{
    Category, Coach, Competition, NotificationLog, Participant, Phase, ProgressionRecord,
    RegistrationDeadline, School, Team, TeamCoach, TeamParticipant,
};

// 引擎
pub use engine::{
    CapacityValidator, CompositionReport, CompositionValidator, DeadlineEnforcer,
    DeadlineRegistry, EligibilityEngine, EnforcementOutcome, PhaseSelector, ProgressionExecutor,
    ProgressionStrategy, RegistrationState,
};

// API
pub use api::{DeadlineApi, ProgressionApi, RegistrationApi, TeamApi};

// 配置
pub use config::{CompetitionConfigReader, ConfigManager};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "青少年科创竞赛晋级与资格引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
