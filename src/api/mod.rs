// ==========================================
// 青少年科创竞赛管理系统 - API 层
// ==========================================
// 职责: 参数校验、仓储与引擎装配、错误映射
// 红线: 业务规则只在引擎层实现, 本层不做规则判断
// ==========================================

pub mod error;
pub mod deadline_api;
pub mod progression_api;
pub mod registration_api;
pub mod team_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use deadline_api::{DeadlineApi, RegistrationStatusView};
pub use progression_api::{AdvancedTeam, AdvancementOutcome, FailedAdvancement, ProgressionApi};
pub use registration_api::{AvailabilitySummary, RegistrationApi, RegistrationCheck};
pub use team_api::TeamApi;
