// ==========================================
// 青少年科创竞赛管理系统 - 截止治理引擎
// ==========================================
// registry: 由截止规则集纯函数推导报名状态机
// enforcer: 截止清理 + 阈值提醒的幂等扫描
// ==========================================

mod enforcer;
mod registry;

pub use enforcer::{DeadlineEnforcer, EnforcementOutcome};
pub use registry::{DeadlineRegistry, RegistrationState, ResolvedDeadlines};
