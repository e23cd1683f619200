// ==========================================
// 青少年科创竞赛管理系统 - 引擎层
// ==========================================
// 职责: 实现报名/组队/晋级/截止的业务规则引擎, 不拼 SQL
// 红线: Engine 不拼 SQL, 所有判定必须输出 reason
// ==========================================

pub mod capacity;
pub mod composition;
pub mod deadline;
pub mod eligibility;
pub mod eligibility_core;
pub mod notify;
pub mod progression;
pub mod selector;
pub mod strategy;

// 重导出核心引擎
pub use capacity::{CapacityValidator, CapacityVerdict, CategoryAvailability};
pub use composition::{CompositionReport, CompositionValidator, TeamCompositionInput};
pub use deadline::{
    DeadlineEnforcer, DeadlineRegistry, EnforcementOutcome, RegistrationState, ResolvedDeadlines,
};
pub use eligibility::{EligibilityEngine, EligibilityVerdict};
pub use eligibility_core::{EligibilityCore, RangeBounds};
pub use notify::{NoOpReminderSink, RecordingReminderSink, ReminderNotice, ReminderSink};
pub use progression::{AdvancementBundle, ProgressionExecutor};
pub use selector::{CategorySelection, PhaseSelector, SelectedTeam};
pub use strategy::ProgressionStrategy;
