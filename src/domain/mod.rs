// ==========================================
// 青少年科创竞赛管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod category;
pub mod competition;
pub mod deadline;
pub mod participant;
pub mod progression;
pub mod school;
pub mod team;
pub mod types;

// 重导出核心类型
pub use category::{Category, CompositionRules};
pub use competition::{Competition, Phase};
pub use deadline::{NotificationLog, RegistrationDeadline};
pub use participant::{Coach, Participant};
pub use progression::ProgressionRecord;
pub use school::School;
pub use team::{Team, TeamCoach, TeamParticipant};
pub use types::{
    ActorContext, BackgroundCheckStatus, CoachRole, CompetitionMode, DeadlineType,
    EligibilityStatus, IneligibilityReason, MemberStatus, ParticipantRole, QualificationStatus,
    TeamStatus, ValidationContext,
};
