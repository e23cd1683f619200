// ==========================================
// 青少年科创竞赛管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod category_repo;
pub mod competition_repo;
pub mod deadline_repo;
pub mod error;
pub mod notification_repo;
pub mod participant_repo;
pub mod progression_repo;
pub mod roster_repo;
pub mod school_repo;
pub mod team_repo;

// 重导出核心仓储
pub use category_repo::CategoryRepository;
pub use competition_repo::{CompetitionRepository, PhaseRepository};
pub use deadline_repo::DeadlineRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use notification_repo::NotificationRepository;
pub use participant_repo::{CoachRepository, ParticipantRepository};
pub use progression_repo::ProgressionRepository;
pub use roster_repo::RosterRepository;
pub use school_repo::SchoolRepository;
pub use team_repo::{TeamRepository, TeamSelectionRow};
