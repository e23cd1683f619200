// ==========================================
// 青少年科创竞赛管理系统 - 队伍与名册领域模型
// ==========================================
// 对齐: db.rs init_schema teams / team_participants / team_coaches 表
// ==========================================

use crate::domain::types::{
    BackgroundCheckStatus, CoachRole, EligibilityStatus, MemberStatus, ParticipantRole,
    QualificationStatus, TeamStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Team - 队伍 (阶段作用域)
// ==========================================
// 红线: 晋级永远新建行, 阶段内分数/编号/名册不被覆写
// 并发: (school_id, category_id, phase_id) 在非 CANCELLED
//       状态下受部分唯一索引保护, 应用层预检仅为提示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    // ===== 主键 =====
    pub team_id: String, // 队伍唯一标识 (UUID)

    // ===== 关联 =====
    pub competition_id: String, // 关联 competitions (FK)
    pub school_id: String,      // 关联 schools (FK)
    pub category_id: String,    // 关联 categories (FK)
    pub phase_id: String,       // 关联 phases (FK)

    // ===== 基础信息 =====
    pub name: String,      // 队名
    pub team_code: String, // 队伍编号 ({赛项代码}-P{阶段}-{短ID})

    // ===== 状态 =====
    pub status: TeamStatus,   // 队伍状态
    pub roster_locked: bool,  // 名册是否锁定 (截止执行器写入)

    // ===== 晋级评分 =====
    pub qualification_score: Option<f64>, // 阶段累计评分 (晋级排序依据)

    // ===== 教练快捷引用 (与 team_coaches 同步写入) =====
    pub coach1_id: Option<String>, // 主教练
    pub coach2_id: Option<String>, // 第二教练

    // ===== 传承与备注 =====
    pub notes: Option<String>, // 传承备注 (晋级来源队伍与名次)

    // ===== 审计字段 =====
    pub created_by: Option<String>, // 操作者标识 (ActorContext)
    pub created_at: DateTime<Utc>,  // 记录创建时间
    pub updated_at: DateTime<Utc>,  // 记录更新时间
}

// ==========================================
// TeamParticipant - 队员名册行
// ==========================================
// 红线: 晋级克隆生成新行, 原行保留作历史
// 不变量: 每队 ≤1 名在役队长; 同阶段同赛项每人 ≤1 个在役名册行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamParticipant {
    // ===== 主键与关联 =====
    pub id: String,             // 名册行唯一标识 (UUID)
    pub team_id: String,        // 关联 teams (FK)
    pub participant_id: String, // 关联 participants (FK)

    // ===== 角色与状态 =====
    pub role: ParticipantRole,               // 队内角色
    pub status: MemberStatus,                // 在役状态
    pub eligibility_status: EligibilityStatus, // 资格判定快照
    pub documents_complete: bool,            // 参赛材料是否齐全

    // ===== 时间 =====
    pub joined_date: NaiveDate, // 入队日期 (晋级克隆时重置)

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl TeamParticipant {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

// ==========================================
// TeamCoach - 教练名册行
// ==========================================
// 不变量: 每队 ≤1 名在役主教练, ≤2 名在役教练
// 资质/背景核查为挂队时快照, 随队伍阶段冻结
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCoach {
    // ===== 主键与关联 =====
    pub id: String,      // 名册行唯一标识 (UUID)
    pub team_id: String, // 关联 teams (FK)
    pub user_id: String, // 关联 coaches (FK)

    // ===== 角色与状态 =====
    pub coach_role: CoachRole,                        // 教练角色
    pub status: MemberStatus,                         // 在役状态
    pub qualification_status: QualificationStatus,    // 资质认证状态
    pub background_check_status: BackgroundCheckStatus, // 背景核查状态
    pub training_completed: bool,                     // 带队培训是否完成

    // ===== 时间 =====
    pub assigned_date: NaiveDate, // 挂队日期 (晋级克隆时重置)

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl TeamCoach {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// 比赛日要求: 资质已认证且背景已核验
    pub fn is_competition_ready(&self) -> bool {
        self.qualification_status == QualificationStatus::Qualified
            && self.background_check_status == BackgroundCheckStatus::Verified
    }
}
