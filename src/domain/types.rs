// ==========================================
// 青少年科创竞赛管理系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 竞赛模式 (Competition Mode)
// ==========================================
// 试点模式跳过第二阶段, 第一阶段直接晋级决赛
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionMode {
    Pilot, // 试点模式 (阶段1 → 阶段3)
    Full,  // 完整模式 (阶段1 → 阶段2 → 阶段3)
}

impl fmt::Display for CompetitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CompetitionMode {
    /// 从字符串解析竞赛模式
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PILOT" => Some(CompetitionMode::Pilot),
            "FULL" => Some(CompetitionMode::Full),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CompetitionMode::Pilot => "PILOT",
            CompetitionMode::Full => "FULL",
        }
    }
}

// ==========================================
// 队伍状态 (Team Status)
// ==========================================
// 红线: 晋级生成新队伍行, 不原地改写阶段归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    Draft,      // 草稿 (报名中)
    Approved,   // 已批准
    Cancelled,  // 已取消 (含截止过期)
    Ineligible, // 资格不符 (材料缺失等)
}

impl fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TeamStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(TeamStatus::Draft),
            "APPROVED" => Some(TeamStatus::Approved),
            "CANCELLED" => Some(TeamStatus::Cancelled),
            "INELIGIBLE" => Some(TeamStatus::Ineligible),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TeamStatus::Draft => "DRAFT",
            TeamStatus::Approved => "APPROVED",
            TeamStatus::Cancelled => "CANCELLED",
            TeamStatus::Ineligible => "INELIGIBLE",
        }
    }
}

// ==========================================
// 队员角色 (Participant Role)
// ==========================================
// 红线: 每队最多 1 名在役队长
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    TeamLeader, // 队长
    Regular,    // 普通队员
    Programmer, // 程序
    Builder,    // 搭建
    Designer,   // 设计
    Researcher, // 调研
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ParticipantRole {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TEAM_LEADER" => Some(ParticipantRole::TeamLeader),
            "REGULAR" => Some(ParticipantRole::Regular),
            "PROGRAMMER" => Some(ParticipantRole::Programmer),
            "BUILDER" => Some(ParticipantRole::Builder),
            "DESIGNER" => Some(ParticipantRole::Designer),
            "RESEARCHER" => Some(ParticipantRole::Researcher),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ParticipantRole::TeamLeader => "TEAM_LEADER",
            ParticipantRole::Regular => "REGULAR",
            ParticipantRole::Programmer => "PROGRAMMER",
            ParticipantRole::Builder => "BUILDER",
            ParticipantRole::Designer => "DESIGNER",
            ParticipantRole::Researcher => "RESEARCHER",
        }
    }
}

// ==========================================
// 教练角色 (Coach Role)
// ==========================================
// 红线: 每队最多 1 名主教练, 最多 2 名在役教练
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoachRole {
    Primary,   // 主教练
    Secondary, // 副教练
    Assistant, // 助理教练
    Mentor,    // 指导老师
}

impl fmt::Display for CoachRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CoachRole {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRIMARY" => Some(CoachRole::Primary),
            "SECONDARY" => Some(CoachRole::Secondary),
            "ASSISTANT" => Some(CoachRole::Assistant),
            "MENTOR" => Some(CoachRole::Mentor),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CoachRole::Primary => "PRIMARY",
            CoachRole::Secondary => "SECONDARY",
            CoachRole::Assistant => "ASSISTANT",
            CoachRole::Mentor => "MENTOR",
        }
    }
}

// ==========================================
// 成员在役状态 (Member Status)
// ==========================================
// 晋级克隆只复制 ACTIVE 成员; 原行保留作历史
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,   // 在役
    Inactive, // 暂离
    Removed,  // 已移除
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl MemberStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(MemberStatus::Active),
            "INACTIVE" => Some(MemberStatus::Inactive),
            "REMOVED" => Some(MemberStatus::Removed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "ACTIVE",
            MemberStatus::Inactive => "INACTIVE",
            MemberStatus::Removed => "REMOVED",
        }
    }
}

// ==========================================
// 个人参赛资格状态 (Eligibility Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    Pending,    // 待判定
    Eligible,   // 符合
    Ineligible, // 不符合
}

impl fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl EligibilityStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(EligibilityStatus::Pending),
            "ELIGIBLE" => Some(EligibilityStatus::Eligible),
            "INELIGIBLE" => Some(EligibilityStatus::Ineligible),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EligibilityStatus::Pending => "PENDING",
            EligibilityStatus::Eligible => "ELIGIBLE",
            EligibilityStatus::Ineligible => "INELIGIBLE",
        }
    }
}

// ==========================================
// 教练资质状态 (Qualification Status)
// ==========================================
// 比赛日上下文要求 QUALIFIED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualificationStatus {
    Pending,   // 待审核
    Qualified, // 已认证
    Rejected,  // 未通过
}

impl fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl QualificationStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(QualificationStatus::Pending),
            "QUALIFIED" => Some(QualificationStatus::Qualified),
            "REJECTED" => Some(QualificationStatus::Rejected),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            QualificationStatus::Pending => "PENDING",
            QualificationStatus::Qualified => "QUALIFIED",
            QualificationStatus::Rejected => "REJECTED",
        }
    }
}

// ==========================================
// 背景核查状态 (Background Check Status)
// ==========================================
// 比赛日上下文要求 VERIFIED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackgroundCheckStatus {
    Pending,  // 待核查
    Verified, // 已核验
    Failed,   // 未通过
}

impl fmt::Display for BackgroundCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl BackgroundCheckStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(BackgroundCheckStatus::Pending),
            "VERIFIED" => Some(BackgroundCheckStatus::Verified),
            "FAILED" => Some(BackgroundCheckStatus::Failed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            BackgroundCheckStatus::Pending => "PENDING",
            BackgroundCheckStatus::Verified => "VERIFIED",
            BackgroundCheckStatus::Failed => "FAILED",
        }
    }
}

// ==========================================
// 截止类型 (Deadline Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadlineType {
    TeamRegistration,   // 队伍报名截止
    Modification,       // 名册修改截止
    Lock,               // 名册锁定时刻
    DocumentSubmission, // 材料提交截止
}

impl fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DeadlineType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TEAM_REGISTRATION" => Some(DeadlineType::TeamRegistration),
            "MODIFICATION" => Some(DeadlineType::Modification),
            "LOCK" => Some(DeadlineType::Lock),
            "DOCUMENT_SUBMISSION" => Some(DeadlineType::DocumentSubmission),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeadlineType::TeamRegistration => "TEAM_REGISTRATION",
            DeadlineType::Modification => "MODIFICATION",
            DeadlineType::Lock => "LOCK",
            DeadlineType::DocumentSubmission => "DOCUMENT_SUBMISSION",
        }
    }
}

// ==========================================
// 校验上下文 (Validation Context)
// ==========================================
// 同一套组队规则在不同上下文下严格程度不同:
// 比赛日将角色/教练警告升级为错误, 并强制资质核查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationContext {
    Registration,   // 报名
    Modification,   // 名册修改
    CompetitionDay, // 比赛日
    BulkImport,     // 批量导入
    RealTime,       // 实时单步校验
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationContext::Registration => write!(f, "REGISTRATION"),
            ValidationContext::Modification => write!(f, "MODIFICATION"),
            ValidationContext::CompetitionDay => write!(f, "COMPETITION_DAY"),
            ValidationContext::BulkImport => write!(f, "BULK_IMPORT"),
            ValidationContext::RealTime => write!(f, "REAL_TIME"),
        }
    }
}

impl ValidationContext {
    pub fn is_competition_day(&self) -> bool {
        matches!(self, ValidationContext::CompetitionDay)
    }
}

// ==========================================
// 个人资格不符原因 (Ineligibility Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibilityReason {
    GradeIneligible,          // 年级不符
    AgeIneligible,            // 年龄不符
    SchoolAssociationInvalid, // 学校归属无效
    DuplicateRegistration,    // 同类别重复报名
}

impl fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IneligibilityReason::GradeIneligible => write!(f, "GRADE_INELIGIBLE"),
            IneligibilityReason::AgeIneligible => write!(f, "AGE_INELIGIBLE"),
            IneligibilityReason::SchoolAssociationInvalid => {
                write!(f, "SCHOOL_ASSOCIATION_INVALID")
            }
            IneligibilityReason::DuplicateRegistration => write!(f, "DUPLICATE_REGISTRATION"),
        }
    }
}

// ==========================================
// 操作者上下文 (Actor Context)
// ==========================================
// 红线: 业务逻辑不读取环境态, 操作者随调用显式传入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: String,
    pub display_name: String,
}

impl ActorContext {
    pub fn new(actor_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            display_name: display_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_status_roundtrip() {
        for status in [
            TeamStatus::Draft,
            TeamStatus::Approved,
            TeamStatus::Cancelled,
            TeamStatus::Ineligible,
        ] {
            assert_eq!(TeamStatus::from_str(status.to_db_str()), Some(status));
        }
        assert_eq!(TeamStatus::from_str("draft"), Some(TeamStatus::Draft));
        assert_eq!(TeamStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!(
            ParticipantRole::from_str("team_leader"),
            Some(ParticipantRole::TeamLeader)
        );
        assert_eq!(CoachRole::from_str("primary"), Some(CoachRole::Primary));
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ValidationContext::CompetitionDay).unwrap();
        assert_eq!(json, "\"COMPETITION_DAY\"");
        let back: ValidationContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ValidationContext::CompetitionDay);
    }
}
