// ==========================================
// 青少年科创竞赛管理系统 - 队伍 API
// ==========================================
// 职责: 整队构成校验、名册单步变更预检与落库
// 红线: 校验只产报告; 名册锁定后一切变更拒绝
// 红线: 所有拒绝必须携带显式原因（可解释性）
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::category::Category;
use crate::domain::competition::Competition;
use crate::domain::participant::Participant;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::{
    BackgroundCheckStatus, CoachRole, EligibilityStatus, MemberStatus, ParticipantRole,
    QualificationStatus, ValidationContext,
};
use crate::engine::composition::{CompositionReport, CompositionValidator, TeamCompositionInput};
use crate::repository::category_repo::CategoryRepository;
use crate::repository::competition_repo::CompetitionRepository;
use crate::repository::participant_repo::{CoachRepository, ParticipantRepository};
use crate::repository::roster_repo::RosterRepository;
use crate::repository::team_repo::TeamRepository;

// ==========================================
// TeamSnapshot - 校验用队伍快照
// ==========================================
// 拥有所有权的聚合, as_input() 借出给校验引擎
struct TeamSnapshot {
    competition: Competition,
    category: Category,
    team: Team,
    members: Vec<TeamParticipant>,
    coaches: Vec<TeamCoach>,
    participants: HashMap<String, Participant>,
    duplicate_conflicts: HashMap<String, String>,
}

impl TeamSnapshot {
    fn as_input(&self) -> TeamCompositionInput<'_> {
        TeamCompositionInput {
            competition: &self.competition,
            category: &self.category,
            team: &self.team,
            members: &self.members,
            coaches: &self.coaches,
            participants: &self.participants,
            duplicate_conflicts: &self.duplicate_conflicts,
        }
    }
}

// ==========================================
// TeamApi - 队伍 API
// ==========================================

/// 队伍API
///
/// 职责：
/// 1. 整队构成校验（报名/修改/赛日/实时语境）
/// 2. 名册单步变更预检（加人/移除/换角色/挂教练）
/// 3. 预检通过后的名册落库
pub struct TeamApi {
    team_repo: Arc<TeamRepository>,
    roster_repo: Arc<RosterRepository>,
    participant_repo: Arc<ParticipantRepository>,
    coach_repo: Arc<CoachRepository>,
    category_repo: Arc<CategoryRepository>,
    competition_repo: Arc<CompetitionRepository>,
    composition_validator: Arc<CompositionValidator<ConfigManager>>,
}

impl TeamApi {
    /// 创建新的TeamApi实例
    ///
    /// # 参数
    /// - team_repo: 队伍仓储
    /// - roster_repo: 名册仓储
    /// - participant_repo: 选手主数据仓储
    /// - coach_repo: 教练主数据仓储
    /// - category_repo: 赛项仓储
    /// - competition_repo: 赛事仓储
    /// - composition_validator: 构成校验引擎
    pub fn new(
        team_repo: Arc<TeamRepository>,
        roster_repo: Arc<RosterRepository>,
        participant_repo: Arc<ParticipantRepository>,
        coach_repo: Arc<CoachRepository>,
        category_repo: Arc<CategoryRepository>,
        competition_repo: Arc<CompetitionRepository>,
        composition_validator: Arc<CompositionValidator<ConfigManager>>,
    ) -> Self {
        Self {
            team_repo,
            roster_repo,
            participant_repo,
            coach_repo,
            category_repo,
            competition_repo,
            composition_validator,
        }
    }

    // ==========================================
    // 整队校验
    // ==========================================

    /// 校验整队构成
    ///
    /// # 参数
    /// - context: 校验语境 (报名/修改/赛日/批量导入/实时)
    /// - today: 基准日期 (年级/年龄窗口判定)
    ///
    /// # 返回
    /// - Ok(CompositionReport): 字段级报告 (含警告)
    #[instrument(skip(self), fields(context = %context))]
    pub async fn validate_team_composition(
        &self,
        team_id: &str,
        context: ValidationContext,
        today: NaiveDate,
    ) -> ApiResult<CompositionReport> {
        let snapshot = self.load_snapshot(team_id, &[])?;
        let report = self
            .composition_validator
            .validate_team(&snapshot.as_input(), context, today)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        Ok(report)
    }

    // ==========================================
    // 实时单步预检
    // ==========================================

    /// 预检: 新增队员
    #[instrument(skip(self), fields(context = %context))]
    pub async fn check_add_participant(
        &self,
        team_id: &str,
        participant_id: &str,
        role: ParticipantRole,
        context: ValidationContext,
        today: NaiveDate,
    ) -> ApiResult<CompositionReport> {
        let snapshot = self.load_snapshot(team_id, &[participant_id])?;
        self.ensure_roster_unlocked(&snapshot.team)?;

        let candidate = self
            .participant_repo
            .find_by_id(participant_id)?
            .ok_or_else(|| ApiError::NotFound(format!("选手(id={})不存在", participant_id)))?;

        let report = self
            .composition_validator
            .check_add_participant(&snapshot.as_input(), &candidate, role, context, today)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        Ok(report)
    }

    /// 预检: 移除队员
    #[instrument(skip(self), fields(context = %context))]
    pub async fn check_remove_participant(
        &self,
        team_id: &str,
        membership_id: &str,
        context: ValidationContext,
    ) -> ApiResult<CompositionReport> {
        let snapshot = self.load_snapshot(team_id, &[])?;
        self.ensure_roster_unlocked(&snapshot.team)?;

        let report = self
            .composition_validator
            .check_remove_participant(&snapshot.as_input(), membership_id, context)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        Ok(report)
    }

    /// 预检: 变更队员角色
    #[instrument(skip(self), fields(context = %context))]
    pub async fn check_change_role(
        &self,
        team_id: &str,
        membership_id: &str,
        new_role: ParticipantRole,
        context: ValidationContext,
    ) -> ApiResult<CompositionReport> {
        let snapshot = self.load_snapshot(team_id, &[])?;
        self.ensure_roster_unlocked(&snapshot.team)?;

        let report = self
            .composition_validator
            .check_change_role(&snapshot.as_input(), membership_id, new_role, context)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        Ok(report)
    }

    /// 预检: 指派教练
    ///
    /// 资质/背景核查结论由管理端在指派时录入,
    /// 落库后随队伍阶段冻结 (不回溯教练主数据)。
    #[instrument(skip(self), fields(context = %context))]
    #[allow(clippy::too_many_arguments)]
    pub async fn check_assign_coach(
        &self,
        team_id: &str,
        coach_id: &str,
        coach_role: CoachRole,
        qualification_status: QualificationStatus,
        background_check_status: BackgroundCheckStatus,
        context: ValidationContext,
    ) -> ApiResult<CompositionReport> {
        let snapshot = self.load_snapshot(team_id, &[])?;
        self.ensure_roster_unlocked(&snapshot.team)?;

        if self.coach_repo.find_by_id(coach_id)?.is_none() {
            return Err(ApiError::NotFound(format!("教练(id={})不存在", coach_id)));
        }

        let report = self
            .composition_validator
            .check_assign_coach(
                &snapshot.as_input(),
                coach_id,
                coach_role,
                qualification_status,
                background_check_status,
                context,
            )
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        Ok(report)
    }

    // ==========================================
    // 名册落库（预检通过才写入）
    // ==========================================

    /// 新增队员（预检不通过返回 ValidationFailed, 不落库）
    #[instrument(skip(self), fields(context = %context))]
    pub async fn add_participant(
        &self,
        team_id: &str,
        participant_id: &str,
        role: ParticipantRole,
        context: ValidationContext,
        today: NaiveDate,
    ) -> ApiResult<TeamParticipant> {
        let report = self
            .check_add_participant(team_id, participant_id, role, context, today)
            .await?;
        if !report.is_valid {
            return Err(ApiError::ValidationFailed { report });
        }

        let now = Utc::now();
        let member = TeamParticipant {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            participant_id: participant_id.to_string(),
            role,
            status: MemberStatus::Active,
            // 预检通过即为合格快照, 后续资格复核可覆写
            eligibility_status: EligibilityStatus::Eligible,
            documents_complete: false,
            joined_date: today,
            created_at: now,
            updated_at: now,
        };
        self.roster_repo.insert_participant(&member)?;

        info!(
            team_id = %team_id,
            participant_id = %participant_id,
            role = %role,
            "队员加入名册"
        );
        Ok(member)
    }

    /// 移除队员（置 REMOVED, 行保留作历史）
    #[instrument(skip(self), fields(context = %context))]
    pub async fn remove_participant(
        &self,
        team_id: &str,
        membership_id: &str,
        context: ValidationContext,
    ) -> ApiResult<()> {
        let report = self
            .check_remove_participant(team_id, membership_id, context)
            .await?;
        if !report.is_valid {
            return Err(ApiError::ValidationFailed { report });
        }

        self.roster_repo
            .update_participant_status(membership_id, MemberStatus::Removed, Utc::now())?;

        info!(team_id = %team_id, membership_id = %membership_id, "队员移出名册");
        Ok(())
    }

    /// 变更队员角色
    #[instrument(skip(self), fields(context = %context))]
    pub async fn change_role(
        &self,
        team_id: &str,
        membership_id: &str,
        new_role: ParticipantRole,
        context: ValidationContext,
    ) -> ApiResult<()> {
        let report = self
            .check_change_role(team_id, membership_id, new_role, context)
            .await?;
        if !report.is_valid {
            return Err(ApiError::ValidationFailed { report });
        }

        self.roster_repo
            .update_participant_role(membership_id, new_role, Utc::now())?;

        info!(
            team_id = %team_id,
            membership_id = %membership_id,
            new_role = %new_role,
            "队员角色变更"
        );
        Ok(())
    }

    /// 指派教练（同步刷新队伍教练快捷引用）
    #[instrument(skip(self), fields(context = %context))]
    #[allow(clippy::too_many_arguments)]
    pub async fn assign_coach(
        &self,
        team_id: &str,
        coach_id: &str,
        coach_role: CoachRole,
        qualification_status: QualificationStatus,
        background_check_status: BackgroundCheckStatus,
        training_completed: bool,
        context: ValidationContext,
        today: NaiveDate,
    ) -> ApiResult<TeamCoach> {
        let report = self
            .check_assign_coach(
                team_id,
                coach_id,
                coach_role,
                qualification_status,
                background_check_status,
                context,
            )
            .await?;
        if !report.is_valid {
            return Err(ApiError::ValidationFailed { report });
        }

        let now = Utc::now();
        let coach = TeamCoach {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            user_id: coach_id.to_string(),
            coach_role,
            status: MemberStatus::Active,
            qualification_status,
            background_check_status,
            training_completed,
            assigned_date: today,
            created_at: now,
            updated_at: now,
        };
        self.roster_repo.insert_coach(&coach)?;
        self.refresh_coach_refs(team_id)?;

        info!(
            team_id = %team_id,
            coach_id = %coach_id,
            coach_role = %coach_role,
            "教练挂队"
        );
        Ok(coach)
    }

    /// 更新队员参赛材料齐备标记
    #[instrument(skip(self))]
    pub async fn set_documents_complete(
        &self,
        team_id: &str,
        membership_id: &str,
        complete: bool,
    ) -> ApiResult<()> {
        let snapshot = self.load_snapshot(team_id, &[])?;
        self.ensure_roster_unlocked(&snapshot.team)?;

        if !snapshot.members.iter().any(|m| m.id == membership_id) {
            return Err(ApiError::NotFound(format!(
                "名册行(id={})不存在或已非在役",
                membership_id
            )));
        }

        self.roster_repo
            .set_documents_complete(membership_id, complete, Utc::now())?;

        info!(
            team_id = %team_id,
            membership_id = %membership_id,
            complete = complete,
            "参赛材料标记更新"
        );
        Ok(())
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 加载队伍快照（在役名册 + 选手主数据 + 跨队占位冲突）
    ///
    /// # 参数
    /// - extra_conflict_ids: 名册外需要做占位冲突检测的选手 (加人预检的候选人)
    fn load_snapshot(&self, team_id: &str, extra_conflict_ids: &[&str]) -> ApiResult<TeamSnapshot> {
        if team_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("队伍ID不能为空".to_string()));
        }

        let team = self
            .team_repo
            .find_by_id(team_id)?
            .ok_or_else(|| ApiError::NotFound(format!("队伍(id={})不存在", team_id)))?;
        let competition = self
            .competition_repo
            .find_by_id(&team.competition_id)?
            .ok_or_else(|| ApiError::NotFound(format!("赛事(id={})不存在", team.competition_id)))?;
        let category = self
            .category_repo
            .find_by_id(&team.category_id)?
            .ok_or_else(|| ApiError::NotFound(format!("赛项(id={})不存在", team.category_id)))?;

        let members = self.roster_repo.list_active_participants(&team.team_id)?;
        let coaches = self.roster_repo.list_active_coaches(&team.team_id)?;

        let member_ids: Vec<String> = members.iter().map(|m| m.participant_id.clone()).collect();
        let participants: HashMap<String, Participant> = self
            .participant_repo
            .find_by_ids(&member_ids)?
            .into_iter()
            .map(|p| (p.participant_id.clone(), p))
            .collect();

        let mut duplicate_conflicts = HashMap::new();
        for pid in member_ids
            .iter()
            .map(String::as_str)
            .chain(extra_conflict_ids.iter().copied())
        {
            if duplicate_conflicts.contains_key(pid) {
                continue;
            }
            if let Some(other_team) = self.roster_repo.find_active_membership(
                pid,
                &team.category_id,
                &team.phase_id,
                Some(&team.team_id),
            )? {
                duplicate_conflicts.insert(pid.to_string(), other_team);
            }
        }

        Ok(TeamSnapshot {
            competition,
            category,
            team,
            members,
            coaches,
            participants,
            duplicate_conflicts,
        })
    }

    fn ensure_roster_unlocked(&self, team: &Team) -> ApiResult<()> {
        if team.roster_locked {
            return Err(ApiError::BusinessRuleViolation(format!(
                "队伍 {} 名册已锁定, 不可变更",
                team.team_id
            )));
        }
        Ok(())
    }

    /// 由在役教练名册重建队伍快捷引用（主教练在前）
    fn refresh_coach_refs(&self, team_id: &str) -> ApiResult<()> {
        let coaches = self.roster_repo.list_active_coaches(team_id)?;
        let coach1 = coaches
            .iter()
            .find(|c| c.coach_role == CoachRole::Primary)
            .map(|c| c.user_id.as_str());
        let coach2 = coaches
            .iter()
            .find(|c| c.coach_role != CoachRole::Primary)
            .map(|c| c.user_id.as_str());
        self.team_repo
            .update_coach_refs(team_id, coach1, coach2, Utc::now())?;
        Ok(())
    }
}
