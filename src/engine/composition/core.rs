// ==========================================
// 青少年科创竞赛管理系统 - 队伍构成校验引擎
// ==========================================
// 红线: 校验只产报告, 不写库
// 红线: 赛日 (COMPETITION_DAY) 语境下警告升级为错误
// ==========================================
// 职责: 规模/资格/教练/材料/角色策略五项校验 + 单步变更预检
// 输入: 队伍 + 在役名册 + 选手主数据 + 赛项策略
// 输出: CompositionReport
// ==========================================

use crate::config::CompetitionConfigReader;
use crate::domain::category::Category;
use crate::domain::competition::Competition;
use crate::domain::participant::Participant;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::{
    BackgroundCheckStatus, CoachRole, ParticipantRole, QualificationStatus, ValidationContext,
};
use crate::engine::eligibility::EligibilityEngine;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

use super::report::CompositionReport;

// ==========================================
// TeamCompositionInput - 校验输入快照
// ==========================================
// 约定: members / coaches 只含在役 (ACTIVE) 行,
//       由调用方 (API 层) 查出后传入
pub struct TeamCompositionInput<'a> {
    pub competition: &'a Competition,
    pub category: &'a Category,
    pub team: &'a Team,
    /// 在役队员行
    pub members: &'a [TeamParticipant],
    /// 在役教练行
    pub coaches: &'a [TeamCoach],
    /// 选手主数据 (participant_id → Participant)
    pub participants: &'a HashMap<String, Participant>,
    /// 跨队占位冲突 (participant_id → 对方队伍), 不含本队
    pub duplicate_conflicts: &'a HashMap<String, String>,
}

// ==========================================
// CompositionValidator - 队伍构成校验引擎
// ==========================================
pub struct CompositionValidator<C>
where
    C: CompetitionConfigReader,
{
    config: Arc<C>,
    eligibility: EligibilityEngine,
}

impl<C> CompositionValidator<C>
where
    C: CompetitionConfigReader,
{
    /// 创建新的 CompositionValidator 实例
    ///
    /// # 参数
    /// - config: 配置读取器
    pub fn new(config: Arc<C>) -> Self {
        Self {
            config,
            eligibility: EligibilityEngine::new(),
        }
    }

    /// 解析队伍规模区间
    ///
    /// # 规则
    /// - 下限: 赛事级覆盖 → 赛项 min_participants → 模式默认
    /// - 上限: 赛事级覆盖 → 赛项 max_participants → 赛项 team_size → 模式默认
    pub async fn resolve_size_bounds(
        &self,
        competition: &Competition,
        category: &Category,
    ) -> Result<(i32, i32), Box<dyn Error>> {
        let (default_min, default_max) = self.config.get_team_size_bounds(competition.mode).await?;

        let min = competition
            .team_size_min
            .or(category.min_participants)
            .unwrap_or(default_min);
        let max = competition
            .team_size_max
            .or(category.max_participants)
            .or(category.team_size)
            .unwrap_or(default_max);

        Ok((min, max))
    }

    /// 校验整队构成
    ///
    /// # 参数
    /// - input: 队伍与名册快照
    /// - context: 校验语境 (报名/修改/赛日/批量导入/实时)
    /// - today: 基准日期
    #[instrument(skip(self, input), fields(
        team_id = %input.team.team_id,
        category_id = %input.category.category_id,
        context = %context,
    ))]
    pub async fn validate_team(
        &self,
        input: &TeamCompositionInput<'_>,
        context: ValidationContext,
        today: NaiveDate,
    ) -> Result<CompositionReport, Box<dyn Error>> {
        let mut report = CompositionReport::new();

        // === 步骤 1: 规模检查 ===
        let (min_size, max_size) = self
            .resolve_size_bounds(input.competition, input.category)
            .await?;
        let active_count = input.members.len() as i32;

        if active_count < min_size {
            report.record_error(
                "team_size",
                format!("在役队员数 {} 低于下限 {}", active_count, min_size),
            );
        }
        if active_count > max_size {
            report.record_error(
                "team_size",
                format!("在役队员数 {} 超过上限 {}", active_count, max_size),
            );
        }
        if context.is_competition_day() && active_count == 0 {
            report.record_error("team_size", "赛日队伍至少需要一名在役队员");
        }

        // === 步骤 2: 逐队员资格检查 ===
        for member in input.members {
            let field = format!("participant.{}", member.participant_id);
            let Some(participant) = input.participants.get(&member.participant_id) else {
                report.record_error(field, "选手主数据缺失");
                continue;
            };

            let conflict = input
                .duplicate_conflicts
                .get(&member.participant_id)
                .map(String::as_str);
            let verdict = self.eligibility.evaluate(
                participant,
                input.category,
                &input.team.school_id,
                conflict,
                today,
            );
            if !verdict.eligible {
                for detail in &verdict.details {
                    report.record_error(field.clone(), detail.clone());
                }
            }
        }

        // === 步骤 3: 教练检查 ===
        self.check_coaches(input.coaches, &mut report).await?;

        // === 步骤 4: 材料检查 ===
        for member in input.members {
            if !member.documents_complete {
                report.record_warning(
                    format!("documents.{}", member.participant_id),
                    "参赛材料未齐",
                );
            }
        }

        // === 步骤 5: 角色策略检查 ===
        if let Some(rules) = &input.category.composition_rules {
            Self::check_role_policy(input.members, rules, &mut report);
        }

        // === 步骤 6: 赛日语境升级 ===
        if context.is_competition_day() {
            report.escalate_warnings();
        }

        Ok(report)
    }

    /// 教练完整性检查 (数量 / 主教练唯一 / 资质)
    async fn check_coaches(
        &self,
        coaches: &[TeamCoach],
        report: &mut CompositionReport,
    ) -> Result<(), Box<dyn Error>> {
        let max_coaches = self.config.get_max_coaches_per_team().await?;
        let total = coaches.len() as i32;

        if total == 0 {
            report.record_error("coaches", "队伍至少需要一名在役教练");
            return Ok(());
        }

        let primary_count = coaches
            .iter()
            .filter(|c| c.coach_role == CoachRole::Primary)
            .count();
        if primary_count == 0 {
            report.record_error("coaches", "缺少主教练 (PRIMARY)");
        }
        if primary_count > 1 {
            report.record_error(
                "coaches",
                format!("主教练只能一名, 当前 {}", primary_count),
            );
        }

        if total > max_coaches {
            report.record_error(
                "coaches",
                format!("在役教练数 {} 超过上限 {}", total, max_coaches),
            );
        }

        // 资质/背景核查: 平时提示, 赛日由升级机制转为阻断
        for coach in coaches {
            if !coach.is_competition_ready() {
                report.record_warning(
                    "coaches",
                    format!(
                        "教练 {} 资质未完备 (资质 {}, 背景核查 {})",
                        coach.user_id, coach.qualification_status, coach.background_check_status
                    ),
                );
            }
        }

        Ok(())
    }

    /// 角色策略检查 (最低配置 / 上限 / 队长唯一)
    fn check_role_policy(
        members: &[TeamParticipant],
        rules: &crate::domain::category::CompositionRules,
        report: &mut CompositionReport,
    ) {
        let mut role_counts: HashMap<ParticipantRole, u32> = HashMap::new();
        for member in members {
            *role_counts.entry(member.role).or_insert(0) += 1;
        }

        for (role, min_required) in &rules.required_roles {
            let actual = role_counts.get(role).copied().unwrap_or(0);
            if actual < *min_required {
                report.record_error(
                    "roles",
                    format!("角色 {} 至少需要 {} 人, 当前 {}", role, min_required, actual),
                );
            }
        }

        for (role, max_allowed) in &rules.max_per_role {
            let actual = role_counts.get(role).copied().unwrap_or(0);
            if actual > *max_allowed {
                report.record_error(
                    "roles",
                    format!("角色 {} 至多允许 {} 人, 当前 {}", role, max_allowed, actual),
                );
            }
        }

        if rules.require_team_leader {
            let leaders = role_counts
                .get(&ParticipantRole::TeamLeader)
                .copied()
                .unwrap_or(0);
            if leaders == 0 {
                report.record_error("roles", "缺少队长 (TEAM_LEADER)");
            }
            if leaders > 1 {
                report.record_error("roles", format!("队长只能一名, 当前 {}", leaders));
            }
        }
    }

    // ==========================================
    // 实时单步变更预检
    // ==========================================

    /// 预检: 新增队员
    ///
    /// # 检查项
    /// 1. 规模上限 (+1 后)
    /// 2. 是否已在本队在役
    /// 3. 候选选手资格 (年级/年龄/学校/跨队占位)
    /// 4. 目标角色的上限与队长唯一
    #[instrument(skip(self, input, candidate), fields(
        team_id = %input.team.team_id,
        participant_id = %candidate.participant_id,
    ))]
    pub async fn check_add_participant(
        &self,
        input: &TeamCompositionInput<'_>,
        candidate: &Participant,
        role: ParticipantRole,
        context: ValidationContext,
        today: NaiveDate,
    ) -> Result<CompositionReport, Box<dyn Error>> {
        let mut report = CompositionReport::new();

        // === 1. 规模上限 ===
        let (_, max_size) = self
            .resolve_size_bounds(input.competition, input.category)
            .await?;
        let active_count = input.members.len() as i32;
        if active_count + 1 > max_size {
            report.record_error(
                "team_size",
                format!("加入后队员数 {} 将超过上限 {}", active_count + 1, max_size),
            );
        }

        // === 2. 本队重复 ===
        let field = format!("participant.{}", candidate.participant_id);
        if input
            .members
            .iter()
            .any(|m| m.participant_id == candidate.participant_id)
        {
            report.record_error(field.clone(), "选手已在本队在役名册中");
        }

        // === 3. 候选资格 ===
        let conflict = input
            .duplicate_conflicts
            .get(&candidate.participant_id)
            .map(String::as_str);
        let verdict = self.eligibility.evaluate(
            candidate,
            input.category,
            &input.team.school_id,
            conflict,
            today,
        );
        if !verdict.eligible {
            for detail in &verdict.details {
                report.record_error(field.clone(), detail.clone());
            }
        }

        // === 4. 角色策略 ===
        if let Some(rules) = &input.category.composition_rules {
            let same_role = input.members.iter().filter(|m| m.role == role).count() as u32;
            if let Some(max_allowed) = rules.max_per_role.get(&role) {
                if same_role + 1 > *max_allowed {
                    report.record_error(
                        "roles",
                        format!("角色 {} 至多允许 {} 人, 加入后将超限", role, max_allowed),
                    );
                }
            }
            if rules.require_team_leader && role == ParticipantRole::TeamLeader && same_role >= 1 {
                report.record_error("roles", "队长只能一名");
            }
        }

        if context.is_competition_day() {
            report.escalate_warnings();
        }
        Ok(report)
    }

    /// 预检: 移除队员
    ///
    /// # 检查项
    /// 1. 规模下限 (-1 后)
    /// 2. 队长/必配角色不可移空
    #[instrument(skip(self, input), fields(team_id = %input.team.team_id))]
    pub async fn check_remove_participant(
        &self,
        input: &TeamCompositionInput<'_>,
        membership_id: &str,
        context: ValidationContext,
    ) -> Result<CompositionReport, Box<dyn Error>> {
        let mut report = CompositionReport::new();

        let Some(target) = input.members.iter().find(|m| m.id == membership_id) else {
            report.record_error("participant", format!("名册行 {} 不存在或已非在役", membership_id));
            return Ok(report);
        };

        // === 1. 规模下限 ===
        let (min_size, _) = self
            .resolve_size_bounds(input.competition, input.category)
            .await?;
        let active_count = input.members.len() as i32;
        if active_count - 1 < min_size {
            report.record_error(
                "team_size",
                format!("移除后队员数 {} 将低于下限 {}", active_count - 1, min_size),
            );
        }

        // === 2. 角色策略 ===
        if let Some(rules) = &input.category.composition_rules {
            let same_role = input
                .members
                .iter()
                .filter(|m| m.role == target.role)
                .count() as u32;
            if let Some(min_required) = rules.required_roles.get(&target.role) {
                if same_role <= *min_required {
                    report.record_error(
                        "roles",
                        format!("角色 {} 不可低于最低配置 {} 人", target.role, min_required),
                    );
                }
            }
            if rules.require_team_leader
                && target.role == ParticipantRole::TeamLeader
                && same_role == 1
            {
                report.record_error("roles", "不可移除唯一队长");
            }
        }

        if context.is_competition_day() {
            report.escalate_warnings();
        }
        Ok(report)
    }

    /// 预检: 变更队员角色
    #[instrument(skip(self, input), fields(team_id = %input.team.team_id))]
    pub async fn check_change_role(
        &self,
        input: &TeamCompositionInput<'_>,
        membership_id: &str,
        new_role: ParticipantRole,
        context: ValidationContext,
    ) -> Result<CompositionReport, Box<dyn Error>> {
        let mut report = CompositionReport::new();

        let Some(target) = input.members.iter().find(|m| m.id == membership_id) else {
            report.record_error("participant", format!("名册行 {} 不存在或已非在役", membership_id));
            return Ok(report);
        };
        if target.role == new_role {
            return Ok(report);
        }

        if let Some(rules) = &input.category.composition_rules {
            // 新角色上限
            let new_role_count = input.members.iter().filter(|m| m.role == new_role).count() as u32;
            if let Some(max_allowed) = rules.max_per_role.get(&new_role) {
                if new_role_count + 1 > *max_allowed {
                    report.record_error(
                        "roles",
                        format!("角色 {} 至多允许 {} 人, 变更后将超限", new_role, max_allowed),
                    );
                }
            }
            if rules.require_team_leader
                && new_role == ParticipantRole::TeamLeader
                && new_role_count >= 1
            {
                report.record_error("roles", "队长只能一名");
            }

            // 原角色底线
            let old_role_count = input
                .members
                .iter()
                .filter(|m| m.role == target.role)
                .count() as u32;
            if let Some(min_required) = rules.required_roles.get(&target.role) {
                if old_role_count <= *min_required {
                    report.record_error(
                        "roles",
                        format!("角色 {} 不可低于最低配置 {} 人", target.role, min_required),
                    );
                }
            }
            if rules.require_team_leader
                && target.role == ParticipantRole::TeamLeader
                && old_role_count == 1
            {
                report.record_error("roles", "变更后队伍将没有队长");
            }
        }

        if context.is_competition_day() {
            report.escalate_warnings();
        }
        Ok(report)
    }

    /// 预检: 指派教练
    ///
    /// # 检查项
    /// 1. 教练数上限 (+1 后)
    /// 2. 主教练唯一
    /// 3. 资质/背景核查 (平时提示, 赛日阻断)
    #[instrument(skip(self, input), fields(team_id = %input.team.team_id, user_id = %user_id))]
    pub async fn check_assign_coach(
        &self,
        input: &TeamCompositionInput<'_>,
        user_id: &str,
        coach_role: CoachRole,
        qualification_status: QualificationStatus,
        background_check_status: BackgroundCheckStatus,
        context: ValidationContext,
    ) -> Result<CompositionReport, Box<dyn Error>> {
        let mut report = CompositionReport::new();

        let max_coaches = self.config.get_max_coaches_per_team().await?;
        let total = input.coaches.len() as i32;

        // === 1. 数量上限 ===
        if total + 1 > max_coaches {
            report.record_error(
                "coaches",
                format!("指派后教练数 {} 将超过上限 {}", total + 1, max_coaches),
            );
        }

        // === 2. 重复与主教练唯一 ===
        if input.coaches.iter().any(|c| c.user_id == user_id) {
            report.record_error("coaches", format!("教练 {} 已在本队在役", user_id));
        }
        if coach_role == CoachRole::Primary
            && input
                .coaches
                .iter()
                .any(|c| c.coach_role == CoachRole::Primary)
        {
            report.record_error("coaches", "主教练只能一名");
        }

        // === 3. 资质 ===
        if qualification_status != QualificationStatus::Qualified
            || background_check_status != BackgroundCheckStatus::Verified
        {
            report.record_warning(
                "coaches",
                format!(
                    "教练 {} 资质未完备 (资质 {}, 背景核查 {})",
                    user_id, qualification_status, background_check_status
                ),
            );
        }

        if context.is_competition_day() {
            report.escalate_warnings();
        }
        Ok(report)
    }
}
