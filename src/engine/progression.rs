// ==========================================
// 青少年科创竞赛管理系统 - 晋级落地引擎
// ==========================================
// 红线: 晋级永远新建队伍行, 源队伍及其名册原样保留作历史
// 红线: 台账行引用源队伍, 只追加
// ==========================================
// 职责: 把选拔结果物化为 (新队伍 + 克隆名册 + 台账行) 三件套
// 输入: 源队伍 + 名册 + 选拔名次 + 目标阶段
// 输出: AdvancementBundle (由仓储层在单事务内落库)
// ==========================================

use crate::domain::competition::Phase;
use crate::domain::progression::ProgressionRecord;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::{CompetitionMode, TeamStatus};
use crate::engine::selector::SelectedTeam;
use crate::engine::strategy::ProgressionStrategy;
use chrono::{NaiveDate, Utc};
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// AdvancementBundle - 单队晋级写入单元
// ==========================================
// 三部分必须在同一事务内落库 (ProgressionRepository::record_advancement)
#[derive(Debug, Clone)]
pub struct AdvancementBundle {
    pub team: Team,
    pub participants: Vec<TeamParticipant>,
    pub coaches: Vec<TeamCoach>,
    pub record: ProgressionRecord,
}

// ==========================================
// ProgressionExecutor - 晋级落地引擎
// ==========================================
pub struct ProgressionExecutor {
    // 无状态引擎，不需要注入依赖
}

impl ProgressionExecutor {
    pub fn new() -> Self {
        Self {}
    }

    /// 物化单队晋级
    ///
    /// 规则：
    /// 1) 新队伍: 新 ID/编号, 同校/同赛项/同教练引用, 分数复制,
    ///    状态直接 APPROVED, 备注记录来源队伍与名次
    /// 2) 名册克隆: 仅克隆在役 (ACTIVE) 行, 新 ID, 挂到新队伍,
    ///    入队/挂队日期重置为晋级日期
    /// 3) 台账: 恰好一行, 引用源队伍
    ///
    /// # 参数
    /// - `source`: 源阶段队伍
    /// - `roster` / `coaches`: 源队伍名册 (可含非在役行, 引擎只取在役)
    /// - `selected`: 选拔结果 (名次 + 分数)
    /// - `category_code`: 赛项代码 (队伍编号前缀)
    /// - `to_phase`: 目标阶段
    /// - `progression_date`: 晋级日期
    #[instrument(skip(self, source, roster, coaches, selected, to_phase), fields(
        source_team_id = %source.team_id,
        to_phase_id = %to_phase.phase_id,
        rank = selected.rank
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn materialize(
        &self,
        source: &Team,
        roster: &[TeamParticipant],
        coaches: &[TeamCoach],
        selected: &SelectedTeam,
        category_code: &str,
        to_phase: &Phase,
        strategy: ProgressionStrategy,
        mode: CompetitionMode,
        progression_date: NaiveDate,
    ) -> AdvancementBundle {
        let now = Utc::now();
        let new_team_id = Uuid::new_v4().to_string();
        let short_id = new_team_id.get(..8).unwrap_or(new_team_id.as_str());

        // === 1. 目标阶段新队伍 ===
        let team = Team {
            team_id: new_team_id.clone(),
            competition_id: source.competition_id.clone(),
            school_id: source.school_id.clone(),
            category_id: source.category_id.clone(),
            phase_id: to_phase.phase_id.clone(),
            name: source.name.clone(),
            team_code: format!("{}-P{}-{}", category_code, to_phase.phase_order, short_id),
            status: TeamStatus::Approved,
            roster_locked: false,
            qualification_score: selected.score,
            coach1_id: source.coach1_id.clone(),
            coach2_id: source.coach2_id.clone(),
            notes: Some(format!(
                "晋级自队伍 {} (赛项第 {} 名)",
                source.team_id, selected.rank
            )),
            created_by: source.created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        // === 2. 克隆在役名册 ===
        let participants: Vec<TeamParticipant> = roster
            .iter()
            .filter(|m| m.is_active())
            .map(|m| TeamParticipant {
                id: Uuid::new_v4().to_string(),
                team_id: new_team_id.clone(),
                participant_id: m.participant_id.clone(),
                role: m.role,
                status: m.status,
                eligibility_status: m.eligibility_status,
                documents_complete: m.documents_complete,
                joined_date: progression_date,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let coaches: Vec<TeamCoach> = coaches
            .iter()
            .filter(|c| c.is_active())
            .map(|c| TeamCoach {
                id: Uuid::new_v4().to_string(),
                team_id: new_team_id.clone(),
                user_id: c.user_id.clone(),
                coach_role: c.coach_role,
                status: c.status,
                qualification_status: c.qualification_status,
                background_check_status: c.background_check_status,
                training_completed: c.training_completed,
                assigned_date: progression_date,
                created_at: now,
                updated_at: now,
            })
            .collect();

        // === 3. 台账行 (引用源队伍) ===
        let record = ProgressionRecord {
            id: Uuid::new_v4().to_string(),
            team_id: source.team_id.clone(),
            from_phase_id: source.phase_id.clone(),
            to_phase_id: to_phase.phase_id.clone(),
            progression_date,
            score: selected.score,
            rank_in_category: selected.rank,
            qualified: true,
            advancement_reason: Some(format!("{} (第 {} 名)", strategy.title_cn(), selected.rank)),
            competition_type: mode,
            created_at: now,
        };

        AdvancementBundle {
            team,
            participants,
            coaches,
            record,
        }
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for ProgressionExecutor {
    fn default() -> Self {
        Self::new()
    }
}
