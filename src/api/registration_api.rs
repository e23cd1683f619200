// ==========================================
// 青少年科创竞赛管理系统 - 报名 API
// ==========================================
// 职责: 报名资格预检、队伍创建、学校可报名摘要
// 红线: 容量预检仅供提示, 并发场景以存储层唯一索引为准
// 红线: 所有拒绝必须携带显式原因（可解释性）
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::category::Category;
use crate::domain::competition::{Competition, Phase};
use crate::domain::school::School;
use crate::domain::team::Team;
use crate::domain::types::{ActorContext, TeamStatus};
use crate::engine::capacity::{CapacityValidator, CategoryAvailability};
use crate::repository::category_repo::CategoryRepository;
use crate::repository::competition_repo::{CompetitionRepository, PhaseRepository};
use crate::repository::school_repo::SchoolRepository;
use crate::repository::team_repo::TeamRepository;

// ==========================================
// RegistrationCheck - 报名资格预检结论
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationCheck {
    /// 是否还可报名
    pub can_register: bool,
    /// 剩余名额
    pub remaining_slots: i64,
    /// 不可报名时的说明
    pub reason: Option<String>,
}

// ==========================================
// AvailabilitySummary - 学校可报名摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub school_id: String,
    pub competition_id: String,
    pub phase_id: String,
    /// 可报名的在前, 其后按赛项展示顺序
    pub categories: Vec<CategoryAvailability>,
}

// ==========================================
// RegistrationApi - 报名 API
// ==========================================

/// 报名API
///
/// 职责：
/// 1. 报名资格预检（容量判定, 仅供提示）
/// 2. 队伍创建（最终以存储层唯一索引裁决并发）
/// 3. 学校维度的赛项可报名摘要
pub struct RegistrationApi {
    school_repo: Arc<SchoolRepository>,
    category_repo: Arc<CategoryRepository>,
    competition_repo: Arc<CompetitionRepository>,
    phase_repo: Arc<PhaseRepository>,
    team_repo: Arc<TeamRepository>,
    capacity_validator: Arc<CapacityValidator<ConfigManager>>,
}

impl RegistrationApi {
    /// 创建新的RegistrationApi实例
    ///
    /// # 参数
    /// - school_repo: 学校主数据仓储
    /// - category_repo: 赛项仓储
    /// - competition_repo: 赛事仓储
    /// - phase_repo: 阶段仓储
    /// - team_repo: 队伍仓储
    /// - capacity_validator: 容量校验引擎
    pub fn new(
        school_repo: Arc<SchoolRepository>,
        category_repo: Arc<CategoryRepository>,
        competition_repo: Arc<CompetitionRepository>,
        phase_repo: Arc<PhaseRepository>,
        team_repo: Arc<TeamRepository>,
        capacity_validator: Arc<CapacityValidator<ConfigManager>>,
    ) -> Self {
        Self {
            school_repo,
            category_repo,
            competition_repo,
            phase_repo,
            team_repo,
            capacity_validator,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 报名资格预检
    ///
    /// 解析当前活动赛事的入口阶段, 判定 (学校, 赛项) 名额。
    /// 结论仅供提示, 并发场景以 register_team 的插入结果为准。
    ///
    /// # 返回
    /// - Ok(RegistrationCheck): 预检结论
    /// - Err(ApiError): 主数据缺失或配置错误
    #[instrument(skip(self))]
    pub async fn validate_registration(
        &self,
        school_id: &str,
        category_id: &str,
    ) -> ApiResult<RegistrationCheck> {
        // 参数验证
        if school_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("学校ID不能为空".to_string()));
        }
        if category_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("赛项ID不能为空".to_string()));
        }

        let school = self.require_school(school_id)?;
        if !school.is_active {
            return Ok(RegistrationCheck {
                can_register: false,
                remaining_slots: 0,
                reason: Some(format!("学校 {} 未在册", school.name)),
            });
        }

        let (competition, entry_phase) = self.resolve_entry_phase()?;
        let category = self.require_category(category_id, &competition)?;
        if !category.is_active {
            return Ok(RegistrationCheck {
                can_register: false,
                remaining_slots: 0,
                reason: Some(format!("赛项 {} 未启用", category.name)),
            });
        }

        let existing = self.team_repo.count_non_cancelled(
            &school.school_id,
            &category.category_id,
            &entry_phase.phase_id,
        )?;
        let verdict = self
            .capacity_validator
            .check(existing)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;

        Ok(RegistrationCheck {
            can_register: verdict.can_register,
            remaining_slots: verdict.remaining_slots,
            reason: verdict.violation_reason,
        })
    }

    /// 学校可报名摘要
    ///
    /// 逐赛项给出已用/剩余名额, 可报名的排前。
    #[instrument(skip(self))]
    pub async fn availability_summary(&self, school_id: &str) -> ApiResult<AvailabilitySummary> {
        if school_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("学校ID不能为空".to_string()));
        }
        let school = self.require_school(school_id)?;
        let (competition, entry_phase) = self.resolve_entry_phase()?;

        let categories = self
            .category_repo
            .list_active_by_competition(&competition.competition_id)?;
        let counts: HashMap<String, i64> = self
            .team_repo
            .count_non_cancelled_by_school(&school.school_id, &entry_phase.phase_id)?
            .into_iter()
            .collect();

        let rows = self
            .capacity_validator
            .summarize_availability(&categories, &counts)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;

        Ok(AvailabilitySummary {
            school_id: school.school_id,
            competition_id: competition.competition_id,
            phase_id: entry_phase.phase_id,
            categories: rows,
        })
    }

    // ==========================================
    // 变更接口
    // ==========================================

    /// 创建报名队伍（入口阶段, DRAFT 状态）
    ///
    /// # 并发
    /// 先做容量预检（提示友好的 CapacityExceeded）, 再执行插入;
    /// 预检窗口内被抢占时由唯一索引拦截, 映射为可重试的 CapacityRace。
    ///
    /// # 返回
    /// - Ok(Team): 新建队伍
    /// - Err(ApiError): 容量已满 / 名额竞争 / 主数据缺失
    #[instrument(skip(self, actor), fields(actor_id = %actor.actor_id))]
    pub async fn register_team(
        &self,
        school_id: &str,
        category_id: &str,
        team_name: &str,
        actor: &ActorContext,
    ) -> ApiResult<Team> {
        // 参数验证
        if team_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("队名不能为空".to_string()));
        }

        let school = self.require_school(school_id)?;
        if !school.is_active {
            return Err(ApiError::BusinessRuleViolation(format!(
                "学校 {} 未在册, 不可报名",
                school.name
            )));
        }

        let (competition, entry_phase) = self.resolve_entry_phase()?;
        let category = self.require_category(category_id, &competition)?;
        if !category.is_active {
            return Err(ApiError::BusinessRuleViolation(format!(
                "赛项 {} 未启用, 不可报名",
                category.name
            )));
        }

        // === 步骤 1: 容量预检（提示性） ===
        let existing = self.team_repo.count_non_cancelled(
            &school.school_id,
            &category.category_id,
            &entry_phase.phase_id,
        )?;
        let verdict = self
            .capacity_validator
            .check(existing)
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        if !verdict.can_register {
            return Err(ApiError::CapacityExceeded(
                verdict.violation_reason.unwrap_or_else(|| {
                    format!("名额已满: {}/{}", verdict.existing_count, verdict.limit)
                }),
            ));
        }

        // === 步骤 2: 构造并插入队伍 ===
        let now = Utc::now();
        let team_id = Uuid::new_v4().to_string();
        let short_id = team_id.get(..8).unwrap_or(team_id.as_str());
        let team = Team {
            team_id: team_id.clone(),
            competition_id: competition.competition_id.clone(),
            school_id: school.school_id.clone(),
            category_id: category.category_id.clone(),
            phase_id: entry_phase.phase_id.clone(),
            name: team_name.trim().to_string(),
            team_code: format!("{}-P{}-{}", category.code, entry_phase.phase_order, short_id),
            status: TeamStatus::Draft,
            roster_locked: false,
            qualification_score: None,
            coach1_id: None,
            coach2_id: None,
            notes: None,
            created_by: Some(actor.actor_id.clone()),
            created_at: now,
            updated_at: now,
        };

        // 唯一索引拦截时 From<RepositoryError> 映射为 CapacityRace
        self.team_repo.insert(&team)?;

        info!(
            team_id = %team.team_id,
            team_code = %team.team_code,
            school_id = %team.school_id,
            category_id = %team.category_id,
            "报名队伍创建成功"
        );
        Ok(team)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn require_school(&self, school_id: &str) -> ApiResult<School> {
        self.school_repo
            .find_by_id(school_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学校(id={})不存在", school_id)))
    }

    fn require_category(&self, category_id: &str, competition: &Competition) -> ApiResult<Category> {
        let category = self
            .category_repo
            .find_by_id(category_id)?
            .ok_or_else(|| ApiError::NotFound(format!("赛项(id={})不存在", category_id)))?;
        if category.competition_id != competition.competition_id {
            return Err(ApiError::InvalidInput(format!(
                "赛项 {} 不属于当前活动赛事 {}",
                category.category_id, competition.competition_id
            )));
        }
        Ok(category)
    }

    /// 解析当前活动赛事及其入口阶段
    fn resolve_entry_phase(&self) -> ApiResult<(Competition, Phase)> {
        let competition = self
            .competition_repo
            .find_active()?
            .ok_or_else(|| ApiError::NotFound("当前无活动赛事".to_string()))?;
        let entry_phase = self
            .phase_repo
            .find_entry_phase(&competition.competition_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "赛事 {} 未配置阶段",
                    competition.competition_id
                ))
            })?;
        Ok((competition, entry_phase))
    }
}
