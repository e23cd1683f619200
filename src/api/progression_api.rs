// ==========================================
// 青少年科创竞赛管理系统 - 晋级 API
// ==========================================
// 职责: 阶段选拔 + 晋级落库的批量编排
// 红线: 逐队结算, 单队失败不中断批量, 失败必须可对账
// 红线: 台账只追加, 重复晋级幂等跳过
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::category::Category;
use crate::domain::competition::Phase;
use crate::domain::progression::ProgressionRecord;
use crate::domain::types::CompetitionMode;
use crate::engine::progression::ProgressionExecutor;
use crate::engine::selector::{PhaseSelector, SelectedTeam};
use crate::engine::strategy::ProgressionStrategy;
use crate::repository::category_repo::CategoryRepository;
use crate::repository::competition_repo::{CompetitionRepository, PhaseRepository};
use crate::repository::progression_repo::ProgressionRepository;
use crate::repository::roster_repo::RosterRepository;
use crate::repository::team_repo::TeamRepository;

// ==========================================
// 晋级批量结果
// ==========================================

/// 单队晋级成功明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedTeam {
    pub source_team_id: String,
    pub new_team_id: String,
    pub new_team_code: String,
    pub category_id: String,
    pub rank: i32,
    pub score: Option<f64>,
}

/// 单队晋级失败明细（correlation_id 用于日志对账）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAdvancement {
    pub source_team_id: String,
    pub category_id: String,
    pub rank: i32,
    pub correlation_id: String,
    pub reason: String,
}

/// 晋级批量结果（advanced + failed + skipped = total）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementOutcome {
    pub from_phase_id: String,
    pub to_phase_id: String,
    pub strategy: ProgressionStrategy,
    pub advanced: Vec<AdvancedTeam>,
    pub failed: Vec<FailedAdvancement>,
    /// 已有台账行, 幂等跳过数
    pub skipped: usize,
    /// 选拔入选总数
    pub total: usize,
}

// ==========================================
// ProgressionApi - 晋级 API
// ==========================================

/// 晋级API
///
/// 职责：
/// 1. 解析阶段晋级策略与目标阶段
/// 2. 调用选拔引擎产出入选名单
/// 3. 逐队物化并落库（单队一个事务）
pub struct ProgressionApi {
    competition_repo: Arc<CompetitionRepository>,
    phase_repo: Arc<PhaseRepository>,
    category_repo: Arc<CategoryRepository>,
    team_repo: Arc<TeamRepository>,
    roster_repo: Arc<RosterRepository>,
    progression_repo: Arc<ProgressionRepository>,
    config: Arc<ConfigManager>,
    selector: PhaseSelector,
    executor: ProgressionExecutor,
}

impl ProgressionApi {
    /// 创建新的ProgressionApi实例
    ///
    /// # 参数
    /// - competition_repo: 赛事仓储
    /// - phase_repo: 阶段仓储
    /// - category_repo: 赛项仓储
    /// - team_repo: 队伍仓储
    /// - roster_repo: 名册仓储
    /// - progression_repo: 晋级台账仓储
    /// - config: 配置读取器（名额默认值）
    pub fn new(
        competition_repo: Arc<CompetitionRepository>,
        phase_repo: Arc<PhaseRepository>,
        category_repo: Arc<CategoryRepository>,
        team_repo: Arc<TeamRepository>,
        roster_repo: Arc<RosterRepository>,
        progression_repo: Arc<ProgressionRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            competition_repo,
            phase_repo,
            category_repo,
            team_repo,
            roster_repo,
            progression_repo,
            config,
            selector: PhaseSelector::new(),
            executor: ProgressionExecutor::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 选拔并晋级指定阶段的已批准队伍
    ///
    /// # 流程
    /// 1. 按 (赛事模式, 阶段序号) 解析晋级策略
    /// 2. 目标容量: 阶段配置优先, 缺省回落策略默认名额
    /// 3. 选拔引擎按赛项产出入选名单
    /// 4. 逐队物化落库, 已有台账行的幂等跳过
    ///
    /// # 返回
    /// - Ok(AdvancementOutcome): 逐队结算结果, 永不整批失败
    #[instrument(skip(self), fields(phase_id = %phase_id))]
    pub async fn select_and_advance(
        &self,
        phase_id: &str,
        progression_date: NaiveDate,
    ) -> ApiResult<AdvancementOutcome> {
        let _perf = crate::perf::PerfGuard::new("api.select_and_advance");

        if phase_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("阶段ID不能为空".to_string()));
        }

        // === 步骤 1: 解析策略与目标阶段 ===
        let from_phase = self
            .phase_repo
            .find_by_id(phase_id)?
            .ok_or_else(|| ApiError::NotFound(format!("阶段(id={})不存在", phase_id)))?;
        let competition = self
            .competition_repo
            .find_by_id(&from_phase.competition_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("赛事(id={})不存在", from_phase.competition_id))
            })?;

        let strategy = ProgressionStrategy::for_step(competition.mode, from_phase.phase_order)
            .ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "阶段 {} (序号 {}) 在 {} 模式下不可晋级",
                    from_phase.name, from_phase.phase_order, competition.mode
                ))
            })?;
        let to_phase = self
            .phase_repo
            .find_by_order(&competition.competition_id, strategy.to_phase_order())?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "赛事 {} 未配置序号 {} 的目标阶段",
                    competition.competition_id,
                    strategy.to_phase_order()
                ))
            })?;

        // === 步骤 2: 容量与均衡 ===
        let capacity = match to_phase.capacity_per_category {
            Some(cap) => cap,
            None => strategy
                .default_quota(self.config.as_ref())
                .await
                .map_err(|e| ApiError::ConfigurationError(e.to_string()))?,
        };
        let balanced = strategy.district_balanced() || to_phase.district_balancing;

        // === 步骤 3: 选拔 ===
        let candidates = self.team_repo.list_approved_for_selection(phase_id)?;
        let selections = self.selector.select(&candidates, Some(capacity), balanced);

        info!(
            strategy = %strategy,
            to_phase_id = %to_phase.phase_id,
            capacity = capacity,
            balanced = balanced,
            candidates = candidates.len(),
            categories = selections.len(),
            "阶段选拔完成, 开始逐队落库"
        );

        // === 步骤 4: 逐队落库 ===
        let mut outcome = AdvancementOutcome {
            from_phase_id: from_phase.phase_id.clone(),
            to_phase_id: to_phase.phase_id.clone(),
            strategy,
            advanced: Vec::new(),
            failed: Vec::new(),
            skipped: 0,
            total: 0,
        };

        for selection in &selections {
            outcome.total += selection.selected.len();

            let Some(category) = self.category_repo.find_by_id(&selection.category_id)? else {
                for sel in &selection.selected {
                    self.record_failure(
                        &mut outcome,
                        sel,
                        &selection.category_id,
                        ApiError::NotFound(format!("赛项(id={})不存在", selection.category_id)),
                    );
                }
                continue;
            };

            for sel in &selection.selected {
                match self.advance_one(sel, &category, &to_phase, strategy, competition.mode, progression_date)
                {
                    Ok(Some(advanced)) => outcome.advanced.push(advanced),
                    Ok(None) => outcome.skipped += 1,
                    Err(e) => self.record_failure(&mut outcome, sel, &category.category_id, e),
                }
            }
        }

        info!(
            advanced = outcome.advanced.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped,
            total = outcome.total,
            "晋级批量完成"
        );
        Ok(outcome)
    }

    /// 查询队伍的晋级台账（时间升序）
    ///
    /// 台账以源队伍为键: 晋级产生的新队伍有自己的 team_id,
    /// 新队伍再晋级时以新 id 另起台账行
    #[instrument(skip(self), fields(team_id = %team_id))]
    pub async fn team_history(&self, team_id: &str) -> ApiResult<Vec<ProgressionRecord>> {
        if team_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("队伍ID不能为空".to_string()));
        }
        self.team_repo
            .find_by_id(team_id)?
            .ok_or_else(|| ApiError::NotFound(format!("队伍(id={})不存在", team_id)))?;

        Ok(self.progression_repo.list_by_team(team_id)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 单队晋级（Ok(None) = 已有台账行, 幂等跳过）
    fn advance_one(
        &self,
        selected: &SelectedTeam,
        category: &Category,
        to_phase: &Phase,
        strategy: ProgressionStrategy,
        mode: CompetitionMode,
        progression_date: NaiveDate,
    ) -> ApiResult<Option<AdvancedTeam>> {
        if self
            .progression_repo
            .exists(&selected.team_id, &to_phase.phase_id)?
        {
            return Ok(None);
        }

        let source = self
            .team_repo
            .find_by_id(&selected.team_id)?
            .ok_or_else(|| ApiError::NotFound(format!("源队伍(id={})不存在", selected.team_id)))?;
        let roster = self.roster_repo.list_active_participants(&source.team_id)?;
        let coaches = self.roster_repo.list_active_coaches(&source.team_id)?;

        let bundle = self.executor.materialize(
            &source,
            &roster,
            &coaches,
            selected,
            &category.code,
            to_phase,
            strategy,
            mode,
            progression_date,
        );

        // 单队一个事务, 失败附 correlation_id 供对账
        self.progression_repo
            .record_advancement(
                &bundle.team,
                &bundle.participants,
                &bundle.coaches,
                &bundle.record,
            )
            .map_err(|e| ApiError::TransactionFailure {
                correlation_id: Uuid::new_v4().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(AdvancedTeam {
            source_team_id: selected.team_id.clone(),
            new_team_id: bundle.team.team_id.clone(),
            new_team_code: bundle.team.team_code.clone(),
            category_id: category.category_id.clone(),
            rank: selected.rank,
            score: selected.score,
        }))
    }

    fn record_failure(
        &self,
        outcome: &mut AdvancementOutcome,
        selected: &SelectedTeam,
        category_id: &str,
        error: ApiError,
    ) {
        let (correlation_id, reason) = match error {
            ApiError::TransactionFailure {
                correlation_id,
                reason,
            } => (correlation_id, reason),
            other => (Uuid::new_v4().to_string(), other.to_string()),
        };

        warn!(
            correlation_id = %correlation_id,
            source_team_id = %selected.team_id,
            category_id = %category_id,
            rank = selected.rank,
            reason = %reason,
            "单队晋级失败, 批量继续"
        );
        outcome.failed.push(FailedAdvancement {
            source_team_id: selected.team_id.clone(),
            category_id: category_id.to_string(),
            rank: selected.rank,
            correlation_id,
            reason,
        });
    }
}
