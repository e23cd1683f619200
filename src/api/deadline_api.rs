// ==========================================
// 青少年科创竞赛管理系统 - 截止 API
// ==========================================
// 职责: 报名状态查询 + 截止执行扫描的入口
// 红线: 状态由纯函数推导, 本层只负责解析规则行与装配视图
// ==========================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::config::CompetitionConfigReader;
use crate::domain::types::DeadlineType;
use crate::engine::deadline::{
    DeadlineEnforcer, DeadlineRegistry, EnforcementOutcome, RegistrationState, ResolvedDeadlines,
};
use crate::repository::competition_repo::{CompetitionRepository, PhaseRepository};
use crate::repository::deadline_repo::DeadlineRepository;

// ==========================================
// 报名状态视图
// ==========================================

/// 报名状态查询结果 (入口阶段口径)
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatusView {
    pub phase_id: String,
    pub phase_name: String,
    /// None = 阶段默认规则口径
    pub category_id: Option<String>,
    pub state: RegistrationState,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub modification_deadline: Option<DateTime<Utc>>,
    pub lock_deadline: Option<DateTime<Utc>>,
    pub closing_window_days: i64,
}

// ==========================================
// DeadlineApi - 截止 API
// ==========================================

/// 截止API
///
/// 职责：
/// 1. 解析当前入口阶段适用的截止规则集并推导报名状态
/// 2. 触发截止执行扫描 (过期/锁定/标记/提醒)
pub struct DeadlineApi {
    competition_repo: Arc<CompetitionRepository>,
    phase_repo: Arc<PhaseRepository>,
    deadline_repo: Arc<DeadlineRepository>,
    enforcer: Arc<DeadlineEnforcer<ConfigManager>>,
    config: Arc<ConfigManager>,
    registry: DeadlineRegistry,
}

impl DeadlineApi {
    /// 创建新的DeadlineApi实例
    ///
    /// # 参数
    /// - competition_repo: 赛事仓储
    /// - phase_repo: 阶段仓储
    /// - deadline_repo: 截止规则仓储
    /// - enforcer: 截止执行引擎 (含提醒投递通道)
    /// - config: 配置读取器 (收窄窗口天数)
    pub fn new(
        competition_repo: Arc<CompetitionRepository>,
        phase_repo: Arc<PhaseRepository>,
        deadline_repo: Arc<DeadlineRepository>,
        enforcer: Arc<DeadlineEnforcer<ConfigManager>>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            competition_repo,
            phase_repo,
            deadline_repo,
            enforcer,
            config,
            registry: DeadlineRegistry::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 查询当前活动赛事入口阶段的报名状态
    ///
    /// 规则解析: 赛项专属行 > 阶段默认行 > 无行 (该维度不设限);
    /// 状态由 (当前时刻, 已解析截止集, 收窄窗口) 纯函数推导
    ///
    /// # 参数
    /// - category_id: Some=按赛项口径解析, None=阶段默认口径
    /// - now: 判定时刻 (调用方注入)
    #[instrument(skip(self))]
    pub async fn registration_status(
        &self,
        category_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<RegistrationStatusView> {
        let competition = self
            .competition_repo
            .find_active()?
            .ok_or_else(|| ApiError::NotFound("当前无活动赛事".to_string()))?;
        let entry_phase = self
            .phase_repo
            .find_entry_phase(&competition.competition_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("赛事 {} 未配置入口阶段", competition.competition_id))
            })?;

        // === 步骤 1: 逐类解析适用截止行 ===
        let resolved = ResolvedDeadlines {
            registration: self.deadline_repo.find_applicable(
                &entry_phase.name,
                DeadlineType::TeamRegistration,
                category_id,
            )?,
            modification: self.deadline_repo.find_applicable(
                &entry_phase.name,
                DeadlineType::Modification,
                category_id,
            )?,
            lock: self.deadline_repo.find_applicable(
                &entry_phase.name,
                DeadlineType::Lock,
                category_id,
            )?,
        };

        // === 步骤 2: 推导状态 ===
        let closing_window_days = self
            .config
            .get_closing_window_days()
            .await
            .map_err(|e| ApiError::ConfigurationError(e.to_string()))?;
        let state = self.registry.derive_state(&resolved, closing_window_days, now);

        Ok(RegistrationStatusView {
            phase_id: entry_phase.phase_id.clone(),
            phase_name: entry_phase.name.clone(),
            category_id: category_id.map(str::to_string),
            state,
            registration_deadline: resolved.registration.map(|d| d.deadline_date),
            modification_deadline: resolved.modification.map(|d| d.deadline_date),
            lock_deadline: resolved.lock.map(|d| d.deadline_date),
            closing_window_days,
        })
    }

    /// 执行一轮截止扫描
    ///
    /// 幂等: 已处理的队伍/已发的当日提醒不会重复命中,
    /// 调度器可放心重复触发
    ///
    /// # 返回
    /// - Ok(EnforcementOutcome): 本轮过期/锁定/标记/提醒计数
    #[instrument(skip(self))]
    pub async fn enforce_deadlines(&self, now: DateTime<Utc>) -> ApiResult<EnforcementOutcome> {
        self.enforcer
            .run_sweep(now)
            .await
            .map_err(|e| ApiError::InternalError(format!("截止扫描执行失败: {}", e)))
    }
}
