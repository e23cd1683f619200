// ==========================================
// 青少年科创竞赛管理系统 - 晋级策略定义
// ==========================================
// 用途：
// - PhaseSelector 按策略决定选拔容量与是否地区均衡；
// - ProgressionExecutor 复用相同策略参数落库, 保证结果可复现。

use crate::config::CompetitionConfigReader;
use crate::domain::types::CompetitionMode;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 晋级策略 (由竞赛模式 + 出发阶段唯一确定)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionStrategy {
    /// 试点模式: 校内赛直通决赛 (1→3), 不做地区均衡
    PilotDirect,
    /// 完整模式: 校内赛晋级区域赛 (1→2), 地区均衡选拔
    FullRegional,
    /// 完整模式: 区域赛晋级决赛 (2→3), 纯排名选拔
    FullFinal,
}

impl ProgressionStrategy {
    /// 按 (模式, 出发阶段序号) 解析晋级步骤
    ///
    /// 试点: 仅 1→3; 完整: 1→2 与 2→3; 其余组合不可晋级
    pub fn for_step(mode: CompetitionMode, from_phase_order: i32) -> Option<ProgressionStrategy> {
        match (mode, from_phase_order) {
            (CompetitionMode::Pilot, 1) => Some(ProgressionStrategy::PilotDirect),
            (CompetitionMode::Full, 1) => Some(ProgressionStrategy::FullRegional),
            (CompetitionMode::Full, 2) => Some(ProgressionStrategy::FullFinal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressionStrategy::PilotDirect => "pilot_direct",
            ProgressionStrategy::FullRegional => "full_regional",
            ProgressionStrategy::FullFinal => "full_final",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            ProgressionStrategy::PilotDirect => "试点直通决赛",
            ProgressionStrategy::FullRegional => "区域均衡晋级",
            ProgressionStrategy::FullFinal => "决赛排名晋级",
        }
    }

    /// 目的阶段序号
    pub fn to_phase_order(&self) -> i32 {
        match self {
            ProgressionStrategy::PilotDirect => 3,
            ProgressionStrategy::FullRegional => 2,
            ProgressionStrategy::FullFinal => 3,
        }
    }

    /// 策略本身是否要求地区均衡 (阶段行上的开关可在此之上叠加)
    pub fn district_balanced(&self) -> bool {
        matches!(self, ProgressionStrategy::FullRegional)
    }

    /// 目的阶段未设容量时采用的默认晋级名额
    pub async fn default_quota<C>(&self, config: &C) -> Result<i64, Box<dyn Error>>
    where
        C: CompetitionConfigReader,
    {
        match self {
            ProgressionStrategy::PilotDirect => config.get_pilot_advance_quota().await,
            ProgressionStrategy::FullRegional => config.get_full_phase1_advance_quota().await,
            ProgressionStrategy::FullFinal => config.get_full_phase2_advance_quota().await,
        }
    }
}

impl std::fmt::Display for ProgressionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProgressionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pilot_direct" | "pilot-direct" => Ok(ProgressionStrategy::PilotDirect),
            "full_regional" | "full-regional" => Ok(ProgressionStrategy::FullRegional),
            "full_final" | "full-final" => Ok(ProgressionStrategy::FullFinal),
            other => Err(format!("未知晋级策略: {}", other)),
        }
    }
}
