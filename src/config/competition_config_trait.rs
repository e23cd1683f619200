// ==========================================
// 青少年科创竞赛管理系统 - 赛事配置读取 Trait
// ==========================================
// 职责: 定义资格/组队/晋级/截止引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::CompetitionMode;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// CompetitionConfigReader Trait
// ==========================================
// 用途: 引擎层所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait CompetitionConfigReader: Send + Sync {
    // ===== 容量配置 =====

    /// 获取每学校每赛项每阶段的队伍上限
    ///
    /// # 返回
    /// - i64: 队伍上限
    ///
    /// # 默认值
    /// - 1
    async fn get_category_team_limit(&self) -> Result<i64, Box<dyn Error>>;

    // ===== 队伍规模配置 =====

    /// 获取试点模式最小队员数
    ///
    /// # 默认值
    /// - 2
    async fn get_pilot_team_size_min(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取试点模式最大队员数
    ///
    /// # 默认值
    /// - 4
    async fn get_pilot_team_size_max(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取完整模式最小队员数
    ///
    /// # 默认值
    /// - 1
    async fn get_full_team_size_min(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取完整模式最大队员数（赛项未指定 team_size 时生效）
    ///
    /// # 默认值
    /// - 6
    async fn get_full_team_size_max(&self) -> Result<i32, Box<dyn Error>>;

    /// 获取指定模式下的默认队伍规模区间
    ///
    /// # 参数
    /// - mode: 竞赛模式
    ///
    /// # 返回
    /// - (i32, i32): (最小人数, 最大人数)
    ///
    /// # 逻辑
    /// 1. PILOT → (pilot_team_size_min, pilot_team_size_max)
    /// 2. FULL → (full_team_size_min, full_team_size_max)
    async fn get_team_size_bounds(
        &self,
        mode: CompetitionMode,
    ) -> Result<(i32, i32), Box<dyn Error>>;

    // ===== 教练配置 =====

    /// 获取每队在役教练上限
    ///
    /// # 默认值
    /// - 2
    async fn get_max_coaches_per_team(&self) -> Result<i32, Box<dyn Error>>;

    // ===== 截止与提醒配置 =====

    /// 获取报名临近截止预警窗口（天）
    ///
    /// # 默认值
    /// - 7
    async fn get_closing_window_days(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取截止提醒阈值天数列表（降序）
    ///
    /// # 返回
    /// - Vec<i64>: 距截止 N 天时发送提醒
    ///
    /// # 默认值
    /// - [7, 3, 1]
    async fn get_reminder_threshold_days(&self) -> Result<Vec<i64>, Box<dyn Error>>;

    // ===== 晋级名额配置 =====

    /// 获取试点模式晋级名额（阶段1 → 阶段3, 每赛项）
    ///
    /// # 默认值
    /// - 6
    async fn get_pilot_advance_quota(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取完整模式阶段1 → 阶段2 晋级名额（每赛项, 地区均衡）
    ///
    /// # 默认值
    /// - 15
    async fn get_full_phase1_advance_quota(&self) -> Result<i64, Box<dyn Error>>;

    /// 获取完整模式阶段2 → 阶段3 晋级名额（每赛项）
    ///
    /// # 默认值
    /// - 6
    async fn get_full_phase2_advance_quota(&self) -> Result<i64, Box<dyn Error>>;
}
