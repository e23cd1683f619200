// ==========================================
// 青少年科创竞赛管理系统 - 晋级台账领域模型
// ==========================================
// 对齐: db.rs init_schema phase_progressions 表
// ==========================================

use crate::domain::types::CompetitionMode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ProgressionRecord - 晋级台账行
// ==========================================
// 红线: 只追加, 永不更新或删除; 仓储层不提供改删接口
// 不变量: 每 (源队伍, 目标阶段) 至多一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionRecord {
    // ===== 主键 =====
    pub id: String, // 台账行唯一标识 (UUID)

    // ===== 晋级事实 =====
    pub team_id: String,       // 源队伍 (晋级前的阶段队伍)
    pub from_phase_id: String, // 来源阶段
    pub to_phase_id: String,   // 目标阶段

    // ===== 选拔结果 =====
    pub progression_date: NaiveDate,       // 晋级日期
    pub score: Option<f64>,                // 选拔时的累计评分
    pub rank_in_category: i32,             // 赛项内最终名次 (1 起)
    pub qualified: bool,                   // 是否晋级 (台账只记录晋级行)
    pub advancement_reason: Option<String>, // 晋级说明 (策略/均衡补位等)
    pub competition_type: CompetitionMode, // 晋级时赛事模式快照

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
}
