// ==========================================
// 青少年科创竞赛管理系统 - 赛事与阶段领域模型
// ==========================================
// 对齐: db.rs init_schema competitions / phases 表
// ==========================================

use crate::domain::types::CompetitionMode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Competition - 赛事 (一个赛季的竞赛)
// ==========================================
// 模式决定晋级路径: 试点 1→3, 完整 1→2→3
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    // ===== 主键 =====
    pub competition_id: String, // 赛事唯一标识

    // ===== 基础信息 =====
    pub name: String,          // 赛事名称
    pub season_year: i32,      // 赛季年份
    pub mode: CompetitionMode, // 竞赛模式 (PILOT/FULL)

    // ===== 队伍规模覆盖 (可空=不覆盖, 见 composition 解析顺序) =====
    pub team_size_min: Option<i32>, // 赛事级最小队员数覆盖
    pub team_size_max: Option<i32>, // 赛事级最大队员数覆盖

    // ===== 状态 =====
    pub is_active: bool, // 是否当前活动赛事

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// Phase - 竞赛阶段 (校内赛/区域赛/决赛)
// ==========================================
// phase_order 决定晋级方向; 容量可空=不限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    // ===== 主键与关联 =====
    pub phase_id: String,       // 阶段唯一标识
    pub competition_id: String, // 关联 competitions (FK)

    // ===== 基础信息 =====
    pub name: String,     // 阶段名称 (截止规则按名称关联)
    pub phase_order: i32, // 阶段序号 (1=校内, 2=区域, 3=决赛)

    // ===== 晋级约束 =====
    pub capacity_per_category: Option<i64>, // 每赛项晋级容量上限 (NULL=不限)
    pub district_balancing: bool,           // 是否启用地区均衡选拔

    // ===== 活动窗口 =====
    pub starts_on: Option<NaiveDate>, // 阶段开始日期
    pub ends_on: Option<NaiveDate>,   // 阶段结束日期

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}
