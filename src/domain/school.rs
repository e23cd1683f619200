// ==========================================
// 青少年科创竞赛管理系统 - 学校领域模型
// ==========================================
// 对齐: db.rs init_schema schools 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// School - 学校主数据
// ==========================================
// 地区 (district) 驱动晋级选拔的地区均衡分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    // ===== 主键 =====
    pub school_id: String, // 学校唯一标识

    // ===== 基础信息 =====
    pub name: String,             // 学校名称
    pub district: String,         // 所属地区 (晋级均衡维度)
    pub contact_email: Option<String>, // 联系邮箱 (截止提醒收件依据)

    // ===== 状态 =====
    pub is_active: bool, // 是否在册

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}
