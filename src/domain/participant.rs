// ==========================================
// 青少年科创竞赛管理系统 - 选手与教练领域模型
// ==========================================
// 对齐: db.rs init_schema participants / coaches 表
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Participant - 选手主数据
// ==========================================
// 年级标签保留原始文本 (如 "Grade 7" / "R" / "N"),
// 归一化在 engine::eligibility_core 完成, 不落库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    // ===== 主键 =====
    pub participant_id: String, // 选手唯一标识

    // ===== 归属 =====
    pub school_id: String, // 关联 schools (FK)

    // ===== 基础信息 =====
    pub full_name: String,              // 姓名
    pub grade_label: String,            // 年级原始标签 (资格判定输入)
    pub date_of_birth: Option<NaiveDate>, // 出生日期 (年龄窗口判定输入)

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// Coach - 教练主数据
// ==========================================
// 只存身份信息; 资质/背景核查结论在挂队时录入
// team_coaches 行, 随队伍阶段冻结
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coach {
    // ===== 主键 =====
    pub coach_id: String, // 教练唯一标识

    // ===== 归属 =====
    pub school_id: String, // 关联 schools (FK)

    // ===== 基础信息 =====
    pub full_name: String,        // 姓名
    pub email: Option<String>,    // 联系邮箱

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}
