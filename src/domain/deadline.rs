// ==========================================
// 青少年科创竞赛管理系统 - 截止规则与通知领域模型
// ==========================================
// 对齐: db.rs init_schema registration_deadlines / notification_log 表
// ==========================================

use crate::domain::types::DeadlineType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RegistrationDeadline - 截止规则行
// ==========================================
// 按阶段名称关联 (历史遗留口径); category_id 可空 = 阶段默认行
// 解析顺序: 赛项专属行 > 阶段默认行 > 无行 (视为长期开放)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationDeadline {
    // ===== 主键 =====
    pub id: String, // 规则行唯一标识

    // ===== 适用范围 =====
    pub phase_name: String,          // 适用阶段名称
    pub category_id: Option<String>, // 适用赛项 (NULL=阶段默认)

    // ===== 截止定义 =====
    pub deadline_type: DeadlineType,    // 截止类型
    pub deadline_date: DateTime<Utc>,   // 截止时刻

    // ===== 执行开关 =====
    pub notification_sent: bool,  // 截止后总结通知是否已发
    pub enforcement_active: bool, // 是否参与执行器清理

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl RegistrationDeadline {
    /// 指定时刻是否已过截止
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline_date
    }

    /// 距截止剩余整天数 (已过截止返回负数)
    pub fn days_until(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline_date.date_naive() - now.date_naive()).num_days()
    }
}

// ==========================================
// NotificationLog - 通知发送台账
// ==========================================
// 去重红线: UNIQUE(recipient, notification_type, dedupe_day),
// 同一收件方同一类型同一自然日至多一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
    // ===== 主键 =====
    pub id: String, // 台账行唯一标识 (UUID)

    // ===== 去重键 =====
    pub recipient: String,         // 收件方标识 (学校)
    pub notification_type: String, // 通知类型 (截止类型派生)
    pub dedupe_day: NaiveDate,     // 去重自然日

    // ===== 内容 =====
    pub subject: String, // 标题
    pub body: String,    // 正文

    // ===== 审计字段 =====
    pub sent_at: DateTime<Utc>, // 发送时间
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(dt: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(dt, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn deadline_at(dt: &str) -> RegistrationDeadline {
        RegistrationDeadline {
            id: "D1".to_string(),
            phase_name: "校内赛".to_string(),
            category_id: None,
            deadline_type: DeadlineType::TeamRegistration,
            deadline_date: ts(dt),
            notification_sent: false,
            enforcement_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_deadline_is_past_boundary() {
        let d = deadline_at("2026-04-30 23:59:59");
        assert!(!d.is_past(ts("2026-04-30 23:59:59")));
        assert!(d.is_past(ts("2026-05-01 00:00:01")));
    }

    #[test]
    fn test_days_until_counts_calendar_days() {
        let d = deadline_at("2026-04-30 23:59:59");
        assert_eq!(d.days_until(ts("2026-04-23 08:00:00")), 7);
        assert_eq!(d.days_until(ts("2026-05-02 08:00:00")), -2);
    }
}
