// ==========================================
// 青少年科创竞赛管理系统 - 提醒投递抽象
// ==========================================
// 职责: 定义截止提醒投递 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 外层 (邮件/短信/站内信) 实现适配器
// 去重不在此层: notification_log 的唯一键负责同日去重
// ==========================================

use crate::domain::types::DeadlineType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Mutex;

// ==========================================
// 提醒内容
// ==========================================

/// 截止提醒 (投递单元)
///
/// 去重键三元组 = (recipient, notification_type(), 发送日),
/// 由 DeadlineEnforcer 在落台账时施加
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderNotice {
    /// 收件方标识 (学校)
    pub recipient: String,
    /// 触发提醒的截止类型
    pub deadline_type: DeadlineType,
    /// 适用阶段名称
    pub phase_name: String,
    /// 适用赛项 (None=阶段默认规则)
    pub category_id: Option<String>,
    /// 截止时刻
    pub deadline_date: DateTime<Utc>,
    /// 距截止剩余整天数
    pub days_remaining: i64,
    /// 标题
    pub subject: String,
    /// 正文
    pub body: String,
}

impl ReminderNotice {
    /// 台账去重用的通知类型标识
    pub fn notification_type(&self) -> String {
        format!("DEADLINE_{}", self.deadline_type.to_db_str())
    }
}

// ==========================================
// 投递 Trait
// ==========================================

/// 提醒投递者 Trait
///
/// Engine 层定义, 外层实现; 单次投递失败只影响该收件方,
/// 执行器继续处理其余提醒
pub trait ReminderSink: Send + Sync {
    /// 投递一条提醒
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作投递者
///
/// 用于不需要实际投递的场景 (干跑/单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpReminderSink;

impl ReminderSink for NoOpReminderSink {
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpReminderSink: 跳过投递 - recipient={}, type={}, days_remaining={}",
            notice.recipient,
            notice.notification_type(),
            notice.days_remaining
        );
        Ok(())
    }
}

/// 记录式投递者
///
/// 把投递内容留在内存里供断言/演示回放
#[derive(Debug, Default)]
pub struct RecordingReminderSink {
    delivered: Mutex<Vec<ReminderNotice>>,
}

impl RecordingReminderSink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// 已投递内容快照
    pub fn delivered(&self) -> Vec<ReminderNotice> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl ReminderSink for RecordingReminderSink {
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.delivered
            .lock()
            .map_err(|e| format!("投递记录锁异常: {}", e))?
            .push(notice.clone());
        Ok(())
    }
}
