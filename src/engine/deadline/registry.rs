// ==========================================
// 青少年科创竞赛管理系统 - 报名状态机推导
// ==========================================
// 红线: 状态只由 (当前时刻, 已解析截止集, 收窄窗口) 纯函数推导,
//       不落库, 重算永不回退
// 解析顺序 (仓储层负责): 赛项专属行 > 阶段默认行 > 无行=长期开放
// ==========================================

use crate::domain::deadline::RegistrationDeadline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RegistrationState - 报名状态机
// ==========================================
// 名义生命周期: Open → Closing → ModificationOnly → Closed → Locked;
// 实际驻留状态取决于规则集里配了哪些截止类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "state")]
pub enum RegistrationState {
    /// 开放报名
    Open,
    /// 临近报名截止 (收窄窗口内)
    Closing { days_remaining: i64 },
    /// 报名已截止, 名册修改窗口也已关闭 (或未配置)
    Closed,
    /// 报名已截止, 仅允许名册修改
    ModificationOnly,
    /// 名册已锁定
    Locked,
}

impl RegistrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::Open => "OPEN",
            RegistrationState::Closing { .. } => "CLOSING",
            RegistrationState::Closed => "CLOSED",
            RegistrationState::ModificationOnly => "MODIFICATION_ONLY",
            RegistrationState::Locked => "LOCKED",
        }
    }

    /// 是否允许新建报名
    pub fn allows_registration(&self) -> bool {
        matches!(
            self,
            RegistrationState::Open | RegistrationState::Closing { .. }
        )
    }

    /// 是否允许名册修改
    pub fn allows_modification(&self) -> bool {
        matches!(
            self,
            RegistrationState::Open
                | RegistrationState::Closing { .. }
                | RegistrationState::ModificationOnly
        )
    }
}

// ==========================================
// ResolvedDeadlines - 已解析截止集
// ==========================================
// 每类截止独立解析 (find_applicable), 缺项 = 该维度不设限
#[derive(Debug, Clone, Default)]
pub struct ResolvedDeadlines {
    pub registration: Option<RegistrationDeadline>,
    pub modification: Option<RegistrationDeadline>,
    pub lock: Option<RegistrationDeadline>,
}

// ==========================================
// DeadlineRegistry - 状态机推导引擎
// ==========================================
pub struct DeadlineRegistry {
    // 无状态引擎，不需要注入依赖
}

impl DeadlineRegistry {
    pub fn new() -> Self {
        Self {}
    }

    /// 推导报名状态
    ///
    /// 判定次序 (严格度降序):
    /// 1) 已过锁定截止 → Locked
    /// 2) 已过报名截止: 修改窗口未过 → ModificationOnly, 否则 Closed
    /// 3) 报名截止进入收窄窗口 → Closing
    /// 4) 其余 (含完全未配置) → Open
    pub fn derive_state(
        &self,
        resolved: &ResolvedDeadlines,
        closing_window_days: i64,
        now: DateTime<Utc>,
    ) -> RegistrationState {
        if let Some(lock) = &resolved.lock {
            if lock.is_past(now) {
                return RegistrationState::Locked;
            }
        }

        if let Some(registration) = &resolved.registration {
            if registration.is_past(now) {
                let modification_open = resolved
                    .modification
                    .as_ref()
                    .map(|m| !m.is_past(now))
                    .unwrap_or(false);
                return if modification_open {
                    RegistrationState::ModificationOnly
                } else {
                    RegistrationState::Closed
                };
            }

            let days_remaining = registration.days_until(now);
            if days_remaining <= closing_window_days {
                return RegistrationState::Closing { days_remaining };
            }
        }

        RegistrationState::Open
    }
}

impl Default for DeadlineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
