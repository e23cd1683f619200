// ==========================================
// 青少年科创竞赛管理系统 - 赛项容量校验引擎
// ==========================================
// 红线: 预检结论仅供提示, 并发场景以存储层唯一索引为准
// ==========================================
// 职责: (学校, 赛项, 阶段) 名额判定 + 学校可报名摘要
// 输入: 既有队伍计数 (仓储层查出) + 配置名额
// 输出: CapacityVerdict / CategoryAvailability 列表
// ==========================================

use crate::config::CompetitionConfigReader;
use crate::domain::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// CapacityVerdict - 名额判定结论
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityVerdict {
    /// 是否还可报名
    pub can_register: bool,

    /// 既有非 CANCELLED 队伍数
    pub existing_count: i64,

    /// 配置名额上限
    pub limit: i64,

    /// 剩余名额 (不为负)
    pub remaining_slots: i64,

    /// 名额已满时的说明
    pub violation_reason: Option<String>,
}

// ==========================================
// CategoryAvailability - 学校可报名摘要行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAvailability {
    pub category_id: String,
    pub category_name: String,
    pub category_code: String,
    pub existing_count: i64,
    pub limit: i64,
    pub remaining_slots: i64,
    pub can_register: bool,
}

// ==========================================
// CapacityValidator - 赛项容量校验引擎
// ==========================================
pub struct CapacityValidator<C>
where
    C: CompetitionConfigReader,
{
    config: Arc<C>,
}

impl<C> CapacityValidator<C>
where
    C: CompetitionConfigReader,
{
    /// 创建新的 CapacityValidator 实例
    ///
    /// # 参数
    /// - config: 配置读取器
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// 判定 (学校, 赛项, 阶段) 是否还有报名名额
    ///
    /// # 参数
    /// - existing_count: 该键下既有非 CANCELLED 队伍数
    ///
    /// # 返回
    /// - CapacityVerdict: 判定结论
    #[instrument(skip(self))]
    pub async fn check(&self, existing_count: i64) -> Result<CapacityVerdict, Box<dyn Error>> {
        let limit = self.config.get_category_team_limit().await?;

        let remaining_slots = (limit - existing_count).max(0);
        let can_register = existing_count < limit;
        let violation_reason = if can_register {
            None
        } else {
            Some(format!(
                "学校在该赛项的报名名额已满: {}/{}",
                existing_count, limit
            ))
        };

        Ok(CapacityVerdict {
            can_register,
            existing_count,
            limit,
            remaining_slots,
            violation_reason,
        })
    }

    /// 生成学校的赛项可报名摘要
    ///
    /// # 参数
    /// - categories: 赛事下启用的赛项 (已按 display_order 排序)
    /// - counts: category_id → 既有非 CANCELLED 队伍数
    ///
    /// # 排序
    /// 1. 可报名的在前
    /// 2. 其后按 display_order, 再按名称
    #[instrument(skip(self, categories, counts))]
    pub async fn summarize_availability(
        &self,
        categories: &[Category],
        counts: &HashMap<String, i64>,
    ) -> Result<Vec<CategoryAvailability>, Box<dyn Error>> {
        let limit = self.config.get_category_team_limit().await?;

        let mut rows: Vec<(i32, CategoryAvailability)> = categories
            .iter()
            .map(|category| {
                let existing_count = counts.get(&category.category_id).copied().unwrap_or(0);
                let can_register = existing_count < limit;
                (
                    category.display_order,
                    CategoryAvailability {
                        category_id: category.category_id.clone(),
                        category_name: category.name.clone(),
                        category_code: category.code.clone(),
                        existing_count,
                        limit,
                        remaining_slots: (limit - existing_count).max(0),
                        can_register,
                    },
                )
            })
            .collect();

        rows.sort_by(|(order_a, a), (order_b, b)| {
            b.can_register
                .cmp(&a.can_register)
                .then(order_a.cmp(order_b))
                .then(a.category_name.cmp(&b.category_name))
        });

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CompetitionMode;
    use async_trait::async_trait;
    use chrono::Utc;

    struct MockConfigReader {
        limit: i64,
    }

    #[async_trait]
    impl CompetitionConfigReader for MockConfigReader {
        async fn get_category_team_limit(&self) -> Result<i64, Box<dyn Error>> {
            Ok(self.limit)
        }
        async fn get_pilot_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
            Ok(2)
        }
        async fn get_pilot_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
            Ok(4)
        }
        async fn get_full_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
            Ok(1)
        }
        async fn get_full_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
            Ok(6)
        }
        async fn get_team_size_bounds(
            &self,
            mode: CompetitionMode,
        ) -> Result<(i32, i32), Box<dyn Error>> {
            match mode {
                CompetitionMode::Pilot => Ok((2, 4)),
                CompetitionMode::Full => Ok((1, 6)),
            }
        }
        async fn get_max_coaches_per_team(&self) -> Result<i32, Box<dyn Error>> {
            Ok(2)
        }
        async fn get_closing_window_days(&self) -> Result<i64, Box<dyn Error>> {
            Ok(7)
        }
        async fn get_reminder_threshold_days(&self) -> Result<Vec<i64>, Box<dyn Error>> {
            Ok(vec![7, 3, 1])
        }
        async fn get_pilot_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
            Ok(6)
        }
        async fn get_full_phase1_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
            Ok(15)
        }
        async fn get_full_phase2_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
            Ok(6)
        }
    }

    fn category(id: &str, name: &str, order: i32) -> Category {
        Category {
            category_id: id.to_string(),
            competition_id: "CMP001".to_string(),
            name: name.to_string(),
            code: id.to_string(),
            display_order: order,
            grade_range: None,
            age_range: None,
            min_participants: None,
            max_participants: None,
            team_size: None,
            composition_rules: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_check_slot_available() {
        let validator = CapacityValidator::new(Arc::new(MockConfigReader { limit: 1 }));
        let verdict = validator.check(0).await.unwrap();

        assert!(verdict.can_register);
        assert_eq!(verdict.remaining_slots, 1);
        assert!(verdict.violation_reason.is_none());
    }

    #[tokio::test]
    async fn test_check_slot_exhausted() {
        let validator = CapacityValidator::new(Arc::new(MockConfigReader { limit: 1 }));
        let verdict = validator.check(1).await.unwrap();

        assert!(!verdict.can_register);
        assert_eq!(verdict.remaining_slots, 0);
        assert!(verdict.violation_reason.is_some());
    }

    #[tokio::test]
    async fn test_check_over_limit_clamps_remaining() {
        let validator = CapacityValidator::new(Arc::new(MockConfigReader { limit: 1 }));
        let verdict = validator.check(3).await.unwrap();

        assert!(!verdict.can_register);
        assert_eq!(verdict.remaining_slots, 0); // 不出现负数
    }

    #[tokio::test]
    async fn test_summarize_availability_ordering() {
        let validator = CapacityValidator::new(Arc::new(MockConfigReader { limit: 1 }));
        let categories = vec![
            category("C1", "智能探索", 1),
            category("C2", "创意编程", 2),
            category("C3", "结构工程", 3),
        ];
        let mut counts = HashMap::new();
        counts.insert("C1".to_string(), 1i64); // 已满

        let rows = validator
            .summarize_availability(&categories, &counts)
            .await
            .unwrap();

        // 可报名的在前 (C2, C3), 已满的垫后 (C1)
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].category_id, "C2");
        assert_eq!(rows[1].category_id, "C3");
        assert_eq!(rows[2].category_id, "C1");
        assert!(!rows[2].can_register);
    }
}
