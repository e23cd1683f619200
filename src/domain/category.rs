// ==========================================
// 青少年科创竞赛管理系统 - 赛项领域模型
// ==========================================
// 对齐: db.rs init_schema categories 表
// ==========================================

use crate::domain::types::ParticipantRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Category - 赛项 (竞赛项目类别)
// ==========================================
// 红线: 阶段进行中赛项规则不可变更 (调用方负责)
// 年级/年龄窗口为 "X-Y" 文本, 解析在 eligibility_core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    // ===== 主键与关联 =====
    pub category_id: String,    // 赛项唯一标识
    pub competition_id: String, // 关联 competitions (FK)

    // ===== 基础信息 =====
    pub name: String,        // 赛项名称
    pub code: String,        // 赛项代码 (队伍编号前缀)
    pub display_order: i32,  // 展示顺序 (可报名摘要排序依据)

    // ===== 资格窗口 ("X-Y", 可空=不限) =====
    pub grade_range: Option<String>, // 年级窗口, 如 "4-7" / "R-3"
    pub age_range: Option<String>,   // 年龄窗口, 如 "9-14"

    // ===== 队伍规模 (可空=用模式默认) =====
    pub min_participants: Option<i32>, // 最小队员数
    pub max_participants: Option<i32>, // 最大队员数
    pub team_size: Option<i32>,        // 完整模式默认上限 (max 缺省时生效)

    // ===== 组队结构规则 (JSON 列反序列化) =====
    pub composition_rules: Option<CompositionRules>,

    // ===== 状态 =====
    pub is_active: bool, // 是否开放报名

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// CompositionRules - 组队结构规则 (类型化)
// ==========================================
// 存储: categories.composition_rules JSON 列
// 未知字段拒绝 (deny_unknown_fields), 写错键名在解析期暴露
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositionRules {
    /// 各角色最低人数要求 (缺省 = 无要求)
    #[serde(default)]
    pub required_roles: BTreeMap<ParticipantRole, u32>,

    /// 各角色人数上限 (缺省 = 不限)
    #[serde(default)]
    pub max_per_role: BTreeMap<ParticipantRole, u32>,

    /// 是否要求恰好一名在役队长
    #[serde(default = "default_require_team_leader")]
    pub require_team_leader: bool,
}

fn default_require_team_leader() -> bool {
    true
}

impl Default for CompositionRules {
    fn default() -> Self {
        Self {
            required_roles: BTreeMap::new(),
            max_per_role: BTreeMap::new(),
            require_team_leader: true,
        }
    }
}

impl CompositionRules {
    /// 从 JSON 列文本解析 (空白文本视为无规则)
    pub fn from_json(raw: &str) -> Result<Option<Self>, serde_json::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }

    /// 序列化为 JSON 列文本
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_rules_parse_full() {
        let raw = r#"{
            "required_roles": {"PROGRAMMER": 1, "BUILDER": 1},
            "max_per_role": {"TEAM_LEADER": 1},
            "require_team_leader": true
        }"#;
        let rules = CompositionRules::from_json(raw).unwrap().unwrap();
        assert_eq!(rules.required_roles.get(&ParticipantRole::Programmer), Some(&1));
        assert_eq!(rules.max_per_role.get(&ParticipantRole::TeamLeader), Some(&1));
        assert!(rules.require_team_leader);
    }

    #[test]
    fn test_composition_rules_defaults() {
        let rules = CompositionRules::from_json("{}").unwrap().unwrap();
        assert!(rules.required_roles.is_empty());
        assert!(rules.max_per_role.is_empty());
        assert!(rules.require_team_leader);
    }

    #[test]
    fn test_composition_rules_empty_column_is_none() {
        assert!(CompositionRules::from_json("").unwrap().is_none());
        assert!(CompositionRules::from_json("  ").unwrap().is_none());
        assert!(CompositionRules::from_json("null").unwrap().is_none());
    }

    #[test]
    fn test_composition_rules_unknown_key_rejected() {
        let raw = r#"{"required_rolez": {}}"#;
        assert!(CompositionRules::from_json(raw).is_err());
    }

    #[test]
    fn test_composition_rules_roundtrip() {
        let mut rules = CompositionRules::default();
        rules.required_roles.insert(ParticipantRole::Designer, 2);
        let json = rules.to_json().unwrap();
        let back = CompositionRules::from_json(&json).unwrap().unwrap();
        assert_eq!(back, rules);
    }
}
