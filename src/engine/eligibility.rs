// ==========================================
// 青少年科创竞赛管理系统 - 选手资格引擎
// ==========================================
// 红线: 不直接写库, 只计算并返回资格结论
// 放行口径: 赛项区间配置坏 → 按不限处理并告警;
//           选手自身数据缺失/坏 → 判不符 (区间存在时)
// ==========================================
// 职责: 年级/年龄/学校归属/重复报名四项检查
// 输入: participant + category + 队伍学校 + 既有占位
// 输出: EligibilityVerdict (结论 + 原因集 + 说明)
// ==========================================

use crate::domain::category::Category;
use crate::domain::participant::Participant;
use crate::domain::types::IneligibilityReason;
use crate::engine::eligibility_core::{EligibilityCore, RangeBounds};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

// ==========================================
// EligibilityVerdict - 资格检查结论
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    /// 是否具备参赛资格
    pub eligible: bool,

    /// 不符原因集 (为空即符合)
    pub reasons: Vec<IneligibilityReason>,

    /// 人读说明 (含放行告警说明)
    pub details: Vec<String>,
}

impl EligibilityVerdict {
    fn pass(details: Vec<String>) -> Self {
        Self {
            eligible: true,
            reasons: Vec::new(),
            details,
        }
    }
}

// ==========================================
// EligibilityEngine - 选手资格引擎
// ==========================================
// 无状态引擎, 规则全部来自赛项行与显式入参
pub struct EligibilityEngine;

impl EligibilityEngine {
    /// 创建新的选手资格引擎
    pub fn new() -> Self {
        Self
    }

    /// 评估单个选手在某赛项的参赛资格
    ///
    /// # 参数
    /// - participant: 选手
    /// - category: 赛项 (年级/年龄区间挂在赛项上)
    /// - team_school_id: 报名队伍所属学校
    /// - existing_membership: 选手在同 (赛项, 阶段) 的既有在役队伍
    /// - today: 基准日期 (年龄按此日计算)
    #[instrument(skip(self, participant, category), fields(
        participant_id = %participant.participant_id,
        category_id = %category.category_id,
    ))]
    pub fn evaluate(
        &self,
        participant: &Participant,
        category: &Category,
        team_school_id: &str,
        existing_membership: Option<&str>,
        today: NaiveDate,
    ) -> EligibilityVerdict {
        let mut reasons = Vec::new();
        let mut details = Vec::new();

        // === 步骤 1: 年级检查 ===
        let grade_bounds = EligibilityCore::parse_grade_range(category.grade_range.as_deref());
        match grade_bounds {
            RangeBounds::Malformed => {
                warn!(
                    category_id = %category.category_id,
                    raw = ?category.grade_range,
                    "年级区间无法解析, 按不限处理"
                );
                details.push(format!(
                    "年级区间无法解析, 按不限处理: {:?}",
                    category.grade_range
                ));
            }
            RangeBounds::Bounds(lo, hi) => {
                match EligibilityCore::normalize_grade_label(&participant.grade_label) {
                    Some(grade) => {
                        if !EligibilityCore::within_bounds(grade, grade_bounds) {
                            reasons.push(IneligibilityReason::GradeIneligible);
                            details.push(format!(
                                "年级 {} (标签 '{}') 不在区间 [{}, {}]",
                                grade, participant.grade_label, lo, hi
                            ));
                        }
                    }
                    None => {
                        // 区间存在而选手年级无法归一化, 判不符
                        reasons.push(IneligibilityReason::GradeIneligible);
                        details.push(format!(
                            "年级标签 '{}' 无法归一化, 无法证明落在区间 [{}, {}]",
                            participant.grade_label, lo, hi
                        ));
                    }
                }
            }
            RangeBounds::Unrestricted => {}
        }

        // === 步骤 2: 年龄检查 ===
        let age_bounds = EligibilityCore::parse_age_range(category.age_range.as_deref());
        match age_bounds {
            RangeBounds::Malformed => {
                warn!(
                    category_id = %category.category_id,
                    raw = ?category.age_range,
                    "年龄区间无法解析, 按不限处理"
                );
                details.push(format!(
                    "年龄区间无法解析, 按不限处理: {:?}",
                    category.age_range
                ));
            }
            RangeBounds::Bounds(lo, hi) => match participant.date_of_birth {
                Some(dob) => {
                    let age = EligibilityCore::age_in_years(dob, today);
                    if !EligibilityCore::within_bounds(age, age_bounds) {
                        reasons.push(IneligibilityReason::AgeIneligible);
                        details.push(format!("年龄 {} 不在区间 [{}, {}]", age, lo, hi));
                    }
                }
                None => {
                    // 区间存在而出生日期缺失, 判不符
                    reasons.push(IneligibilityReason::AgeIneligible);
                    details.push(format!(
                        "缺少出生日期, 无法证明年龄落在区间 [{}, {}]",
                        lo, hi
                    ));
                }
            },
            RangeBounds::Unrestricted => {}
        }

        // === 步骤 3: 学校归属检查 ===
        if participant.school_id != team_school_id {
            reasons.push(IneligibilityReason::SchoolAssociationInvalid);
            details.push(format!(
                "选手属于学校 {}, 队伍属于学校 {}",
                participant.school_id, team_school_id
            ));
        }

        // === 步骤 4: 重复报名检查 ===
        if let Some(team_id) = existing_membership {
            reasons.push(IneligibilityReason::DuplicateRegistration);
            details.push(format!("已在同赛项队伍 {} 中占位", team_id));
        }

        if reasons.is_empty() {
            return EligibilityVerdict::pass(details);
        }

        EligibilityVerdict {
            eligible: false,
            reasons,
            details,
        }
    }
}

impl Default for EligibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::participant::Participant;
    use chrono::Utc;

    fn participant(grade: &str, dob: Option<NaiveDate>, school: &str) -> Participant {
        Participant {
            participant_id: "P001".to_string(),
            school_id: school.to_string(),
            full_name: "测试选手".to_string(),
            grade_label: grade.to_string(),
            date_of_birth: dob,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category(grade_range: Option<&str>, age_range: Option<&str>) -> Category {
        Category {
            category_id: "C001".to_string(),
            competition_id: "CMP001".to_string(),
            name: "智能探索".to_string(),
            code: "EXP".to_string(),
            display_order: 1,
            grade_range: grade_range.map(str::to_string),
            age_range: age_range.map(str::to_string),
            min_participants: None,
            max_participants: None,
            team_size: None,
            composition_rules: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[test]
    fn test_evaluate_all_pass() {
        let engine = EligibilityEngine::new();
        let p = participant(
            "Grade 4",
            Some(NaiveDate::from_ymd_opt(2014, 6, 1).unwrap()),
            "S001",
        );
        let c = category(Some("3-5"), Some("9-12"));

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(verdict.eligible);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_evaluate_grade_out_of_range() {
        let engine = EligibilityEngine::new();
        let p = participant("Grade 7", None, "S001");
        let c = category(Some("3-5"), None);

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(!verdict.eligible);
        assert_eq!(verdict.reasons, vec![IneligibilityReason::GradeIneligible]);
    }

    #[test]
    fn test_evaluate_grade_unparseable_with_range() {
        let engine = EligibilityEngine::new();
        let p = participant("Senior", None, "S001");
        let c = category(Some("3-5"), None);

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(!verdict.eligible);
        assert_eq!(verdict.reasons, vec![IneligibilityReason::GradeIneligible]);
    }

    #[test]
    fn test_evaluate_malformed_range_fail_open() {
        let engine = EligibilityEngine::new();
        let p = participant("Senior", None, "S001");
        let c = category(Some("3-5-7"), None); // 三段, 无法解析

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(verdict.eligible); // 放行
        assert!(verdict.details.iter().any(|d| d.contains("无法解析")));
    }

    #[test]
    fn test_evaluate_age_out_of_range() {
        let engine = EligibilityEngine::new();
        // 2025-04-01 时 15 岁
        let p = participant(
            "Grade 9",
            Some(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()),
            "S001",
        );
        let c = category(None, Some("9-12"));

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(!verdict.eligible);
        assert_eq!(verdict.reasons, vec![IneligibilityReason::AgeIneligible]);
    }

    #[test]
    fn test_evaluate_missing_dob_with_age_range() {
        let engine = EligibilityEngine::new();
        let p = participant("Grade 4", None, "S001");
        let c = category(None, Some("9-12"));

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(!verdict.eligible);
        assert_eq!(verdict.reasons, vec![IneligibilityReason::AgeIneligible]);
    }

    #[test]
    fn test_evaluate_school_mismatch() {
        let engine = EligibilityEngine::new();
        let p = participant("Grade 4", None, "S002");
        let c = category(None, None);

        let verdict = engine.evaluate(&p, &c, "S001", None, today());
        assert!(!verdict.eligible);
        assert_eq!(
            verdict.reasons,
            vec![IneligibilityReason::SchoolAssociationInvalid]
        );
    }

    #[test]
    fn test_evaluate_duplicate_registration() {
        let engine = EligibilityEngine::new();
        let p = participant("Grade 4", None, "S001");
        let c = category(None, None);

        let verdict = engine.evaluate(&p, &c, "S001", Some("T-EXISTING"), today());
        assert!(!verdict.eligible);
        assert_eq!(
            verdict.reasons,
            vec![IneligibilityReason::DuplicateRegistration]
        );
        assert!(verdict.details.iter().any(|d| d.contains("T-EXISTING")));
    }

    #[test]
    fn test_evaluate_multiple_reasons_accumulate() {
        let engine = EligibilityEngine::new();
        let p = participant("Grade 8", None, "S002");
        let c = category(Some("3-5"), Some("9-12"));

        let verdict = engine.evaluate(&p, &c, "S001", Some("T1"), today());
        assert!(!verdict.eligible);
        assert_eq!(verdict.reasons.len(), 4);
    }
}
