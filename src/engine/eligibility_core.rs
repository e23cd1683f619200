// ==========================================
// 青少年科创竞赛管理系统 - Eligibility Core 纯函数库
// ==========================================
// 职责: 年级标签归一化、区间解析、年龄计算的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use chrono::{Datelike, NaiveDate};

// ==========================================
// RangeBounds - 区间解析结果
// ==========================================
// 口径: 区间缺失 = 不限; 格式坏 = Malformed, 由引擎层按
//       放行策略处理并告警, 核心层只区分三种形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBounds {
    /// 未配置区间, 不限
    Unrestricted,
    /// 闭区间 [lo, hi]
    Bounds(i32, i32),
    /// 配置了区间但无法解析
    Malformed,
}

// ==========================================
// EligibilityCore - 纯函数工具类
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    /// 年级标签归一化
    ///
    /// # 规则
    /// 1. "R" / "Grade R" → 0 (学前班)
    /// 2. "N" / "Nursery" → -1 (托班)
    /// 3. 其他 → 取标签中第一段连续数字
    /// 4. 无数字可取 → None
    ///
    /// # 参数
    /// - grade_label: 原始年级标签 (如 "Grade 4" / "4" / "R")
    pub fn normalize_grade_label(grade_label: &str) -> Option<i32> {
        let trimmed = grade_label.trim();
        if trimmed.is_empty() {
            return None;
        }

        let upper = trimmed.to_uppercase();
        // 规则 1: 学前班
        if upper == "R" || upper == "GRADE R" {
            return Some(0);
        }
        // 规则 2: 托班
        if upper == "N" || upper == "NURSERY" {
            return Some(-1);
        }

        // 规则 3: 第一段连续数字
        let digits: String = trimmed
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<i32>().ok()
    }

    /// 解析年级区间 "X-Y"
    ///
    /// # 规则
    /// - 缺失或空白 → Unrestricted
    /// - 恰好两段、按年级标签规则均可归一化 → Bounds (自动纠正大小)
    /// - 其他 → Malformed
    ///
    /// # 参数
    /// - raw: 区间原文 (如 "3-5" / "R-2")
    pub fn parse_grade_range(raw: Option<&str>) -> RangeBounds {
        Self::parse_range_with(raw, Self::normalize_grade_label)
    }

    /// 解析年龄区间 "X-Y"
    ///
    /// # 规则
    /// - 缺失或空白 → Unrestricted
    /// - 恰好两段、均为整数 → Bounds (自动纠正大小)
    /// - 其他 → Malformed
    pub fn parse_age_range(raw: Option<&str>) -> RangeBounds {
        Self::parse_range_with(raw, |token| token.trim().parse::<i32>().ok())
    }

    fn parse_range_with(
        raw: Option<&str>,
        parse_token: impl Fn(&str) -> Option<i32>,
    ) -> RangeBounds {
        let Some(text) = raw else {
            return RangeBounds::Unrestricted;
        };
        let text = text.trim();
        if text.is_empty() {
            return RangeBounds::Unrestricted;
        }

        let tokens: Vec<&str> = text.split('-').collect();
        if tokens.len() != 2 {
            return RangeBounds::Malformed;
        }

        match (parse_token(tokens[0]), parse_token(tokens[1])) {
            (Some(lo), Some(hi)) => {
                if lo <= hi {
                    RangeBounds::Bounds(lo, hi)
                } else {
                    RangeBounds::Bounds(hi, lo)
                }
            }
            _ => RangeBounds::Malformed,
        }
    }

    /// 计算基准日的周岁年龄
    ///
    /// # 规则
    /// - 按生日是否已过计算整周岁
    ///
    /// # 参数
    /// - date_of_birth: 出生日期
    /// - today: 基准日期
    pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
        let mut age = today.year() - date_of_birth.year();
        if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
            age -= 1;
        }
        age
    }

    /// 数值是否落在区间内
    ///
    /// # 规则
    /// - Unrestricted / Malformed → 视为通过 (放行口径, 引擎层负责告警)
    /// - Bounds(lo, hi) → lo ≤ value ≤ hi
    pub fn within_bounds(value: i32, bounds: RangeBounds) -> bool {
        match bounds {
            RangeBounds::Unrestricted | RangeBounds::Malformed => true,
            RangeBounds::Bounds(lo, hi) => value >= lo && value <= hi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================
    // 测试 1: 年级标签归一化
    // ==========================================

    #[test]
    fn test_normalize_grade_label_reception() {
        assert_eq!(EligibilityCore::normalize_grade_label("R"), Some(0));
        assert_eq!(EligibilityCore::normalize_grade_label("Grade R"), Some(0));
        assert_eq!(EligibilityCore::normalize_grade_label(" grade r "), Some(0));
    }

    #[test]
    fn test_normalize_grade_label_nursery() {
        assert_eq!(EligibilityCore::normalize_grade_label("N"), Some(-1));
        assert_eq!(EligibilityCore::normalize_grade_label("Nursery"), Some(-1));
    }

    #[test]
    fn test_normalize_grade_label_numeric() {
        assert_eq!(EligibilityCore::normalize_grade_label("4"), Some(4));
        assert_eq!(EligibilityCore::normalize_grade_label("Grade 7"), Some(7));
        assert_eq!(EligibilityCore::normalize_grade_label("Year 12"), Some(12));
    }

    #[test]
    fn test_normalize_grade_label_unparseable() {
        assert_eq!(EligibilityCore::normalize_grade_label(""), None);
        assert_eq!(EligibilityCore::normalize_grade_label("Senior"), None);
    }

    // ==========================================
    // 测试 2: 区间解析
    // ==========================================

    #[test]
    fn test_parse_grade_range_bounds() {
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("3-5")),
            RangeBounds::Bounds(3, 5)
        );
        // 年级标记也允许出现在区间里
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("R-2")),
            RangeBounds::Bounds(0, 2)
        );
    }

    #[test]
    fn test_parse_grade_range_unrestricted() {
        assert_eq!(
            EligibilityCore::parse_grade_range(None),
            RangeBounds::Unrestricted
        );
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("  ")),
            RangeBounds::Unrestricted
        );
    }

    #[test]
    fn test_parse_grade_range_malformed() {
        // 非两段
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("3-5-7")),
            RangeBounds::Malformed
        );
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("all")),
            RangeBounds::Malformed
        );
        // 段无法归一化
        assert_eq!(
            EligibilityCore::parse_grade_range(Some("abc-def")),
            RangeBounds::Malformed
        );
    }

    #[test]
    fn test_parse_range_reversed_bounds() {
        // 大小颠倒自动纠正
        assert_eq!(
            EligibilityCore::parse_age_range(Some("14-9")),
            RangeBounds::Bounds(9, 14)
        );
    }

    #[test]
    fn test_parse_age_range() {
        assert_eq!(
            EligibilityCore::parse_age_range(Some("9-14")),
            RangeBounds::Bounds(9, 14)
        );
        assert_eq!(
            EligibilityCore::parse_age_range(Some("nine-14")),
            RangeBounds::Malformed
        );
    }

    // ==========================================
    // 测试 3: 周岁计算
    // ==========================================

    #[test]
    fn test_age_in_years_birthday_passed() {
        let dob = NaiveDate::from_ymd_opt(2012, 3, 5).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(EligibilityCore::age_in_years(dob, today), 13); // 生日当天算已满
    }

    #[test]
    fn test_age_in_years_birthday_not_reached() {
        let dob = NaiveDate::from_ymd_opt(2012, 9, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(EligibilityCore::age_in_years(dob, today), 12);
    }

    // ==========================================
    // 测试 4: 区间判定
    // ==========================================

    #[test]
    fn test_within_bounds() {
        assert!(EligibilityCore::within_bounds(4, RangeBounds::Bounds(3, 5)));
        assert!(!EligibilityCore::within_bounds(6, RangeBounds::Bounds(3, 5)));
        assert!(EligibilityCore::within_bounds(99, RangeBounds::Unrestricted));
        assert!(EligibilityCore::within_bounds(99, RangeBounds::Malformed)); // 放行
    }
}
