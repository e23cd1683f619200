// ==========================================
// 青少年科创竞赛管理系统 - 阶段选拔引擎
// ==========================================
// 红线: 选拔纯函数, 不写库; 相同输入必须产出相同结果
// 红线: 地区均衡保底名额优先于总排名补位
// ==========================================
// 职责: 按赛项分组 -> 排名 -> 容量截断 -> 地区均衡
// 输入: 已批准队伍的选拔快照 (分数/赛项/地区)
// 输出: 每赛项有序 (队伍, 名次) 列表
// ==========================================

use crate::repository::TeamSelectionRow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

// ==========================================
// SelectedTeam - 单支入选队伍
// ==========================================
#[derive(Debug, Clone)]
pub struct SelectedTeam {
    pub team_id: String,
    pub school_id: String,
    pub district: String,
    pub score: Option<f64>,
    /// 赛项内名次 (1 起, 按入选后分数降序)
    pub rank: i32,
}

// ==========================================
// CategorySelection - 单赛项选拔结果
// ==========================================
#[derive(Debug, Clone)]
pub struct CategorySelection {
    pub category_id: String,
    pub selected: Vec<SelectedTeam>,
    pub total_candidates: usize,
}

// ==========================================
// PhaseSelector - 阶段选拔引擎
// ==========================================
pub struct PhaseSelector {
    // 无状态引擎，不需要注入依赖
}

impl PhaseSelector {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 选拔晋级队伍（按赛项独立进行）
    ///
    /// 规则：
    /// 1) 按赛项分组, 组内按分数降序排名, 同分按队伍 ID 升序
    /// 2) capacity=None 表示不限, 全量入选
    /// 3) 均衡开启时: 每地区保底 floor(capacity/地区数) 个头部名额,
    ///    余量按总排名补位 (不再看地区)
    /// 4) 名次按入选集合的分数降序重排, 从 1 起连续编号
    ///
    /// # 参数
    /// - `candidates`: 候选队伍快照 (可含多个赛项, 顺序任意)
    /// - `capacity`: 每赛项晋级容量 (None=不限)
    /// - `balanced`: 是否启用地区均衡
    #[instrument(skip(self, candidates), fields(
        candidates_count = candidates.len(),
        capacity = ?capacity,
        balanced = balanced
    ))]
    pub fn select(
        &self,
        candidates: &[TeamSelectionRow],
        capacity: Option<i64>,
        balanced: bool,
    ) -> Vec<CategorySelection> {
        // 1. 按赛项分组 (BTreeMap 保证赛项遍历顺序稳定)
        let mut by_category: BTreeMap<&str, Vec<&TeamSelectionRow>> = BTreeMap::new();
        for row in candidates {
            by_category.entry(row.category_id.as_str()).or_default().push(row);
        }

        // 2. 逐赛项选拔
        let mut results = Vec::with_capacity(by_category.len());
        for (category_id, mut ranked) in by_category {
            let total_candidates = ranked.len();
            ranked.sort_by(|a, b| Self::rank_order(a, b));

            let cap = match capacity {
                Some(c) if c < 0 => 0,
                Some(c) => c as usize,
                None => ranked.len(),
            };

            let picked_idx = if balanced {
                Self::balanced_pick(&ranked, cap)
            } else {
                (0..cap.min(ranked.len())).collect()
            };

            // 按排名序收集入选者, 名次即入选集合内的分数降序位次
            let selected: Vec<SelectedTeam> = picked_idx
                .iter()
                .enumerate()
                .map(|(pos, &i)| SelectedTeam {
                    team_id: ranked[i].team_id.clone(),
                    school_id: ranked[i].school_id.clone(),
                    district: ranked[i].district.clone(),
                    score: ranked[i].qualification_score,
                    rank: pos as i32 + 1,
                })
                .collect();

            debug!(
                category_id = %category_id,
                candidates = total_candidates,
                selected = selected.len(),
                "赛项选拔完成"
            );

            results.push(CategorySelection {
                category_id: category_id.to_string(),
                selected,
                total_candidates,
            });
        }

        results
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 排名比较: 分数降序, 缺分垫底, 同分按队伍 ID 升序
    fn rank_order(a: &TeamSelectionRow, b: &TeamSelectionRow) -> Ordering {
        let by_score = match (a.qualification_score, b.qualification_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then_with(|| a.team_id.cmp(&b.team_id))
    }

    /// 地区均衡选拔, 返回入选者在 ranked 中的下标 (升序 = 排名序)
    ///
    /// 1) 每地区保底 floor(cap/地区数), 按该地区自身排名取头部
    /// 2) 余量从总排名剩余者依序补齐
    /// 地区数 <= 1 或保底为 0 时退化为纯排名截断
    fn balanced_pick(ranked: &[&TeamSelectionRow], cap: usize) -> Vec<usize> {
        if cap == 0 {
            return Vec::new();
        }

        let mut district_taken: BTreeMap<&str, usize> = BTreeMap::new();
        for row in ranked {
            district_taken.entry(row.district.as_str()).or_insert(0);
        }
        let district_count = district_taken.len();
        if district_count <= 1 {
            return (0..cap.min(ranked.len())).collect();
        }

        let floor_share = cap / district_count;
        let mut picked = vec![false; ranked.len()];
        let mut total = 0usize;

        // === 1. 保底名额: 沿总排名扫描, 每地区取自身头部 floor_share 个 ===
        if floor_share > 0 {
            for (i, row) in ranked.iter().enumerate() {
                if let Some(taken) = district_taken.get_mut(row.district.as_str()) {
                    if *taken < floor_share {
                        *taken += 1;
                        picked[i] = true;
                        total += 1;
                    }
                }
            }
        }

        // === 2. 总排名补位 ===
        for slot in picked.iter_mut() {
            if total >= cap {
                break;
            }
            if !*slot {
                *slot = true;
                total += 1;
            }
        }

        picked
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect()
    }
}

// ==========================================
// Default trait 实现
// ==========================================
impl Default for PhaseSelector {
    fn default() -> Self {
        Self::new()
    }
}
