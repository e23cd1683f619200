// ==========================================
// 青少年科创竞赛管理系统 - 队伍构成校验引擎
// ==========================================
// 红线: 校验只产报告, 不写库, 不中断批量调用
// 红线: 赛日 (COMPETITION_DAY) 语境下警告升级为错误
// ==========================================
// 职责: 规模/资格/教练/材料/角色策略五项校验
// 输入: 队伍 + 在役名册 + 选手主数据 + 赛项策略
// 输出: CompositionReport (字段 → 消息)
// ==========================================

mod core;
mod report;

#[cfg(test)]
mod tests;

pub use core::{CompositionValidator, TeamCompositionInput};
pub use report::CompositionReport;
