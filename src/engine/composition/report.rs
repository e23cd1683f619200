// ==========================================
// 青少年科创竞赛管理系统 - 队伍构成校验报告
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CompositionReport - 构成校验报告
// ==========================================
// 字段键约定: team_size / participant.{id} / coaches /
//             documents.{participant_id} / roles
// BTreeMap 保证遍历顺序稳定, 报告可复现
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionReport {
    /// 是否通过 (errors 为空)
    pub is_valid: bool,

    /// 阻断性问题: 字段 → 消息列表
    pub errors: BTreeMap<String, Vec<String>>,

    /// 提示性问题: 字段 → 消息列表
    pub warnings: BTreeMap<String, Vec<String>>,
}

impl CompositionReport {
    /// 创建空报告 (默认通过)
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: BTreeMap::new(),
            warnings: BTreeMap::new(),
        }
    }

    /// 记录阻断性问题
    pub fn record_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self.is_valid = false;
    }

    /// 记录提示性问题
    pub fn record_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// 警告整体升级为错误（赛日语境）
    pub fn escalate_warnings(&mut self) {
        let warnings = std::mem::take(&mut self.warnings);
        for (field, messages) in warnings {
            for message in messages {
                self.record_error(field.clone(), message);
            }
        }
    }

    /// 某字段是否存在阻断性问题
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// 问题总数 (错误 + 警告)
    pub fn issue_count(&self) -> usize {
        let errors: usize = self.errors.values().map(Vec::len).sum();
        let warnings: usize = self.warnings.values().map(Vec::len).sum();
        errors + warnings
    }
}

impl Default for CompositionReport {
    fn default() -> Self {
        Self::new()
    }
}
