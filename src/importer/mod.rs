// ==========================================
// 青少年科创竞赛管理系统 - 导入层
// ==========================================
// 职责: 外部名册文件导入, 逐行校验后生成名册数据
// 支持: CSV
// ==========================================

// 模块声明
pub mod error;
pub mod roster_file;
pub mod roster_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use roster_file::{RawRosterRow, RosterFileParser, RosterRowMapper};
pub use roster_importer::{
    RejectedRow, RosterImportJob, RosterImportOutcome, RosterImporter,
};
