// ==========================================
// 青少年科创竞赛管理系统 - 名册文件解析
// ==========================================
// 职责: CSV 名册文件 → 原始名册行 (解析 + 字段映射)
// 支持: CSV (.csv), 表头接受中英文别名
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::domain::types::ParticipantRole;

// ==========================================
// RawRosterRow - 映射后的名册行
// ==========================================
#[derive(Debug, Clone)]
pub struct RawRosterRow {
    /// 数据行号 (表头后第 1 行 = 1)
    pub row_number: usize,
    pub full_name: String,
    pub grade_label: String,
    pub date_of_birth: Option<NaiveDate>,
    pub role: ParticipantRole,
    /// 学校名称列 (可选, 填写时须与队伍归属一致)
    pub school_name: Option<String>,
}

// ==========================================
// RosterFileParser - CSV 解析
// ==========================================
pub struct RosterFileParser;

impl RosterFileParser {
    /// 解析 CSV 文件为原始键值行 (跳过完全空白行)
    pub fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> ImportResult<Vec<HashMap<String, String>>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }
            records.push(row_map);
        }
        Ok(records)
    }
}

// ==========================================
// RosterRowMapper - 字段映射
// ==========================================
pub struct RosterRowMapper;

impl RosterRowMapper {
    /// 单行映射: 键值行 → RawRosterRow
    pub fn map_row(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawRosterRow> {
        let full_name = self
            .get_string(row, "姓名")
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row_number,
                message: "姓名为空".to_string(),
            })?;
        let grade_label = self
            .get_string(row, "年级")
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row_number,
                message: "年级为空".to_string(),
            })?;
        let role_raw = self
            .get_string(row, "角色")
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row_number,
                message: "角色为空".to_string(),
            })?;
        let role = self
            .parse_role(&role_raw)
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row_number,
                message: format!("未知角色: {}", role_raw),
            })?;

        Ok(RawRosterRow {
            row_number,
            full_name,
            grade_label,
            date_of_birth: self.parse_date(row, "出生日期", row_number)?,
            role,
            school_name: self.get_string(row, "学校"),
        })
    }

    /// 提取字符串字段（返回 Option），支持中英文列名别名
    fn get_string(&self, row: &HashMap<String, String>, key: &str) -> Option<String> {
        let aliases: Vec<&str> = match key {
            "姓名" => vec!["姓名", "name", "full_name"],
            "年级" => vec!["年级", "grade", "grade_label"],
            "出生日期" => vec!["出生日期", "date_of_birth", "dob"],
            "角色" => vec!["角色", "role"],
            "学校" => vec!["学校", "school", "school_name"],
            _ => vec![key],
        };

        for alias in aliases {
            if let Some(v) = row.get(alias) {
                let trimmed = v.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }

    /// 解析日期 (YYYY-MM-DD, 兼容 YYYY/MM/DD)
    fn parse_date(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<Option<NaiveDate>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(&value, "%Y/%m/%d"))
                .map(Some)
                .map_err(|_| ImportError::DateFormatError {
                    row: row_number,
                    field: key.to_string(),
                    value,
                }),
        }
    }

    /// 角色解析: 中文别名 + 标准枚举名
    fn parse_role(&self, raw: &str) -> Option<ParticipantRole> {
        match raw.trim() {
            "队长" => Some(ParticipantRole::TeamLeader),
            "队员" => Some(ParticipantRole::Regular),
            "程序" => Some(ParticipantRole::Programmer),
            "搭建" => Some(ParticipantRole::Builder),
            "设计" => Some(ParticipantRole::Designer),
            "调研" => Some(ParticipantRole::Researcher),
            other => ParticipantRole::from_str(other),
        }
    }
}
