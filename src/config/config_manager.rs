// ==========================================
// 青少年科创竞赛管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 口径: 缺行 → 文档化默认值; 值格式错误 → ConfigValueError (不静默吞掉)
// ==========================================

use crate::config::competition_config_trait::CompetitionConfigReader;
use crate::domain::types::CompetitionMode;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error as ThisError;

// ==========================================
// ConfigValueError - 配置值解析错误
// ==========================================
// 容量/名额类配置解析失败必须上抛, 不允许回落到默认值
#[derive(Debug, ThisError)]
#[error("配置项 {key} 的值无法解析: '{raw}'")]
pub struct ConfigValueError {
    pub key: String,
    pub raw: String,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取整型/浮点等可解析配置: 缺行用默认值, 格式错误上抛
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|_| {
                Box::new(ConfigValueError {
                    key: key.to_string(),
                    raw,
                }) as Box<dyn Error>
            }),
        }
    }

    /// 读取逗号分隔的天数列表: 缺行用默认值, 任一分量格式错误上抛
    fn get_day_list_or_default(
        &self,
        key: &str,
        default: &[i64],
    ) -> Result<Vec<i64>, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            None => return Ok(default.to_vec()),
            Some(v) => v,
        };

        let mut days = Vec::new();
        for token in raw.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let day = token.parse::<i64>().map_err(|_| {
                Box::new(ConfigValueError {
                    key: key.to_string(),
                    raw: raw.clone(),
                }) as Box<dyn Error>
            })?;
            days.push(day);
        }

        if days.is_empty() {
            return Ok(default.to_vec());
        }

        // 降序 + 去重, 提醒按"远→近"顺序判断
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.dedup();
        Ok(days)
    }
}

// ==========================================
// CompetitionConfigReader Trait 实现
// ==========================================
#[async_trait]
impl CompetitionConfigReader for ConfigManager {
    // ===== 容量配置 =====

    async fn get_category_team_limit(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::CATEGORY_TEAM_LIMIT, 1)
    }

    // ===== 队伍规模配置 =====

    async fn get_pilot_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::PILOT_TEAM_SIZE_MIN, 2)
    }

    async fn get_pilot_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::PILOT_TEAM_SIZE_MAX, 4)
    }

    async fn get_full_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::FULL_TEAM_SIZE_MIN, 1)
    }

    async fn get_full_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::FULL_TEAM_SIZE_MAX, 6)
    }

    async fn get_team_size_bounds(
        &self,
        mode: CompetitionMode,
    ) -> Result<(i32, i32), Box<dyn Error>> {
        match mode {
            CompetitionMode::Pilot => {
                let min = self.get_pilot_team_size_min().await?;
                let max = self.get_pilot_team_size_max().await?;
                Ok((min, max))
            }
            CompetitionMode::Full => {
                let min = self.get_full_team_size_min().await?;
                let max = self.get_full_team_size_max().await?;
                Ok((min, max))
            }
        }
    }

    // ===== 教练配置 =====

    async fn get_max_coaches_per_team(&self) -> Result<i32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::MAX_COACHES_PER_TEAM, 2)
    }

    // ===== 截止与提醒配置 =====

    async fn get_closing_window_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::CLOSING_WINDOW_DAYS, 7)
    }

    async fn get_reminder_threshold_days(&self) -> Result<Vec<i64>, Box<dyn Error>> {
        self.get_day_list_or_default(config_keys::REMINDER_THRESHOLD_DAYS, &[7, 3, 1])
    }

    // ===== 晋级名额配置 =====

    async fn get_pilot_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::PILOT_ADVANCE_QUOTA, 6)
    }

    async fn get_full_phase1_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::FULL_PHASE1_ADVANCE_QUOTA, 15)
    }

    async fn get_full_phase2_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::FULL_PHASE2_ADVANCE_QUOTA, 6)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 容量
    pub const CATEGORY_TEAM_LIMIT: &str = "category_team_limit";

    // 队伍规模
    pub const PILOT_TEAM_SIZE_MIN: &str = "pilot_team_size_min";
    pub const PILOT_TEAM_SIZE_MAX: &str = "pilot_team_size_max";
    pub const FULL_TEAM_SIZE_MIN: &str = "full_team_size_min";
    pub const FULL_TEAM_SIZE_MAX: &str = "full_team_size_max";

    // 教练
    pub const MAX_COACHES_PER_TEAM: &str = "max_coaches_per_team";

    // 截止与提醒
    pub const CLOSING_WINDOW_DAYS: &str = "closing_window_days";
    pub const REMINDER_THRESHOLD_DAYS: &str = "reminder_threshold_days";

    // 晋级名额
    pub const PILOT_ADVANCE_QUOTA: &str = "pilot_advance_quota";
    pub const FULL_PHASE1_ADVANCE_QUOTA: &str = "full_phase1_advance_quota";
    pub const FULL_PHASE2_ADVANCE_QUOTA: &str = "full_phase2_advance_quota";
}
