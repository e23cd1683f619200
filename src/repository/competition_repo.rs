// ==========================================
// 青少年科创竞赛管理系统 - 赛事与阶段数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::competition::{Competition, Phase};
use crate::domain::types::CompetitionMode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CompetitionRepository - 赛事仓储
// ==========================================
pub struct CompetitionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompetitionRepository {
    /// 创建新的 CompetitionRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 competition_id 查询赛事
    pub fn find_by_id(&self, competition_id: &str) -> RepositoryResult<Option<Competition>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT competition_id, name, season_year, mode,
                      team_size_min, team_size_max, is_active,
                      created_at, updated_at
               FROM competitions
               WHERE competition_id = ?"#,
            params![competition_id],
            |row| self.map_row(row),
        ) {
            Ok(competition) => Ok(Some(competition)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询当前活动赛事（最多一个; 多个时取最近创建的）
    pub fn find_active(&self) -> RepositoryResult<Option<Competition>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT competition_id, name, season_year, mode,
                      team_size_min, team_size_max, is_active,
                      created_at, updated_at
               FROM competitions
               WHERE is_active = 1
               ORDER BY created_at DESC
               LIMIT 1"#,
            [],
            |row| self.map_row(row),
        ) {
            Ok(competition) => Ok(Some(competition)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 Competition 对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Competition> {
        let mode_raw: String = row.get(3)?;
        let mode = CompetitionMode::from_str(&mode_raw)
            .ok_or_else(|| bad_cell(3, format!("未知赛事模式: {}", mode_raw)))?;

        Ok(Competition {
            competition_id: row.get(0)?,
            name: row.get(1)?,
            season_year: row.get(2)?,
            mode,
            team_size_min: row.get(4)?,
            team_size_max: row.get(5)?,
            is_active: row.get::<_, i32>(6)? == 1,
            created_at: parse_utc(7, row.get::<_, String>(7)?)?,
            updated_at: parse_utc(8, row.get::<_, String>(8)?)?,
        })
    }
}

// ==========================================
// PhaseRepository - 阶段仓储
// ==========================================
pub struct PhaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PhaseRepository {
    /// 创建新的 PhaseRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 phase_id 查询阶段
    pub fn find_by_id(&self, phase_id: &str) -> RepositoryResult<Option<Phase>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE phase_id = ?", SELECT_PHASE),
            params![phase_id],
            |row| self.map_row(row),
        ) {
            Ok(phase) => Ok(Some(phase)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按赛事与阶段序号查询
    pub fn find_by_order(
        &self,
        competition_id: &str,
        phase_order: i32,
    ) -> RepositoryResult<Option<Phase>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "{} WHERE competition_id = ? AND phase_order = ?",
                SELECT_PHASE
            ),
            params![competition_id, phase_order],
            |row| self.map_row(row),
        ) {
            Ok(phase) => Ok(Some(phase)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按阶段名称查询（截止规则按名称关联, 同名阶段可跨赛事）
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Vec<Phase>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE name = ? ORDER BY competition_id, phase_order",
            SELECT_PHASE
        ))?;

        let phases = stmt
            .query_map(params![name], |row| self.map_row(row))?
            .collect::<Result<Vec<Phase>, _>>()?;

        Ok(phases)
    }

    /// 查询赛事入口阶段（phase_order 最小者, 报名落点）
    pub fn find_entry_phase(&self, competition_id: &str) -> RepositoryResult<Option<Phase>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                "{} WHERE competition_id = ? ORDER BY phase_order LIMIT 1",
                SELECT_PHASE
            ),
            params![competition_id],
            |row| self.map_row(row),
        ) {
            Ok(phase) => Ok(Some(phase)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 Phase 对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Phase> {
        Ok(Phase {
            phase_id: row.get(0)?,
            competition_id: row.get(1)?,
            name: row.get(2)?,
            phase_order: row.get(3)?,
            capacity_per_category: row.get(4)?,
            district_balancing: row.get::<_, i32>(5)? == 1,
            starts_on: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            ends_on: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            created_at: parse_utc(8, row.get::<_, String>(8)?)?,
            updated_at: parse_utc(9, row.get::<_, String>(9)?)?,
        })
    }
}

const SELECT_PHASE: &str = r#"SELECT phase_id, competition_id, name, phase_order,
       capacity_per_category, district_balancing,
       starts_on, ends_on, created_at, updated_at
FROM phases"#;

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn bad_cell(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}
