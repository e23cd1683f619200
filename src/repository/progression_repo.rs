// ==========================================
// 青少年科创竞赛管理系统 - 晋级台账数据仓储
// ==========================================
// 红线: 台账只追加, 本仓储不提供 UPDATE/DELETE
// 事务: 晋级落库 = 新队伍 + 名册克隆 + 台账行, 同一事务内完成,
//       任一步失败整体回滚
// ==========================================

use crate::domain::progression::ProgressionRecord;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::CompetitionMode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::roster_repo::{insert_coach_row, insert_participant_row};
use crate::repository::team_repo::insert_team_row;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ProgressionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressionRepository {
    /// 创建新的 ProgressionRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 晋级落库（单队伍原子写入）
    ///
    /// # 事务内容
    /// 1. 插入目标阶段新队伍
    /// 2. 克隆在役队员名册
    /// 3. 克隆在役教练名册
    /// 4. 追加台账行 (UNIQUE(team_id, to_phase_id) 挡重复晋级)
    ///
    /// # 错误
    /// - UniqueConstraintViolation: 源队伍已晋级到该阶段, 或目标阶段
    ///   同 (学校, 赛项) 名额已被占用
    pub fn record_advancement(
        &self,
        new_team: &Team,
        participants: &[TeamParticipant],
        coaches: &[TeamCoach],
        record: &ProgressionRecord,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // === 1. 目标阶段新队伍 ===
        insert_team_row(&tx, new_team)?;

        // === 2. 队员名册克隆 ===
        for member in participants {
            insert_participant_row(&tx, member)?;
        }

        // === 3. 教练名册克隆 ===
        for coach in coaches {
            insert_coach_row(&tx, coach)?;
        }

        // === 4. 台账行 ===
        insert_record_row(&tx, record)?;

        tx.commit()?;
        Ok(())
    }

    /// 源队伍是否已有到该阶段的台账行
    pub fn exists(&self, team_id: &str, to_phase_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM phase_progressions WHERE team_id = ? AND to_phase_id = ?",
            params![team_id, to_phase_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// 查询某队伍的全部台账行（时间升序）
    pub fn list_by_team(&self, team_id: &str) -> RepositoryResult<Vec<ProgressionRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE team_id = ? ORDER BY created_at, id",
            SELECT_RECORD
        ))?;

        let records = stmt
            .query_map(params![team_id], |row| map_record_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

const SELECT_RECORD: &str = r#"SELECT id, team_id, from_phase_id, to_phase_id,
       progression_date, score, rank_in_category, qualified,
       advancement_reason, competition_type, created_at
FROM phase_progressions"#;

fn insert_record_row(conn: &Connection, record: &ProgressionRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"INSERT INTO phase_progressions (
            id, team_id, from_phase_id, to_phase_id,
            progression_date, score, rank_in_category, qualified,
            advancement_reason, competition_type, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &record.id,
            &record.team_id,
            &record.from_phase_id,
            &record.to_phase_id,
            record.progression_date.format("%Y-%m-%d").to_string(),
            &record.score,
            record.rank_in_category,
            if record.qualified { 1 } else { 0 },
            &record.advancement_reason,
            record.competition_type.to_db_str(),
            &record.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn map_record_row(row: &rusqlite::Row) -> rusqlite::Result<ProgressionRecord> {
    let mode_raw: String = row.get(9)?;
    let competition_type = CompetitionMode::from_str(&mode_raw)
        .ok_or_else(|| bad_cell(9, format!("未知赛事模式: {}", mode_raw)))?;

    Ok(ProgressionRecord {
        id: row.get(0)?,
        team_id: row.get(1)?,
        from_phase_id: row.get(2)?,
        to_phase_id: row.get(3)?,
        progression_date: parse_date(4, row.get::<_, String>(4)?)?,
        score: row.get(5)?,
        rank_in_category: row.get(6)?,
        qualified: row.get::<_, i32>(7)? == 1,
        advancement_reason: row.get(8)?,
        competition_type,
        created_at: parse_utc(10, row.get::<_, String>(10)?)?,
    })
}

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn bad_cell(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}
