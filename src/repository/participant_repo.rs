// ==========================================
// 青少年科创竞赛管理系统 - 选手与教练数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::participant::{Coach, Participant};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// ParticipantRepository - 选手仓储
// ==========================================
pub struct ParticipantRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ParticipantRepository {
    /// 创建新的 ParticipantRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入选手
    pub fn insert(&self, participant: &Participant) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO participants (
                participant_id, school_id, full_name, grade_label, date_of_birth,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &participant.participant_id,
                &participant.school_id,
                &participant.full_name,
                &participant.grade_label,
                &participant
                    .date_of_birth
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                &participant.created_at.to_rfc3339(),
                &participant.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(participant.participant_id.clone())
    }

    /// 按 participant_id 查询选手
    pub fn find_by_id(&self, participant_id: &str) -> RepositoryResult<Option<Participant>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT participant_id, school_id, full_name, grade_label, date_of_birth,
                      created_at, updated_at
               FROM participants
               WHERE participant_id = ?"#,
            params![participant_id],
            |row| self.map_row(row),
        ) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 批量按 ID 查询选手（IN 分块, 组队校验用）
    pub fn find_by_ids(&self, participant_ids: &[String]) -> RepositoryResult<Vec<Participant>> {
        if participant_ids.is_empty() {
            return Ok(vec![]);
        }

        const CHUNK_SIZE: usize = 900;

        let conn = self.get_conn()?;
        let mut result = Vec::with_capacity(participant_ids.len());

        for chunk in participant_ids.chunks(CHUNK_SIZE) {
            let placeholders = std::iter::repeat("?")
                .take(chunk.len())
                .collect::<Vec<_>>()
                .join(", ");

            let sql = format!(
                r#"SELECT participant_id, school_id, full_name, grade_label, date_of_birth,
                          created_at, updated_at
                   FROM participants
                   WHERE participant_id IN ({})"#,
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|s| s as &dyn rusqlite::ToSql).collect();

            let rows = stmt
                .query_map(params_vec.as_slice(), |row| self.map_row(row))?
                .collect::<SqliteResult<Vec<Participant>>>()?;
            result.extend(rows);
        }

        Ok(result)
    }

    /// 查询学校的所有选手
    pub fn list_by_school(&self, school_id: &str) -> RepositoryResult<Vec<Participant>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT participant_id, school_id, full_name, grade_label, date_of_birth,
                      created_at, updated_at
               FROM participants
               WHERE school_id = ?
               ORDER BY full_name"#,
        )?;

        let participants = stmt
            .query_map(params![school_id], |row| self.map_row(row))?
            .collect::<Result<Vec<Participant>, _>>()?;

        Ok(participants)
    }

    /// 映射数据库行到 Participant 对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Participant> {
        Ok(Participant {
            participant_id: row.get(0)?,
            school_id: row.get(1)?,
            full_name: row.get(2)?,
            grade_label: row.get(3)?,
            date_of_birth: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            created_at: parse_utc(5, row.get::<_, String>(5)?)?,
            updated_at: parse_utc(6, row.get::<_, String>(6)?)?,
        })
    }
}

// ==========================================
// CoachRepository - 教练仓储
// ==========================================
pub struct CoachRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CoachRepository {
    /// 创建新的 CoachRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入教练
    pub fn insert(&self, coach: &Coach) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO coaches (
                coach_id, school_id, full_name, email, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &coach.coach_id,
                &coach.school_id,
                &coach.full_name,
                &coach.email,
                &coach.created_at.to_rfc3339(),
                &coach.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(coach.coach_id.clone())
    }

    /// 按 coach_id 查询教练
    pub fn find_by_id(&self, coach_id: &str) -> RepositoryResult<Option<Coach>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT coach_id, school_id, full_name, email, created_at, updated_at
               FROM coaches
               WHERE coach_id = ?"#,
            params![coach_id],
            |row| self.map_row(row),
        ) {
            Ok(coach) => Ok(Some(coach)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 Coach 对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Coach> {
        Ok(Coach {
            coach_id: row.get(0)?,
            school_id: row.get(1)?,
            full_name: row.get(2)?,
            email: row.get(3)?,
            created_at: parse_utc(4, row.get::<_, String>(4)?)?,
            updated_at: parse_utc(5, row.get::<_, String>(5)?)?,
        })
    }
}

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
