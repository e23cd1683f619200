// ==========================================
// 青少年科创竞赛管理系统 - 队伍数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: 报名插入依赖 uq_teams_school_category_phase 部分唯一索引,
//       计数预检仅为提示, 最终以插入结果为准
// ==========================================

use crate::domain::team::Team;
use crate::domain::types::TeamStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// TeamSelectionRow - 晋级选拔输入行
// ==========================================
// 用途: PhaseSelector 输入 (JOIN schools 取地区)
#[derive(Debug, Clone)]
pub struct TeamSelectionRow {
    pub team_id: String,
    pub school_id: String,
    pub category_id: String,
    pub district: String,
    pub qualification_score: Option<f64>,
}

// ==========================================
// TeamRepository - 队伍仓储
// ==========================================
pub struct TeamRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeamRepository {
    /// 创建新的 TeamRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入队伍
    ///
    /// # 并发
    /// 同 (school, category, phase) 已有非 CANCELLED 队伍时,
    /// 部分唯一索引触发 UniqueConstraintViolation, 由 API 层
    /// 映射为可重试的容量抢占错误
    pub fn insert(&self, team: &Team) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_team_row(&conn, team)?;
        Ok(team.team_id.clone())
    }

    /// 按 team_id 查询队伍
    pub fn find_by_id(&self, team_id: &str) -> RepositoryResult<Option<Team>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("{} WHERE team_id = ?", SELECT_TEAM),
            params![team_id],
            |row| map_team_row(row),
        ) {
            Ok(team) => Ok(Some(team)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 统计 (学校, 赛项, 阶段) 的非 CANCELLED 队伍数
    pub fn count_non_cancelled(
        &self,
        school_id: &str,
        category_id: &str,
        phase_id: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*) FROM teams
               WHERE school_id = ? AND category_id = ? AND phase_id = ?
                 AND status != 'CANCELLED'"#,
            params![school_id, category_id, phase_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// 按学校统计各赛项非 CANCELLED 队伍数（可报名摘要用）
    pub fn count_non_cancelled_by_school(
        &self,
        school_id: &str,
        phase_id: &str,
    ) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT category_id, COUNT(*) FROM teams
               WHERE school_id = ? AND phase_id = ? AND status != 'CANCELLED'
               GROUP BY category_id"#,
        )?;

        let counts = stmt
            .query_map(params![school_id, phase_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    /// 查询阶段内待选拔的已批准队伍（含学校地区, team_id 升序保证确定性）
    pub fn list_approved_for_selection(
        &self,
        phase_id: &str,
    ) -> RepositoryResult<Vec<TeamSelectionRow>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT t.team_id, t.school_id, t.category_id, s.district, t.qualification_score
               FROM teams t
               INNER JOIN schools s ON t.school_id = s.school_id
               WHERE t.phase_id = ? AND t.status = 'APPROVED'
               ORDER BY t.team_id"#,
        )?;

        let rows = stmt
            .query_map(params![phase_id], |row| {
                Ok(TeamSelectionRow {
                    team_id: row.get(0)?,
                    school_id: row.get(1)?,
                    category_id: row.get(2)?,
                    district: row.get(3)?,
                    qualification_score: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// 查询阶段内需要提醒的学校（去重, school_id 升序）
    ///
    /// # 参数
    /// - category_id: Some=仅该赛项, None=整个阶段
    /// - status: Some=仅该状态, None=全部非 CANCELLED
    pub fn list_school_ids_in_phase(
        &self,
        phase_id: &str,
        category_id: Option<&str>,
        status: Option<TeamStatus>,
    ) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT DISTINCT school_id FROM teams
               WHERE phase_id = ?1
                 AND (?2 IS NULL OR category_id = ?2)
                 AND ((?3 IS NULL AND status != 'CANCELLED') OR status = ?3)
               ORDER BY school_id"#,
        )?;

        let ids = stmt
            .query_map(
                params![phase_id, category_id, status.map(|s| s.to_db_str())],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(ids)
    }

    /// 更新队伍教练快捷引用
    pub fn update_coach_refs(
        &self,
        team_id: &str,
        coach1_id: Option<&str>,
        coach2_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "UPDATE teams SET coach1_id = ?, coach2_id = ?, updated_at = ? WHERE team_id = ?",
            params![coach1_id, coach2_id, now.to_rfc3339(), team_id],
        )?;

        Ok(())
    }

    /// 过期处理: 阶段内草稿队伍批量取消（幂等, 只命中 DRAFT）
    ///
    /// # 参数
    /// - category_id: Some=仅该赛项, None=整个阶段
    ///
    /// # 返回
    /// - usize: 实际取消的队伍数
    pub fn expire_drafts_in_phase(
        &self,
        phase_id: &str,
        category_id: Option<&str>,
        note: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE teams
               SET status = 'CANCELLED',
                   notes = CASE WHEN notes IS NULL OR notes = ''
                           THEN ?3 ELSE notes || ' | ' || ?3 END,
                   updated_at = ?4
               WHERE phase_id = ?1
                 AND status = 'DRAFT'
                 AND (?2 IS NULL OR category_id = ?2)"#,
            params![phase_id, category_id, note, now.to_rfc3339()],
        )?;

        Ok(affected)
    }

    /// 锁定阶段内队伍名册（幂等, 只命中未锁定行）
    pub fn lock_rosters_in_phase(
        &self,
        phase_id: &str,
        category_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE teams
               SET roster_locked = 1, updated_at = ?3
               WHERE phase_id = ?1
                 AND roster_locked = 0
                 AND status != 'CANCELLED'
                 AND (?2 IS NULL OR category_id = ?2)"#,
            params![phase_id, category_id, now.to_rfc3339()],
        )?;

        Ok(affected)
    }

    /// 材料不齐的已批准队伍标记为资格不符（幂等, 只命中 APPROVED）
    ///
    /// 口径: 存在任一在役队员 documents_complete = 0 即不齐
    pub fn mark_ineligible_missing_documents(
        &self,
        phase_id: &str,
        category_id: Option<&str>,
        note: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE teams
               SET status = 'INELIGIBLE',
                   notes = CASE WHEN notes IS NULL OR notes = ''
                           THEN ?3 ELSE notes || ' | ' || ?3 END,
                   updated_at = ?4
               WHERE phase_id = ?1
                 AND status = 'APPROVED'
                 AND (?2 IS NULL OR category_id = ?2)
                 AND EXISTS (
                     SELECT 1 FROM team_participants tp
                     WHERE tp.team_id = teams.team_id
                       AND tp.status = 'ACTIVE'
                       AND tp.documents_complete = 0
                 )"#,
            params![phase_id, category_id, note, now.to_rfc3339()],
        )?;

        Ok(affected)
    }
}

const SELECT_TEAM: &str = r#"SELECT team_id, competition_id, school_id, category_id, phase_id,
       name, team_code, status, roster_locked, qualification_score,
       coach1_id, coach2_id, notes, created_by, created_at, updated_at
FROM teams"#;

/// 插入队伍行（事务内复用, 见 progression_repo）
pub(crate) fn insert_team_row(conn: &Connection, team: &Team) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"INSERT INTO teams (
            team_id, competition_id, school_id, category_id, phase_id,
            name, team_code, status, roster_locked, qualification_score,
            coach1_id, coach2_id, notes, created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &team.team_id,
            &team.competition_id,
            &team.school_id,
            &team.category_id,
            &team.phase_id,
            &team.name,
            &team.team_code,
            team.status.to_db_str(),
            if team.roster_locked { 1 } else { 0 },
            &team.qualification_score,
            &team.coach1_id,
            &team.coach2_id,
            &team.notes,
            &team.created_by,
            &team.created_at.to_rfc3339(),
            &team.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// 映射数据库行到 Team 对象（roster_repo 共用）
pub(crate) fn map_team_row(row: &rusqlite::Row) -> rusqlite::Result<Team> {
    let status_raw: String = row.get(7)?;
    let status = TeamStatus::from_str(&status_raw)
        .ok_or_else(|| bad_cell(7, format!("未知队伍状态: {}", status_raw)))?;

    Ok(Team {
        team_id: row.get(0)?,
        competition_id: row.get(1)?,
        school_id: row.get(2)?,
        category_id: row.get(3)?,
        phase_id: row.get(4)?,
        name: row.get(5)?,
        team_code: row.get(6)?,
        status,
        roster_locked: row.get::<_, i32>(8)? == 1,
        qualification_score: row.get(9)?,
        coach1_id: row.get(10)?,
        coach2_id: row.get(11)?,
        notes: row.get(12)?,
        created_by: row.get(13)?,
        created_at: parse_utc(14, row.get::<_, String>(14)?)?,
        updated_at: parse_utc(15, row.get::<_, String>(15)?)?,
    })
}

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn bad_cell(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}
