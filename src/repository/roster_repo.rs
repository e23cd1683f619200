// ==========================================
// 青少年科创竞赛管理系统 - 名册数据仓储
// ==========================================
// 职责: team_participants / team_coaches 两表读写
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::team::{TeamCoach, TeamParticipant};
use crate::domain::types::{
    BackgroundCheckStatus, CoachRole, EligibilityStatus, MemberStatus, ParticipantRole,
    QualificationStatus,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct RosterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RosterRepository {
    /// 创建新的 RosterRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 队员 (team_participants)
    // ==========================================

    /// 插入队员行
    pub fn insert_participant(&self, member: &TeamParticipant) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_participant_row(&conn, member)?;
        Ok(member.id.clone())
    }

    /// 查询队伍在役队员行
    pub fn list_active_participants(
        &self,
        team_id: &str,
    ) -> RepositoryResult<Vec<TeamParticipant>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE team_id = ? AND status = 'ACTIVE' ORDER BY id",
            SELECT_PARTICIPANT
        ))?;

        let members = stmt
            .query_map(params![team_id], |row| map_participant_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    /// 查询选手在 (赛项, 阶段) 内的在役队伍（跨队重复报名检测）
    ///
    /// 口径: 队员 ACTIVE 且队伍非 CANCELLED 才算占位
    ///
    /// # 参数
    /// - exclude_team_id: Some=排除该队伍 (校验本队名册时传本队)
    pub fn find_active_membership(
        &self,
        participant_id: &str,
        category_id: &str,
        phase_id: &str,
        exclude_team_id: Option<&str>,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT t.team_id
               FROM team_participants tp
               INNER JOIN teams t ON tp.team_id = t.team_id
               WHERE tp.participant_id = ?1
                 AND tp.status = 'ACTIVE'
                 AND t.category_id = ?2
                 AND t.phase_id = ?3
                 AND t.status != 'CANCELLED'
                 AND (?4 IS NULL OR t.team_id != ?4)
               ORDER BY t.team_id
               LIMIT 1"#,
            params![participant_id, category_id, phase_id, exclude_team_id],
            |row| row.get::<_, String>(0),
        ) {
            Ok(team_id) => Ok(Some(team_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 更新队员行状态
    pub fn update_participant_status(
        &self,
        id: &str,
        status: MemberStatus,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE team_participants SET status = ?, updated_at = ? WHERE id = ?",
            params![status.to_db_str(), now.to_rfc3339(), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TeamParticipant".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新队员行角色
    pub fn update_participant_role(
        &self,
        id: &str,
        role: ParticipantRole,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE team_participants SET role = ?, updated_at = ? WHERE id = ?",
            params![role.to_db_str(), now.to_rfc3339(), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TeamParticipant".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新队员行材料齐备标记
    pub fn set_documents_complete(
        &self,
        id: &str,
        complete: bool,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE team_participants SET documents_complete = ?, updated_at = ? WHERE id = ?",
            params![if complete { 1 } else { 0 }, now.to_rfc3339(), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TeamParticipant".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 教练 (team_coaches)
    // ==========================================

    /// 插入教练行
    pub fn insert_coach(&self, coach: &TeamCoach) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_coach_row(&conn, coach)?;
        Ok(coach.id.clone())
    }

    /// 查询队伍在役教练行
    pub fn list_active_coaches(&self, team_id: &str) -> RepositoryResult<Vec<TeamCoach>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE team_id = ? AND status = 'ACTIVE' ORDER BY id",
            SELECT_COACH
        ))?;

        let coaches = stmt
            .query_map(params![team_id], |row| map_coach_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(coaches)
    }

}

const SELECT_PARTICIPANT: &str = r#"SELECT id, team_id, participant_id, role, status,
       eligibility_status, documents_complete, joined_date, created_at, updated_at
FROM team_participants"#;

const SELECT_COACH: &str = r#"SELECT id, team_id, user_id, coach_role, status,
       qualification_status, background_check_status, training_completed,
       assigned_date, created_at, updated_at
FROM team_coaches"#;

/// 插入队员行（事务内复用, 见 progression_repo）
pub(crate) fn insert_participant_row(
    conn: &Connection,
    member: &TeamParticipant,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"INSERT INTO team_participants (
            id, team_id, participant_id, role, status,
            eligibility_status, documents_complete, joined_date, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &member.id,
            &member.team_id,
            &member.participant_id,
            member.role.to_db_str(),
            member.status.to_db_str(),
            member.eligibility_status.to_db_str(),
            if member.documents_complete { 1 } else { 0 },
            member.joined_date.format("%Y-%m-%d").to_string(),
            &member.created_at.to_rfc3339(),
            &member.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// 插入教练行（事务内复用, 见 progression_repo）
pub(crate) fn insert_coach_row(
    conn: &Connection,
    coach: &TeamCoach,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"INSERT INTO team_coaches (
            id, team_id, user_id, coach_role, status,
            qualification_status, background_check_status, training_completed,
            assigned_date, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &coach.id,
            &coach.team_id,
            &coach.user_id,
            coach.coach_role.to_db_str(),
            coach.status.to_db_str(),
            coach.qualification_status.to_db_str(),
            coach.background_check_status.to_db_str(),
            if coach.training_completed { 1 } else { 0 },
            coach.assigned_date.format("%Y-%m-%d").to_string(),
            &coach.created_at.to_rfc3339(),
            &coach.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn map_participant_row(row: &rusqlite::Row) -> rusqlite::Result<TeamParticipant> {
    let role_raw: String = row.get(3)?;
    let role = ParticipantRole::from_str(&role_raw)
        .ok_or_else(|| bad_cell(3, format!("未知队员角色: {}", role_raw)))?;
    let status_raw: String = row.get(4)?;
    let status = MemberStatus::from_str(&status_raw)
        .ok_or_else(|| bad_cell(4, format!("未知成员状态: {}", status_raw)))?;
    let elig_raw: String = row.get(5)?;
    let eligibility_status = EligibilityStatus::from_str(&elig_raw)
        .ok_or_else(|| bad_cell(5, format!("未知资格状态: {}", elig_raw)))?;

    Ok(TeamParticipant {
        id: row.get(0)?,
        team_id: row.get(1)?,
        participant_id: row.get(2)?,
        role,
        status,
        eligibility_status,
        documents_complete: row.get::<_, i32>(6)? == 1,
        joined_date: parse_date(7, row.get::<_, String>(7)?)?,
        created_at: parse_utc(8, row.get::<_, String>(8)?)?,
        updated_at: parse_utc(9, row.get::<_, String>(9)?)?,
    })
}

fn map_coach_row(row: &rusqlite::Row) -> rusqlite::Result<TeamCoach> {
    let role_raw: String = row.get(3)?;
    let coach_role = CoachRole::from_str(&role_raw)
        .ok_or_else(|| bad_cell(3, format!("未知教练角色: {}", role_raw)))?;
    let status_raw: String = row.get(4)?;
    let status = MemberStatus::from_str(&status_raw)
        .ok_or_else(|| bad_cell(4, format!("未知成员状态: {}", status_raw)))?;
    let qual_raw: String = row.get(5)?;
    let qualification_status = QualificationStatus::from_str(&qual_raw)
        .ok_or_else(|| bad_cell(5, format!("未知资质状态: {}", qual_raw)))?;
    let check_raw: String = row.get(6)?;
    let background_check_status = BackgroundCheckStatus::from_str(&check_raw)
        .ok_or_else(|| bad_cell(6, format!("未知背景核查状态: {}", check_raw)))?;

    Ok(TeamCoach {
        id: row.get(0)?,
        team_id: row.get(1)?,
        user_id: row.get(2)?,
        coach_role,
        status,
        qualification_status,
        background_check_status,
        training_completed: row.get::<_, i32>(7)? == 1,
        assigned_date: parse_date(8, row.get::<_, String>(8)?)?,
        created_at: parse_utc(9, row.get::<_, String>(9)?)?,
        updated_at: parse_utc(10, row.get::<_, String>(10)?)?,
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
