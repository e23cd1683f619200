// ==========================================
// 青少年科创竞赛管理系统 - 报名截止数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 口径: 截止行按阶段名挂载, category_id 为空表示全赛项通用,
//       同键同类型下赛项专属行优先于通用行
// ==========================================

use crate::domain::deadline::RegistrationDeadline;
use crate::domain::types::DeadlineType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct DeadlineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeadlineRepository {
    /// 创建新的 DeadlineRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询 (阶段, 类型, 赛项) 适用的截止行
    ///
    /// 匹配顺序: 赛项专属行优先, 无专属行时回退到通用行 (category_id IS NULL)
    pub fn find_applicable(
        &self,
        phase_name: &str,
        deadline_type: DeadlineType,
        category_id: Option<&str>,
    ) -> RepositoryResult<Option<RegistrationDeadline>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!(
                r#"{} WHERE phase_name = ?1 AND deadline_type = ?2
                   AND (category_id = ?3 OR category_id IS NULL)
                   ORDER BY (category_id IS NULL), deadline_date
                   LIMIT 1"#,
                SELECT_DEADLINE
            ),
            params![phase_name, deadline_type.to_db_str(), category_id],
            |row| map_deadline_row(row),
        ) {
            Ok(deadline) => Ok(Some(deadline)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部执法开启的截止行（时间升序）
    pub fn list_active(&self) -> RepositoryResult<Vec<RegistrationDeadline>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE enforcement_active = 1 ORDER BY deadline_date, id",
            SELECT_DEADLINE
        ))?;

        let deadlines = stmt
            .query_map([], |row| map_deadline_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deadlines)
    }

    /// 标记首轮提醒已发送（幂等）
    pub fn mark_notification_sent(&self, id: &str, now: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE registration_deadlines SET notification_sent = 1, updated_at = ? WHERE id = ?",
            params![now.to_rfc3339(), id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RegistrationDeadline".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

const SELECT_DEADLINE: &str = r#"SELECT id, phase_name, category_id, deadline_type,
       deadline_date, notification_sent, enforcement_active, created_at, updated_at
FROM registration_deadlines"#;

fn map_deadline_row(row: &rusqlite::Row) -> rusqlite::Result<RegistrationDeadline> {
    let type_raw: String = row.get(3)?;
    let deadline_type = DeadlineType::from_str(&type_raw)
        .ok_or_else(|| bad_cell(3, format!("未知截止类型: {}", type_raw)))?;

    Ok(RegistrationDeadline {
        id: row.get(0)?,
        phase_name: row.get(1)?,
        category_id: row.get(2)?,
        deadline_type,
        deadline_date: parse_utc(4, row.get::<_, String>(4)?)?,
        notification_sent: row.get::<_, i32>(5)? == 1,
        enforcement_active: row.get::<_, i32>(6)? == 1,
        created_at: parse_utc(7, row.get::<_, String>(7)?)?,
        updated_at: parse_utc(8, row.get::<_, String>(8)?)?,
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
