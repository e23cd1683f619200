// ==========================================
// 青少年科创竞赛管理系统 - 学校数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::school::School;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SchoolRepository - 学校仓储
// ==========================================
pub struct SchoolRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SchoolRepository {
    /// 创建新的 SchoolRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 school_id 查询学校
    ///
    /// # 返回
    /// - `Ok(Some(School))`: 找到记录
    /// - `Ok(None)`: 未找到记录
    pub fn find_by_id(&self, school_id: &str) -> RepositoryResult<Option<School>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT school_id, name, district, contact_email, is_active,
                      created_at, updated_at
               FROM schools
               WHERE school_id = ?"#,
            params![school_id],
            |row| self.map_row(row),
        ) {
            Ok(school) => Ok(Some(school)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到 School 对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<School> {
        Ok(School {
            school_id: row.get(0)?,
            name: row.get(1)?,
            district: row.get(2)?,
            contact_email: row.get(3)?,
            is_active: row.get::<_, i32>(4)? == 1,
            created_at: parse_utc(5, row.get::<_, String>(5)?)?,
            updated_at: parse_utc(6, row.get::<_, String>(6)?)?,
        })
    }
}

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
