// ==========================================
// 青少年科创竞赛管理系统 - 赛项数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::category::{Category, CompositionRules};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CategoryRepository - 赛项仓储
// ==========================================
pub struct CategoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CategoryRepository {
    /// 创建新的 CategoryRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 category_id 查询赛项
    pub fn find_by_id(&self, category_id: &str) -> RepositoryResult<Option<Category>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT category_id, competition_id, name, code, display_order,
                      grade_range, age_range,
                      min_participants, max_participants, team_size,
                      composition_rules, is_active, created_at, updated_at
               FROM categories
               WHERE category_id = ?"#,
            params![category_id],
            |row| self.map_row(row),
        ) {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询赛事下所有开放赛项（展示顺序）
    pub fn list_active_by_competition(
        &self,
        competition_id: &str,
    ) -> RepositoryResult<Vec<Category>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT category_id, competition_id, name, code, display_order,
                      grade_range, age_range,
                      min_participants, max_participants, team_size,
                      composition_rules, is_active, created_at, updated_at
               FROM categories
               WHERE competition_id = ? AND is_active = 1
               ORDER BY display_order, name"#,
        )?;

        let categories = stmt
            .query_map(params![competition_id], |row| self.map_row(row))?
            .collect::<Result<Vec<Category>, _>>()?;

        Ok(categories)
    }

    /// 映射数据库行到 Category 对象
    ///
    /// 说明: composition_rules 列格式错误时整行报错,
    /// 不静默当作"无规则"处理
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Category> {
        let rules = match row.get::<_, Option<String>>(10)? {
            None => None,
            Some(raw) => CompositionRules::from_json(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        };

        Ok(Category {
            category_id: row.get(0)?,
            competition_id: row.get(1)?,
            name: row.get(2)?,
            code: row.get(3)?,
            display_order: row.get(4)?,
            grade_range: row.get(5)?,
            age_range: row.get(6)?,
            min_participants: row.get(7)?,
            max_participants: row.get(8)?,
            team_size: row.get(9)?,
            composition_rules: rules,
            is_active: row.get::<_, i32>(11)? == 1,
            created_at: parse_utc(12, row.get::<_, String>(12)?)?,
            updated_at: parse_utc(13, row.get::<_, String>(13)?)?,
        })
    }
}

fn parse_utc(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
