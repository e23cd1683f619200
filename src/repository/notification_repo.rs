// ==========================================
// 青少年科创竞赛管理系统 - 通知日志数据仓储
// ==========================================
// 去重: UNIQUE(recipient, notification_type, dedupe_day),
//       同收件人同类型同日只落一行, 重复写入静默吸收
// ==========================================

use crate::domain::deadline::NotificationLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct NotificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl NotificationRepository {
    /// 创建新的 NotificationRepository 实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 尝试落一行通知日志
    ///
    /// # 返回
    /// - Ok(true): 新行已写入, 应实际外发
    /// - Ok(false): 命中去重键, 今日已发过, 不再外发
    pub fn try_insert(&self, log: &NotificationLog) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let result = conn.execute(
            r#"INSERT INTO notification_log (
                id, recipient, notification_type, dedupe_day, subject, body, sent_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.id,
                &log.recipient,
                &log.notification_type,
                log.dedupe_day.format("%Y-%m-%d").to_string(),
                &log.subject,
                &log.body,
                &log.sent_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg))) if msg.contains("UNIQUE") => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
