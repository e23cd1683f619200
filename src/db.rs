// ==========================================
// 青少年科创竞赛管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - init_schema 提供内建建库，测试与种子工具共用同一份 DDL
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置 (含 SQL 计数/慢查询跟踪)
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 默认数据库路径
///
/// 解析顺序:
/// 1. 环境变量 CONTEST_PROGRESSION_DB_PATH（调试/测试/CI 显式指定）
/// 2. 用户数据目录 (开发构建用独立目录, 避免污染生产数据)
/// 3. 回退: 当前目录 ./contest_progression.db
pub fn default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CONTEST_PROGRESSION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./contest_progression.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("contest-progression-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("contest-progression");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("contest_progression.db");
    }

    path.to_string_lossy().to_string()
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建库（幂等）
///
/// 说明：
/// - 所有时间戳列存 TEXT（DateTime<Utc> → RFC3339，日期 → %Y-%m-%d）
/// - teams 上的部分唯一索引是容量抢占的存储层护栏:
///   同一 (school, category, phase) 非 CANCELLED 队伍至多一支
/// - phase_progressions 只追加, UNIQUE(team_id, to_phase_id) 保证
///   每 (源队伍, 目标阶段) 至多一行
/// - notification_log 的 UNIQUE 三元组是提醒去重护栏
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS schools (
            school_id     TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            district      TEXT NOT NULL,
            contact_email TEXT,
            is_active     INTEGER NOT NULL DEFAULT 1,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS participants (
            participant_id TEXT PRIMARY KEY,
            school_id      TEXT NOT NULL REFERENCES schools(school_id),
            full_name      TEXT NOT NULL,
            grade_label    TEXT NOT NULL,
            date_of_birth  TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_participants_school
            ON participants(school_id);

        CREATE TABLE IF NOT EXISTS coaches (
            coach_id   TEXT PRIMARY KEY,
            school_id  TEXT NOT NULL REFERENCES schools(school_id),
            full_name  TEXT NOT NULL,
            email      TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS competitions (
            competition_id TEXT PRIMARY KEY,
            name           TEXT NOT NULL,
            season_year    INTEGER NOT NULL,
            mode           TEXT NOT NULL DEFAULT 'FULL',
            team_size_min  INTEGER,
            team_size_max  INTEGER,
            is_active      INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            category_id       TEXT PRIMARY KEY,
            competition_id    TEXT NOT NULL REFERENCES competitions(competition_id),
            name              TEXT NOT NULL,
            code              TEXT NOT NULL,
            display_order     INTEGER NOT NULL DEFAULT 0,
            grade_range       TEXT,
            age_range         TEXT,
            min_participants  INTEGER,
            max_participants  INTEGER,
            team_size         INTEGER,
            composition_rules TEXT,
            is_active         INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_categories_competition
            ON categories(competition_id, is_active, display_order);

        CREATE TABLE IF NOT EXISTS phases (
            phase_id              TEXT PRIMARY KEY,
            competition_id        TEXT NOT NULL REFERENCES competitions(competition_id),
            name                  TEXT NOT NULL,
            phase_order           INTEGER NOT NULL,
            capacity_per_category INTEGER,
            district_balancing    INTEGER NOT NULL DEFAULT 0,
            starts_on             TEXT,
            ends_on               TEXT,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL,
            UNIQUE(competition_id, phase_order)
        );

        CREATE TABLE IF NOT EXISTS teams (
            team_id             TEXT PRIMARY KEY,
            competition_id      TEXT NOT NULL REFERENCES competitions(competition_id),
            school_id           TEXT NOT NULL REFERENCES schools(school_id),
            category_id         TEXT NOT NULL REFERENCES categories(category_id),
            phase_id            TEXT NOT NULL REFERENCES phases(phase_id),
            name                TEXT NOT NULL,
            team_code           TEXT NOT NULL UNIQUE,
            status              TEXT NOT NULL DEFAULT 'DRAFT',
            roster_locked       INTEGER NOT NULL DEFAULT 0,
            qualification_score REAL,
            coach1_id           TEXT REFERENCES coaches(coach_id),
            coach2_id           TEXT REFERENCES coaches(coach_id),
            notes               TEXT,
            created_by          TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS uq_teams_school_category_phase
            ON teams(school_id, category_id, phase_id)
            WHERE status != 'CANCELLED';
        CREATE INDEX IF NOT EXISTS idx_teams_phase_status
            ON teams(phase_id, status);
        CREATE INDEX IF NOT EXISTS idx_teams_category_phase
            ON teams(category_id, phase_id);

        CREATE TABLE IF NOT EXISTS team_participants (
            id                 TEXT PRIMARY KEY,
            team_id            TEXT NOT NULL REFERENCES teams(team_id),
            participant_id     TEXT NOT NULL REFERENCES participants(participant_id),
            role               TEXT NOT NULL DEFAULT 'REGULAR',
            status             TEXT NOT NULL DEFAULT 'ACTIVE',
            eligibility_status TEXT NOT NULL DEFAULT 'PENDING',
            documents_complete INTEGER NOT NULL DEFAULT 0,
            joined_date        TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_team_participants_team
            ON team_participants(team_id, status);
        CREATE INDEX IF NOT EXISTS idx_team_participants_participant
            ON team_participants(participant_id, status);

        CREATE TABLE IF NOT EXISTS team_coaches (
            id                      TEXT PRIMARY KEY,
            team_id                 TEXT NOT NULL REFERENCES teams(team_id),
            user_id                 TEXT NOT NULL REFERENCES coaches(coach_id),
            coach_role              TEXT NOT NULL DEFAULT 'PRIMARY',
            status                  TEXT NOT NULL DEFAULT 'ACTIVE',
            qualification_status    TEXT NOT NULL DEFAULT 'PENDING',
            background_check_status TEXT NOT NULL DEFAULT 'PENDING',
            training_completed      INTEGER NOT NULL DEFAULT 0,
            assigned_date           TEXT NOT NULL,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_team_coaches_team
            ON team_coaches(team_id, status);

        CREATE TABLE IF NOT EXISTS phase_progressions (
            id                 TEXT PRIMARY KEY,
            team_id            TEXT NOT NULL REFERENCES teams(team_id),
            from_phase_id      TEXT NOT NULL REFERENCES phases(phase_id),
            to_phase_id        TEXT NOT NULL REFERENCES phases(phase_id),
            progression_date   TEXT NOT NULL,
            score              REAL,
            rank_in_category   INTEGER NOT NULL,
            qualified          INTEGER NOT NULL DEFAULT 1,
            advancement_reason TEXT,
            competition_type   TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            UNIQUE(team_id, to_phase_id)
        );

        CREATE TABLE IF NOT EXISTS registration_deadlines (
            id                 TEXT PRIMARY KEY,
            phase_name         TEXT NOT NULL,
            category_id        TEXT REFERENCES categories(category_id),
            deadline_type      TEXT NOT NULL,
            deadline_date      TEXT NOT NULL,
            notification_sent  INTEGER NOT NULL DEFAULT 0,
            enforcement_active INTEGER NOT NULL DEFAULT 1,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_registration_deadlines_phase
            ON registration_deadlines(phase_name, deadline_type);

        CREATE TABLE IF NOT EXISTS notification_log (
            id                TEXT PRIMARY KEY,
            recipient         TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            dedupe_day        TEXT NOT NULL,
            subject           TEXT NOT NULL,
            body              TEXT NOT NULL,
            sent_at           TEXT NOT NULL,
            UNIQUE(recipient, notification_type, dedupe_day)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id   TEXT NOT NULL DEFAULT 'global',
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
