// ==========================================
// 演示数据库构建工具
// ==========================================
// 用法: seed_demo_competition [db_path]
// 重建数据库并灌入一届 FULL 模式演示赛事:
// 三个阶段、两个赛项、六所学校、已批准队伍与名册、
// 入口阶段截止配置。旧库自动备份后删除。
// ==========================================

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::{Duration, Local, Utc};
use rusqlite::{params, Connection};

use contest_progression::db;

const COMPETITION_ID: &str = "CMP-2026";
const PHASE_SCHOOL: &str = "PH-SCHOOL";
const PHASE_REGION: &str = "PH-REGION";
const PHASE_FINAL: &str = "PH-FINAL";
const CATEGORY_ROBOT: &str = "CAT-ROBOT";
const CATEGORY_CODING: &str = "CAT-CODING";

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(db::default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    seed_demo_competition(&conn)?;
    print_quick_counts(&conn)?;

    println!("演示数据库就绪: {}", db_path);
    println!("可执行: contest-progression status / enforce / advance {}", PHASE_SCHOOL);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("已备份 {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_demo_competition(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let now_rfc3339 = now.to_rfc3339();
    let today = Local::now().date_naive();

    let tx = conn.unchecked_transaction()?;

    // 全局配置
    let config_rows = [
        ("category_team_limit", "1"),
        ("full_team_size_min", "3"),
        ("full_team_size_max", "6"),
        ("max_coaches_per_team", "2"),
        ("closing_window_days", "7"),
        ("reminder_threshold_days", "7,3,1"),
        ("full_phase1_advance_quota", "4"),
        ("full_phase2_advance_quota", "2"),
    ];
    for (key, value) in config_rows {
        tx.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)",
            params![key, value, now_rfc3339],
        )?;
    }

    // 学校 (三个区, 每区两所)
    let schools = [
        ("SCH-001", "市第一中学", "东区"),
        ("SCH-002", "实验中学", "东区"),
        ("SCH-003", "市第二中学", "西区"),
        ("SCH-004", "外国语学校", "西区"),
        ("SCH-005", "科技高中", "北区"),
        ("SCH-006", "育才中学", "北区"),
    ];
    for (school_id, name, district) in schools {
        tx.execute(
            r#"
            INSERT INTO schools (school_id, name, district, contact_email, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            "#,
            params![
                school_id,
                name,
                district,
                format!("contact@{}.edu.cn", school_id.to_lowercase()),
                now_rfc3339
            ],
        )?;
    }

    // 教练 (每校一名)
    let coach_names = ["张建国", "李卫东", "王秀兰", "刘志强", "陈雅静", "赵国庆"];
    for (idx, (school_id, _, _)) in schools.iter().enumerate() {
        tx.execute(
            r#"
            INSERT INTO coaches (coach_id, school_id, full_name, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                format!("COA-{:03}", idx + 1),
                school_id,
                coach_names[idx],
                format!("coach{}@example.cn", idx + 1),
                now_rfc3339
            ],
        )?;
    }

    // 赛事 (FULL 模式, 当前活动)
    tx.execute(
        r#"
        INSERT INTO competitions (competition_id, name, season_year, mode, team_size_min, team_size_max, is_active, created_at, updated_at)
        VALUES (?1, '2026 青少年科技创新大赛', 2026, 'FULL', 3, 6, 1, ?2, ?2)
        "#,
        params![COMPETITION_ID, now_rfc3339],
    )?;

    // 阶段 1-3: 区域赛启用区域均衡并覆盖每赛项容量
    let phases: [(&str, &str, i32, Option<i64>, i32); 3] = [
        (PHASE_SCHOOL, "校内赛", 1, None, 0),
        (PHASE_REGION, "区域赛", 2, Some(4), 1),
        (PHASE_FINAL, "市级决赛", 3, Some(2), 0),
    ];
    for (phase_id, name, order, capacity, balancing) in phases {
        tx.execute(
            r#"
            INSERT INTO phases (phase_id, competition_id, name, phase_order, capacity_per_category, district_balancing, starts_on, ends_on, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                phase_id,
                COMPETITION_ID,
                name,
                order,
                capacity,
                balancing,
                (today + Duration::days(30 * order as i64)).format("%Y-%m-%d").to_string(),
                (today + Duration::days(30 * order as i64 + 2)).format("%Y-%m-%d").to_string(),
                now_rfc3339
            ],
        )?;
    }

    // 赛项
    let categories = [
        (CATEGORY_ROBOT, "机器人挑战", "ROB", 1, 3, 6),
        (CATEGORY_CODING, "创意编程", "COD", 2, 1, 3),
    ];
    for (category_id, name, code, order, min_p, max_p) in categories {
        tx.execute(
            r#"
            INSERT INTO categories (category_id, competition_id, name, code, display_order, grade_range, age_range, min_participants, max_participants, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, '7-9', '12-16', ?6, ?7, 1, ?8, ?8)
            "#,
            params![category_id, COMPETITION_ID, name, code, order, min_p, max_p, now_rfc3339],
        )?;
    }

    // 队伍: 机器人 6 支已批准 + 创意编程 3 支已批准 + 1 支草稿
    // (school_idx, category, 队名, code, status, score)
    let teams: [(usize, &str, &str, &str, &str, Option<f64>); 10] = [
        (0, CATEGORY_ROBOT, "铁甲先锋队", "ROB-SCH-001", "APPROVED", Some(95.5)),
        (1, CATEGORY_ROBOT, "齿轮蜂群队", "ROB-SCH-002", "APPROVED", Some(92.0)),
        (2, CATEGORY_ROBOT, "星际拓荒队", "ROB-SCH-003", "APPROVED", Some(90.5)),
        (3, CATEGORY_ROBOT, "光速引擎队", "ROB-SCH-004", "APPROVED", Some(88.0)),
        (4, CATEGORY_ROBOT, "量子跃迁队", "ROB-SCH-005", "APPROVED", Some(86.5)),
        (5, CATEGORY_ROBOT, "北斗七星队", "ROB-SCH-006", "APPROVED", Some(84.0)),
        (0, CATEGORY_CODING, "代码旅人队", "COD-SCH-001", "APPROVED", Some(93.0)),
        (2, CATEGORY_CODING, "像素诗社队", "COD-SCH-002", "APPROVED", Some(89.5)),
        (4, CATEGORY_CODING, "递归之森队", "COD-SCH-003", "APPROVED", Some(87.0)),
        (5, CATEGORY_CODING, "雏鹰启航队", "COD-SCH-004", "DRAFT", None),
    ];

    let member_names = [
        "王子涵", "李梓萱", "张浩然", "刘雨桐", "陈思远", "杨欣怡",
        "赵文博", "黄诗涵", "周子墨", "吴佳宁", "徐浩宇", "孙艺馨",
        "朱俊杰", "胡雅文", "郭天睿", "林若曦", "何启航", "高心悦",
        "罗泽宇", "郑欣然", "梁子轩", "谢雨泽", "唐诗雅", "韩明轩",
        "冯可欣", "曹宇航", "彭静怡", "董子豪", "袁梦瑶", "潘志远",
    ];
    let grades = ["7年级", "8年级", "9年级"];
    let birth_dates = ["2012-03-15", "2013-06-02", "2011-11-28"];
    let joined = (today - Duration::days(20)).format("%Y-%m-%d").to_string();
    let assigned = (today - Duration::days(25)).format("%Y-%m-%d").to_string();

    for (team_idx, (school_idx, category_id, team_name, team_code, status, score)) in
        teams.iter().enumerate()
    {
        let team_id = format!("TEAM-{:03}", team_idx + 1);
        let school_id = schools[*school_idx].0;
        let coach_id = format!("COA-{:03}", school_idx + 1);

        tx.execute(
            r#"
            INSERT INTO teams (team_id, competition_id, school_id, category_id, phase_id, name, team_code, status, roster_locked, qualification_score, coach1_id, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, 'seed', ?11, ?11)
            "#,
            params![
                team_id,
                COMPETITION_ID,
                school_id,
                category_id,
                PHASE_SCHOOL,
                team_name,
                team_code,
                status,
                score,
                coach_id,
                now_rfc3339
            ],
        )?;

        // 每队三名选手: 队长一名 + 队员两名
        for member in 0..3 {
            let participant_id = format!("PAR-{:03}{}", team_idx + 1, member + 1);
            tx.execute(
                r#"
                INSERT INTO participants (participant_id, school_id, full_name, grade_label, date_of_birth, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                "#,
                params![
                    participant_id,
                    school_id,
                    member_names[(team_idx * 3 + member) % member_names.len()],
                    grades[member],
                    birth_dates[member],
                    now_rfc3339
                ],
            )?;

            let role = if member == 0 { "TEAM_LEADER" } else { "REGULAR" };
            tx.execute(
                r#"
                INSERT INTO team_participants (id, team_id, participant_id, role, status, eligibility_status, documents_complete, joined_date, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, 'ACTIVE', 'ELIGIBLE', 1, ?5, ?6, ?6)
                "#,
                params![
                    format!("TP-{:03}{}", team_idx + 1, member + 1),
                    team_id,
                    participant_id,
                    role,
                    joined,
                    now_rfc3339
                ],
            )?;
        }

        tx.execute(
            r#"
            INSERT INTO team_coaches (id, team_id, user_id, coach_role, status, qualification_status, background_check_status, training_completed, assigned_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'PRIMARY', 'ACTIVE', 'QUALIFIED', 'VERIFIED', 1, ?4, ?5, ?5)
            "#,
            params![
                format!("TC-{:03}", team_idx + 1),
                team_id,
                coach_id,
                assigned,
                now_rfc3339
            ],
        )?;
    }

    // 入口阶段截止: 报名 3 天后收窄提醒, 材料提交仅对机器人赛项
    let deadlines: [(&str, Option<&str>, &str, i64); 4] = [
        ("DL-REG", None, "TEAM_REGISTRATION", 3),
        ("DL-MOD", None, "MODIFICATION", 10),
        ("DL-LOCK", None, "LOCK", 17),
        ("DL-DOC-ROB", Some(CATEGORY_ROBOT), "DOCUMENT_SUBMISSION", 7),
    ];
    for (id, category_id, deadline_type, days_ahead) in deadlines {
        tx.execute(
            r#"
            INSERT INTO registration_deadlines (id, phase_name, category_id, deadline_type, deadline_date, notification_sent, enforcement_active, created_at, updated_at)
            VALUES (?1, '校内赛', ?2, ?3, ?4, 0, 1, ?5, ?5)
            "#,
            params![
                id,
                category_id,
                deadline_type,
                (now + Duration::days(days_ahead)).to_rfc3339(),
                now_rfc3339
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let tables = [
        "schools",
        "coaches",
        "participants",
        "competitions",
        "categories",
        "phases",
        "teams",
        "team_participants",
        "team_coaches",
        "registration_deadlines",
        "config_kv",
    ];
    println!("数据概览:");
    for table in tables {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        println!("  {:24} {}", table, count);
    }
    Ok(())
}
