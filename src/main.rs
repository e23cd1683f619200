// ==========================================
// 青少年科创竞赛管理系统 - 管理控制台
// ==========================================
// 子命令:
//   status  [category_id]   查询当前报名状态
//   enforce                 执行一轮截止扫描
//   advance <phase_id>      选拔并晋级指定阶段
//   history <team_id>       查询队伍晋级台账
// 数据库路径: CONTEST_PROGRESSION_DB_PATH 可覆盖默认位置
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{Local, Utc};
use rusqlite::Connection;

use contest_progression::api::{DeadlineApi, ProgressionApi};
use contest_progression::config::ConfigManager;
use contest_progression::db;
use contest_progression::engine::{DeadlineEnforcer, NoOpReminderSink, RegistrationState};
use contest_progression::logging;
use contest_progression::repository::{
    CategoryRepository, CompetitionRepository, DeadlineRepository, NotificationRepository,
    PhaseRepository, ProgressionRepository, RosterRepository, TeamRepository,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "help".to_string());
    let db_path = db::default_db_path();

    match command.as_str() {
        "status" => {
            let category_id = args.next();
            cmd_status(&db_path, category_id.as_deref()).await
        }
        "enforce" => cmd_enforce(&db_path).await,
        "advance" => {
            let phase_id = args
                .next()
                .ok_or("用法: contest-progression advance <phase_id>")?;
            cmd_advance(&db_path, &phase_id).await
        }
        "history" => {
            let team_id = args
                .next()
                .ok_or("用法: contest-progression history <team_id>")?;
            cmd_history(&db_path, &team_id).await
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

// ==========================================
// 子命令实现
// ==========================================

async fn cmd_status(
    db_path: &str,
    category_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_database(db_path)?;
    let api = build_deadline_api(&conn)?;

    let view = api.registration_status(category_id, Utc::now()).await?;

    println!("阶段: {} ({})", view.phase_name, view.phase_id);
    if let Some(cid) = &view.category_id {
        println!("赛项: {}", cid);
    }
    match view.state {
        RegistrationState::Closing { days_remaining } => {
            println!("状态: CLOSING (距报名截止 {} 天)", days_remaining);
        }
        other => println!("状态: {}", other.as_str()),
    }
    println!(
        "可报名: {} / 可修改名册: {}",
        if view.state.allows_registration() { "是" } else { "否" },
        if view.state.allows_modification() { "是" } else { "否" }
    );
    println!("收窄窗口: {} 天", view.closing_window_days);
    println!("报名截止: {}", format_deadline(view.registration_deadline));
    println!("修改截止: {}", format_deadline(view.modification_deadline));
    println!("锁定时刻: {}", format_deadline(view.lock_deadline));
    Ok(())
}

async fn cmd_enforce(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_database(db_path)?;
    let api = build_deadline_api(&conn)?;

    let outcome = api.enforce_deadlines(Utc::now()).await?;

    println!("截止扫描完成:");
    println!("  过期草稿队伍: {}", outcome.expired);
    println!("  锁定名册队伍: {}", outcome.locked);
    println!("  标记资格不符: {}", outcome.marked_ineligible);
    println!(
        "  提醒已发: {} (当日去重跳过 {})",
        outcome.reminders_sent, outcome.reminders_skipped
    );
    Ok(())
}

async fn cmd_advance(db_path: &str, phase_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_database(db_path)?;
    let api = build_progression_api(&conn)?;

    let outcome = api
        .select_and_advance(phase_id, Local::now().date_naive())
        .await?;

    println!(
        "晋级完成: {} ({}) -> {}",
        outcome.from_phase_id,
        outcome.strategy.title_cn(),
        outcome.to_phase_id
    );
    println!(
        "  入选 {} / 落库 {} / 幂等跳过 {} / 失败 {}",
        outcome.total,
        outcome.advanced.len(),
        outcome.skipped,
        outcome.failed.len()
    );
    for adv in &outcome.advanced {
        let score = adv
            .score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [成功] {} -> {} (赛项 {}, 排名 {}, 分数 {})",
            adv.source_team_id, adv.new_team_code, adv.category_id, adv.rank, score
        );
    }
    for failed in &outcome.failed {
        println!(
            "  [失败] {} (赛项 {}, 排名 {}): {} [correlation_id={}]",
            failed.source_team_id,
            failed.category_id,
            failed.rank,
            failed.reason,
            failed.correlation_id
        );
    }
    Ok(())
}

async fn cmd_history(db_path: &str, team_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_database(db_path)?;
    let api = build_progression_api(&conn)?;

    let records = api.team_history(team_id).await?;

    if records.is_empty() {
        println!("队伍 {} 暂无晋级台账", team_id);
        return Ok(());
    }
    println!("队伍 {} 晋级台账 ({} 行):", team_id, records.len());
    for record in &records {
        let score = record
            .score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} -> {} (排名 {}, 分数 {}, 说明 {})",
            record.progression_date.format("%Y-%m-%d"),
            record.from_phase_id,
            record.to_phase_id,
            record.rank_in_category,
            score,
            record.advancement_reason.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn print_usage() {
    println!(
        "青少年科创竞赛管理系统 - 管理控制台 v{}",
        contest_progression::VERSION
    );
    println!();
    println!("用法:");
    println!("  contest-progression status [category_id]   查询当前报名状态");
    println!("  contest-progression enforce                执行一轮截止扫描");
    println!("  contest-progression advance <phase_id>     选拔并晋级指定阶段");
    println!("  contest-progression history <team_id>      查询队伍晋级台账");
    println!();
    println!("数据库路径: 环境变量 CONTEST_PROGRESSION_DB_PATH 可覆盖默认位置");
}

// ==========================================
// 装配
// ==========================================

fn open_database(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn std::error::Error>> {
    let conn = db::open_sqlite_connection(db_path)?;
    if db::read_schema_version(&conn)?.is_none() {
        return Err(format!(
            "数据库 {} 未初始化, 请先运行 seed_demo_competition",
            db_path
        )
        .into());
    }
    Ok(Arc::new(Mutex::new(conn)))
}

fn build_deadline_api(
    conn: &Arc<Mutex<Connection>>,
) -> Result<DeadlineApi, Box<dyn std::error::Error>> {
    let competition_repo = Arc::new(CompetitionRepository::new(conn.clone()));
    let phase_repo = Arc::new(PhaseRepository::new(conn.clone()));
    let deadline_repo = Arc::new(DeadlineRepository::new(conn.clone()));
    let team_repo = Arc::new(TeamRepository::new(conn.clone()));
    let notification_repo = Arc::new(NotificationRepository::new(conn.clone()));
    let config = Arc::new(ConfigManager::from_connection(conn.clone())?);

    let enforcer = Arc::new(DeadlineEnforcer::new(
        deadline_repo.clone(),
        phase_repo.clone(),
        team_repo,
        notification_repo,
        config.clone(),
        Arc::new(NoOpReminderSink),
    ));
    Ok(DeadlineApi::new(
        competition_repo,
        phase_repo,
        deadline_repo,
        enforcer,
        config,
    ))
}

fn build_progression_api(
    conn: &Arc<Mutex<Connection>>,
) -> Result<ProgressionApi, Box<dyn std::error::Error>> {
    let competition_repo = Arc::new(CompetitionRepository::new(conn.clone()));
    let phase_repo = Arc::new(PhaseRepository::new(conn.clone()));
    let category_repo = Arc::new(CategoryRepository::new(conn.clone()));
    let team_repo = Arc::new(TeamRepository::new(conn.clone()));
    let roster_repo = Arc::new(RosterRepository::new(conn.clone()));
    let progression_repo = Arc::new(ProgressionRepository::new(conn.clone()));
    let config = Arc::new(ConfigManager::from_connection(conn.clone())?);

    Ok(ProgressionApi::new(
        competition_repo,
        phase_repo,
        category_repo,
        team_repo,
        roster_repo,
        progression_repo,
        config,
    ))
}

fn format_deadline(deadline: Option<chrono::DateTime<Utc>>) -> String {
    deadline
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "未配置".to_string())
}
