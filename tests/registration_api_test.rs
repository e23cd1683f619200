// ==========================================
// 报名 API 集成测试
// 覆盖: 容量预检 -> 建队 -> 满员拒绝 -> 并发唯一胜者
// 以及已取消队伍释放名额、可报名概览排序、非法入参
// ==========================================

mod helpers;

use std::sync::Arc;

use contest_progression::api::{ApiError, RegistrationApi};
use contest_progression::config::ConfigManager;
use contest_progression::domain::types::{ActorContext, TeamStatus};
use contest_progression::engine::CapacityValidator;
use contest_progression::logging;
use contest_progression::repository::{
    CategoryRepository, CompetitionRepository, PhaseRepository, SchoolRepository, TeamRepository,
};

use helpers::test_data_builder::TeamSeed;
use test_helpers::{
    create_test_db, insert_test_config, open_test_connection, query_count, seed_base_scenario,
    set_config, CAT_CODING, CAT_ROBOT, PHASE1, SCHOOL_EAST_1,
};

// ==========================================
// 辅助函数
// ==========================================

fn build_registration_api(db_path: &str) -> RegistrationApi {
    let conn = test_helpers::shared_connection(db_path).expect("打开共享连接失败");
    let config =
        Arc::new(ConfigManager::from_connection(Arc::clone(&conn)).expect("加载配置失败"));

    RegistrationApi::new(
        Arc::new(SchoolRepository::new(Arc::clone(&conn))),
        Arc::new(CategoryRepository::new(Arc::clone(&conn))),
        Arc::new(CompetitionRepository::new(Arc::clone(&conn))),
        Arc::new(PhaseRepository::new(Arc::clone(&conn))),
        Arc::new(TeamRepository::new(Arc::clone(&conn))),
        Arc::new(CapacityValidator::new(config)),
    )
}

fn tester() -> ActorContext {
    ActorContext::new("U-1", "测试员")
}

// ==========================================
// 测试 1: 容量预检 -> 建队 -> 满员拒绝
// ==========================================

#[tokio::test]
async fn test_registration_capacity_flow() {
    logging::init_test();
    println!("\n=== 测试：报名容量全流程 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    let api = build_registration_api(&db_path);

    // === 步骤 1: 空库预检, 名额充足 ===
    let check = api
        .validate_registration(SCHOOL_EAST_1, CAT_ROBOT)
        .await
        .expect("预检失败");
    assert!(check.can_register, "空库应可报名");
    assert_eq!(check.remaining_slots, 1, "默认限额 1, 剩余应为 1");
    assert!(check.reason.is_none(), "可报名时不应有拒绝原因");
    println!("✓ 步骤 1: 预检通过, 剩余名额 {}", check.remaining_slots);

    // === 步骤 2: 建队, 生成草稿队伍与编号 ===
    let team = api
        .register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人一队", &tester())
        .await
        .expect("建队失败");
    assert!(matches!(team.status, TeamStatus::Draft), "新队应为草稿态");
    assert_eq!(team.phase_id, PHASE1, "新队应落在入口阶段");
    assert!(
        team.team_code.starts_with("ROB-P1-"),
        "队伍编号应带赛项与阶段前缀: {}",
        team.team_code
    );
    println!("✓ 步骤 2: 建队成功 {} ({})", team.team_id, team.team_code);

    // === 步骤 3: 名额耗尽, 预检转为不可报名 ===
    let check = api
        .validate_registration(SCHOOL_EAST_1, CAT_ROBOT)
        .await
        .expect("预检失败");
    assert!(!check.can_register, "限额已满应不可报名");
    assert_eq!(check.remaining_slots, 0, "剩余名额应为 0");
    assert!(check.reason.is_some(), "应给出拒绝原因");
    println!("✓ 步骤 3: 满员预检给出原因: {:?}", check.reason);

    // === 步骤 4: 再次建队被拒 ===
    let err = api
        .register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人二队", &tester())
        .await
        .expect_err("满员后建队应失败");
    assert!(
        matches!(err, ApiError::CapacityExceeded(_)),
        "满员应返回容量超限: {:?}",
        err
    );
    assert!(!err.is_retryable(), "容量超限不可重试");

    let teams = query_count(
        &conn,
        "SELECT COUNT(*) FROM teams WHERE school_id = 'SCH-E1' AND category_id = 'CAT-ROB'",
    )
    .expect("查询失败");
    assert_eq!(teams, 1, "数据库应只有 1 支队伍");
    println!("✓ 步骤 4: 满员建队拒绝, 数据库无多余行");

    println!("\n=== 测试通过：报名容量全流程 ===\n");
}

// ==========================================
// 测试 2: 预检通过但插入撞唯一约束, 升格为可重试冲突
// ==========================================

#[tokio::test]
async fn test_registration_race_surfaces_retryable_conflict() {
    logging::init_test();
    println!("\n=== 测试：报名竞态冲突可重试 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    // 配置限额 2, 使第二次报名通过名额预检;
    // 唯一索引仍只允许每 (学校, 赛项, 阶段) 一支未取消队伍
    set_config(&conn, "category_team_limit", "2").expect("覆写配置失败");

    let api = build_registration_api(&db_path);

    api.register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人一队", &tester())
        .await
        .expect("首次建队失败");
    println!("✓ 步骤 1: 首次建队成功");

    let err = api
        .register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人二队", &tester())
        .await
        .expect_err("第二次建队应撞唯一约束");
    assert!(
        matches!(err, ApiError::CapacityRace(_)),
        "唯一约束冲突应升格为竞态错误: {:?}",
        err
    );
    assert!(err.is_retryable(), "竞态冲突应标记可重试");

    let teams = query_count(
        &conn,
        "SELECT COUNT(*) FROM teams WHERE school_id = 'SCH-E1' AND category_id = 'CAT-ROB' AND status != 'CANCELLED'",
    )
    .expect("查询失败");
    assert_eq!(teams, 1, "冲突后数据库应只有 1 支未取消队伍");
    println!("✓ 步骤 2: 冲突升格为可重试错误, 数据一致");

    println!("\n=== 测试通过：竞态冲突可重试 ===\n");
}

// ==========================================
// 测试 3: 并发报名唯一胜者
// ==========================================

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    logging::init_test();
    println!("\n=== 测试：并发报名唯一胜者 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    let api = Arc::new(build_registration_api(&db_path));

    // === 步骤 1: 两个任务同时抢同一 (学校, 赛项) 名额 ===
    let api_a = Arc::clone(&api);
    let api_b = Arc::clone(&api);
    let task_a = tokio::spawn(async move {
        api_a
            .register_team(SCHOOL_EAST_1, CAT_ROBOT, "并发甲队", &tester())
            .await
    });
    let task_b = tokio::spawn(async move {
        api_b
            .register_team(SCHOOL_EAST_1, CAT_ROBOT, "并发乙队", &tester())
            .await
    });

    let result_a = task_a.await.expect("任务甲崩溃");
    let result_b = task_b.await.expect("任务乙崩溃");

    // === 步骤 2: 恰好一胜一败 ===
    let winners = [&result_a, &result_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "并发报名应恰好一个成功");

    let loser_err = if result_a.is_err() {
        result_a.expect_err("甲应失败")
    } else {
        result_b.expect_err("乙应失败")
    };
    assert!(
        matches!(
            loser_err,
            ApiError::CapacityExceeded(_) | ApiError::CapacityRace(_)
        ),
        "败者应收到容量类错误: {:?}",
        loser_err
    );
    println!("✓ 步骤 2: 败者错误类型 {:?}", loser_err);

    // === 步骤 3: 数据库只留一支未取消队伍 ===
    let teams = query_count(
        &conn,
        "SELECT COUNT(*) FROM teams WHERE school_id = 'SCH-E1' AND category_id = 'CAT-ROB' AND status != 'CANCELLED'",
    )
    .expect("查询失败");
    assert_eq!(teams, 1, "并发后应只有 1 支未取消队伍");
    println!("✓ 步骤 3: 数据库唯一胜者");

    println!("\n=== 测试通过：并发报名唯一胜者 ===\n");
}

// ==========================================
// 测试 4: 已取消队伍释放名额
// ==========================================

#[tokio::test]
async fn test_cancelled_team_frees_slot() {
    logging::init_test();
    println!("\n=== 测试：已取消队伍不占名额 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    // 同 (学校, 赛项, 阶段) 已有一支已取消队伍
    TeamSeed::new("T-OLD", SCHOOL_EAST_1, CAT_ROBOT, PHASE1)
        .status("CANCELLED")
        .insert(&conn)
        .expect("插入已取消队伍失败");

    let api = build_registration_api(&db_path);

    let check = api
        .validate_registration(SCHOOL_EAST_1, CAT_ROBOT)
        .await
        .expect("预检失败");
    assert!(check.can_register, "已取消队伍不应占名额");

    let team = api
        .register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人新队", &tester())
        .await
        .expect("建队应成功");
    assert!(matches!(team.status, TeamStatus::Draft));
    println!("✓ 已取消队伍释放名额, 新队建立成功");

    println!("\n=== 测试通过：已取消队伍不占名额 ===\n");
}

// ==========================================
// 测试 5: 可报名概览, 可报名赛项排前
// ==========================================

#[tokio::test]
async fn test_availability_summary_orders_open_first() {
    logging::init_test();
    println!("\n=== 测试：可报名概览排序 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    let api = build_registration_api(&db_path);

    // 占满机器人赛项名额, 编程赛项保持空闲
    api.register_team(SCHOOL_EAST_1, CAT_ROBOT, "一中机器人一队", &tester())
        .await
        .expect("建队失败");

    let summary = api
        .availability_summary(SCHOOL_EAST_1)
        .await
        .expect("查询概览失败");
    assert_eq!(summary.school_id, SCHOOL_EAST_1);
    assert_eq!(summary.phase_id, PHASE1, "概览应基于入口阶段");
    assert_eq!(summary.categories.len(), 2, "应覆盖两个赛项");

    let first = &summary.categories[0];
    let second = &summary.categories[1];
    assert_eq!(first.category_id, CAT_CODING, "可报名赛项应排前");
    assert!(first.can_register);
    assert_eq!(first.existing_count, 0);
    assert_eq!(first.remaining_slots, 1);

    assert_eq!(second.category_id, CAT_ROBOT, "满员赛项应排后");
    assert!(!second.can_register);
    assert_eq!(second.existing_count, 1);
    assert_eq!(second.remaining_slots, 0);
    println!("✓ 概览排序与名额数字正确");

    println!("\n=== 测试通过：可报名概览排序 ===\n");
}

// ==========================================
// 测试 6: 未知主数据与空入参
// ==========================================

#[tokio::test]
async fn test_validate_registration_unknown_ids() {
    logging::init_test();
    println!("\n=== 测试：预检非法入参防护 ===");

    let (_tmp, db_path) = create_test_db().expect("创建测试数据库失败");
    let conn = open_test_connection(&db_path).expect("打开连接失败");
    insert_test_config(&conn).expect("写入配置失败");
    seed_base_scenario(&conn).expect("播种基础场景失败");

    let api = build_registration_api(&db_path);

    let err = api
        .validate_registration("SCH-NONE", CAT_ROBOT)
        .await
        .expect_err("未知学校应报错");
    assert!(matches!(err, ApiError::NotFound(_)), "未知学校: {:?}", err);

    let err = api
        .validate_registration(SCHOOL_EAST_1, "CAT-NONE")
        .await
        .expect_err("未知赛项应报错");
    assert!(matches!(err, ApiError::NotFound(_)), "未知赛项: {:?}", err);

    let err = api
        .validate_registration("", CAT_ROBOT)
        .await
        .expect_err("空学校ID应报错");
    assert!(
        matches!(err, ApiError::InvalidInput(_)),
        "空学校ID: {:?}",
        err
    );
    println!("✓ 未知学校/赛项与空入参均被拒绝");

    println!("\n=== 测试通过：预检入参防护 ===\n");
}
