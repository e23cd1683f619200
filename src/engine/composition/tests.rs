use super::core::{CompositionValidator, TeamCompositionInput};
use crate::config::CompetitionConfigReader;
use crate::domain::category::{Category, CompositionRules};
use crate::domain::competition::Competition;
use crate::domain::participant::Participant;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::{
    BackgroundCheckStatus, CoachRole, CompetitionMode, EligibilityStatus, MemberStatus,
    ParticipantRole, QualificationStatus, TeamStatus, ValidationContext,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 测试辅助
// ==========================================

struct MockConfigReader;

#[async_trait]
impl CompetitionConfigReader for MockConfigReader {
    async fn get_category_team_limit(&self) -> Result<i64, Box<dyn Error>> {
        Ok(1)
    }
    async fn get_pilot_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
        Ok(2)
    }
    async fn get_pilot_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
        Ok(4)
    }
    async fn get_full_team_size_min(&self) -> Result<i32, Box<dyn Error>> {
        Ok(1)
    }
    async fn get_full_team_size_max(&self) -> Result<i32, Box<dyn Error>> {
        Ok(6)
    }
    async fn get_team_size_bounds(
        &self,
        mode: CompetitionMode,
    ) -> Result<(i32, i32), Box<dyn Error>> {
        match mode {
            CompetitionMode::Pilot => Ok((2, 4)),
            CompetitionMode::Full => Ok((1, 6)),
        }
    }
    async fn get_max_coaches_per_team(&self) -> Result<i32, Box<dyn Error>> {
        Ok(2)
    }
    async fn get_closing_window_days(&self) -> Result<i64, Box<dyn Error>> {
        Ok(7)
    }
    async fn get_reminder_threshold_days(&self) -> Result<Vec<i64>, Box<dyn Error>> {
        Ok(vec![7, 3, 1])
    }
    async fn get_pilot_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        Ok(6)
    }
    async fn get_full_phase1_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        Ok(15)
    }
    async fn get_full_phase2_advance_quota(&self) -> Result<i64, Box<dyn Error>> {
        Ok(6)
    }
}

fn validator() -> CompositionValidator<MockConfigReader> {
    CompositionValidator::new(Arc::new(MockConfigReader))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
}

fn create_test_competition(mode: CompetitionMode) -> Competition {
    Competition {
        competition_id: "CMP001".to_string(),
        name: "科创大赛".to_string(),
        season_year: 2025,
        mode,
        team_size_min: None,
        team_size_max: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_category(rules: Option<CompositionRules>) -> Category {
    Category {
        category_id: "C001".to_string(),
        competition_id: "CMP001".to_string(),
        name: "智能探索".to_string(),
        code: "EXP".to_string(),
        display_order: 1,
        grade_range: Some("3-6".to_string()),
        age_range: None,
        min_participants: None,
        max_participants: None,
        team_size: None,
        composition_rules: rules,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_team() -> Team {
    Team {
        team_id: "T001".to_string(),
        competition_id: "CMP001".to_string(),
        school_id: "S001".to_string(),
        category_id: "C001".to_string(),
        phase_id: "PH1".to_string(),
        name: "探索一队".to_string(),
        team_code: "EXP-P1-0001".to_string(),
        status: TeamStatus::Draft,
        roster_locked: false,
        qualification_score: None,
        coach1_id: None,
        coach2_id: None,
        notes: None,
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_member(id: &str, participant_id: &str, role: ParticipantRole) -> TeamParticipant {
    TeamParticipant {
        id: id.to_string(),
        team_id: "T001".to_string(),
        participant_id: participant_id.to_string(),
        role,
        status: MemberStatus::Active,
        eligibility_status: EligibilityStatus::Eligible,
        documents_complete: true,
        joined_date: today(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_coach(
    id: &str,
    user_id: &str,
    coach_role: CoachRole,
    qualification: QualificationStatus,
    check: BackgroundCheckStatus,
) -> TeamCoach {
    TeamCoach {
        id: id.to_string(),
        team_id: "T001".to_string(),
        user_id: user_id.to_string(),
        coach_role,
        status: MemberStatus::Active,
        qualification_status: qualification,
        background_check_status: check,
        training_completed: true,
        assigned_date: today(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn create_test_participant(participant_id: &str, grade: &str) -> Participant {
    Participant {
        participant_id: participant_id.to_string(),
        school_id: "S001".to_string(),
        full_name: format!("选手{}", participant_id),
        grade_label: grade.to_string(),
        date_of_birth: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// 搭一个 n 名合规队员 + 一名合格主教练的标准输入
fn standard_fixture(
    n_members: usize,
) -> (
    Competition,
    Category,
    Team,
    Vec<TeamParticipant>,
    Vec<TeamCoach>,
    HashMap<String, Participant>,
) {
    let competition = create_test_competition(CompetitionMode::Pilot);
    let category = create_test_category(None);
    let team = create_test_team();

    let mut members = Vec::new();
    let mut participants = HashMap::new();
    for i in 0..n_members {
        let pid = format!("P{:03}", i + 1);
        let role = if i == 0 {
            ParticipantRole::TeamLeader
        } else {
            ParticipantRole::Regular
        };
        members.push(create_test_member(&format!("M{:03}", i + 1), &pid, role));
        participants.insert(pid.clone(), create_test_participant(&pid, "Grade 4"));
    }

    let coaches = vec![create_test_coach(
        "CO001",
        "U001",
        CoachRole::Primary,
        QualificationStatus::Qualified,
        BackgroundCheckStatus::Verified,
    )];

    (competition, category, team, members, coaches, participants)
}

// ==========================================
// 测试 1: 规模区间解析
// ==========================================

#[tokio::test]
async fn test_resolve_size_bounds_mode_default() {
    let v = validator();
    let competition = create_test_competition(CompetitionMode::Pilot);
    let category = create_test_category(None);

    let bounds = v.resolve_size_bounds(&competition, &category).await.unwrap();
    assert_eq!(bounds, (2, 4));
}

#[tokio::test]
async fn test_resolve_size_bounds_category_overrides_default() {
    let v = validator();
    let competition = create_test_competition(CompetitionMode::Full);
    let mut category = create_test_category(None);
    category.min_participants = Some(3);
    category.team_size = Some(5);

    let bounds = v.resolve_size_bounds(&competition, &category).await.unwrap();
    assert_eq!(bounds, (3, 5));
}

#[tokio::test]
async fn test_resolve_size_bounds_competition_overrides_category() {
    let v = validator();
    let mut competition = create_test_competition(CompetitionMode::Full);
    competition.team_size_min = Some(2);
    competition.team_size_max = Some(3);
    let mut category = create_test_category(None);
    category.min_participants = Some(1);
    category.max_participants = Some(6);

    let bounds = v.resolve_size_bounds(&competition, &category).await.unwrap();
    assert_eq!(bounds, (2, 3));
}

#[tokio::test]
async fn test_resolve_size_bounds_max_participants_beats_team_size() {
    let v = validator();
    let competition = create_test_competition(CompetitionMode::Full);
    let mut category = create_test_category(None);
    category.max_participants = Some(4);
    category.team_size = Some(6);

    let bounds = v.resolve_size_bounds(&competition, &category).await.unwrap();
    assert_eq!(bounds.1, 4);
}

// ==========================================
// 测试 2: 整队校验 - 规模
// ==========================================

#[tokio::test]
async fn test_validate_team_pilot_over_max_size() {
    let v = validator();
    // 试点上限 4, 放 5 名在役队员
    let (competition, category, team, members, coaches, participants) = standard_fixture(5);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("team_size"));
}

#[tokio::test]
async fn test_validate_team_below_min_size() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(1);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("team_size"));
}

#[tokio::test]
async fn test_validate_team_clean_pass() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(3);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(report.is_valid, "意外问题: {:?}", report.errors);
    assert!(report.warnings.is_empty());
}

// ==========================================
// 测试 3: 整队校验 - 逐队员资格
// ==========================================

#[tokio::test]
async fn test_validate_team_member_grade_out_of_range() {
    let v = validator();
    let (competition, category, team, members, coaches, mut participants) = standard_fixture(3);
    // P002 改成超纲年级 (赛项区间 3-6)
    participants.insert("P002".to_string(), create_test_participant("P002", "Grade 9"));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("participant.P002"));
    assert!(!report.has_error("participant.P001"));
}

#[tokio::test]
async fn test_validate_team_missing_master_data() {
    let v = validator();
    let (competition, category, team, members, coaches, mut participants) = standard_fixture(3);
    participants.remove("P003");
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("participant.P003"));
}

#[tokio::test]
async fn test_validate_team_duplicate_conflict_fails_member() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(3);
    let mut conflicts = HashMap::new();
    conflicts.insert("P001".to_string(), "T-OTHER".to_string());
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("participant.P001"));
}

// ==========================================
// 测试 4: 整队校验 - 教练
// ==========================================

#[tokio::test]
async fn test_validate_team_no_coach() {
    let v = validator();
    let (competition, category, team, members, _, participants) = standard_fixture(3);
    let coaches: Vec<TeamCoach> = Vec::new();
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("coaches"));
}

#[tokio::test]
async fn test_validate_team_two_primary_coaches() {
    let v = validator();
    let (competition, category, team, members, mut coaches, participants) = standard_fixture(3);
    coaches.push(create_test_coach(
        "CO002",
        "U002",
        CoachRole::Primary,
        QualificationStatus::Qualified,
        BackgroundCheckStatus::Verified,
    ));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("coaches"));
}

#[tokio::test]
async fn test_validate_team_coach_pending_is_warning_then_escalates() {
    let v = validator();
    let (competition, category, team, members, mut coaches, participants) = standard_fixture(3);
    coaches[0] = create_test_coach(
        "CO001",
        "U001",
        CoachRole::Primary,
        QualificationStatus::Pending,
        BackgroundCheckStatus::Verified,
    );
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    // 平时: 提示
    let report = v
        .validate_team(&input, ValidationContext::Modification, today())
        .await
        .unwrap();
    assert!(report.is_valid);
    assert!(report.warnings.contains_key("coaches"));

    // 赛日: 阻断
    let report = v
        .validate_team(&input, ValidationContext::CompetitionDay, today())
        .await
        .unwrap();
    assert!(!report.is_valid);
    assert!(report.has_error("coaches"));
}

// ==========================================
// 测试 5: 整队校验 - 材料
// ==========================================

#[tokio::test]
async fn test_validate_team_documents_warning_then_escalates() {
    let v = validator();
    let (competition, category, team, mut members, coaches, participants) = standard_fixture(3);
    members[1].documents_complete = false;
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();
    assert!(report.is_valid);
    assert!(report.warnings.contains_key("documents.P002"));

    let report = v
        .validate_team(&input, ValidationContext::CompetitionDay, today())
        .await
        .unwrap();
    assert!(!report.is_valid);
    assert!(report.has_error("documents.P002"));
}

// ==========================================
// 测试 6: 整队校验 - 角色策略
// ==========================================

fn rules_with(
    required: &[(ParticipantRole, u32)],
    max: &[(ParticipantRole, u32)],
    require_leader: bool,
) -> CompositionRules {
    CompositionRules {
        required_roles: required.iter().copied().collect::<BTreeMap<_, _>>(),
        max_per_role: max.iter().copied().collect::<BTreeMap<_, _>>(),
        require_team_leader: require_leader,
    }
}

#[tokio::test]
async fn test_validate_team_required_role_unmet() {
    let v = validator();
    let rules = rules_with(&[(ParticipantRole::Programmer, 1)], &[], true);
    let (competition, _, team, members, coaches, participants) = standard_fixture(3);
    let category = create_test_category(Some(rules));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("roles"));
}

#[tokio::test]
async fn test_validate_team_role_max_exceeded_and_leader_missing() {
    let v = validator();
    let rules = rules_with(&[], &[(ParticipantRole::Regular, 1)], true);
    let (competition, _, team, mut members, coaches, participants) = standard_fixture(3);
    // 全改普通队员: REGULAR=3 超上限 1, 且没有队长
    for member in &mut members {
        member.role = ParticipantRole::Regular;
    }
    let category = create_test_category(Some(rules));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .validate_team(&input, ValidationContext::Registration, today())
        .await
        .unwrap();

    assert!(!report.is_valid);
    let role_errors = report.errors.get("roles").unwrap();
    assert!(role_errors.iter().any(|m| m.contains("至多")));
    assert!(role_errors.iter().any(|m| m.contains("队长")));
}

// ==========================================
// 测试 7: 实时单步预检
// ==========================================

#[tokio::test]
async fn test_check_add_participant_at_max() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(4);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };
    let candidate = create_test_participant("P999", "Grade 4");

    let report = v
        .check_add_participant(
            &input,
            &candidate,
            ParticipantRole::Regular,
            ValidationContext::RealTime,
            today(),
        )
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("team_size"));
}

#[tokio::test]
async fn test_check_add_participant_already_in_team() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(3);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };
    let candidate = create_test_participant("P002", "Grade 4");

    let report = v
        .check_add_participant(
            &input,
            &candidate,
            ParticipantRole::Regular,
            ValidationContext::RealTime,
            today(),
        )
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("participant.P002"));
}

#[tokio::test]
async fn test_check_remove_participant_at_min() {
    let v = validator();
    let (competition, category, team, members, coaches, participants) = standard_fixture(2);
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .check_remove_participant(&input, "M002", ValidationContext::RealTime)
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("team_size"));
}

#[tokio::test]
async fn test_check_remove_sole_leader() {
    let v = validator();
    let rules = rules_with(&[], &[], true);
    let (competition, _, team, members, coaches, participants) = standard_fixture(3);
    let category = create_test_category(Some(rules));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    // M001 是唯一队长
    let report = v
        .check_remove_participant(&input, "M001", ValidationContext::RealTime)
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("roles"));
}

#[tokio::test]
async fn test_check_change_role_second_leader() {
    let v = validator();
    let rules = rules_with(&[], &[], true);
    let (competition, _, team, members, coaches, participants) = standard_fixture(3);
    let category = create_test_category(Some(rules));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    // M002 (REGULAR) 想升队长, 但 M001 已是队长
    let report = v
        .check_change_role(
            &input,
            "M002",
            ParticipantRole::TeamLeader,
            ValidationContext::RealTime,
        )
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("roles"));
}

#[tokio::test]
async fn test_check_assign_coach_limits() {
    let v = validator();
    let (competition, category, team, members, mut coaches, participants) = standard_fixture(3);
    coaches.push(create_test_coach(
        "CO002",
        "U002",
        CoachRole::Secondary,
        QualificationStatus::Qualified,
        BackgroundCheckStatus::Verified,
    ));
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    // 已有 2 名在役教练 (上限 2), 且已有主教练
    let report = v
        .check_assign_coach(
            &input,
            "U003",
            CoachRole::Primary,
            QualificationStatus::Qualified,
            BackgroundCheckStatus::Verified,
            ValidationContext::RealTime,
        )
        .await
        .unwrap();

    assert!(!report.is_valid);
    let coach_errors = report.errors.get("coaches").unwrap();
    assert!(coach_errors.iter().any(|m| m.contains("上限")));
    assert!(coach_errors.iter().any(|m| m.contains("主教练")));
}

#[tokio::test]
async fn test_check_assign_coach_pending_escalates_on_competition_day() {
    let v = validator();
    let (competition, category, team, members, _, participants) = standard_fixture(3);
    let coaches: Vec<TeamCoach> = Vec::new();
    let conflicts = HashMap::new();
    let input = TeamCompositionInput {
        competition: &competition,
        category: &category,
        team: &team,
        members: &members,
        coaches: &coaches,
        participants: &participants,
        duplicate_conflicts: &conflicts,
    };

    let report = v
        .check_assign_coach(
            &input,
            "U010",
            CoachRole::Primary,
            QualificationStatus::Pending,
            BackgroundCheckStatus::Pending,
            ValidationContext::CompetitionDay,
        )
        .await
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.has_error("coaches"));
}
