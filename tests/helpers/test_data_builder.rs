// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 直接写库的行构建器, 默认值对齐基础场景 (CMP-T / SCH-E1)
// ==========================================

use std::error::Error;

use rusqlite::{params, Connection};

const CREATED: &str = "2026-05-01T00:00:00Z";

// ==========================================
// TeamSeed - 队伍行构建器
// ==========================================

pub struct TeamSeed {
    team_id: String,
    competition_id: String,
    school_id: String,
    category_id: String,
    phase_id: String,
    name: String,
    team_code: String,
    status: String,
    roster_locked: bool,
    score: Option<f64>,
    coach1_id: Option<String>,
}

impl TeamSeed {
    pub fn new(team_id: &str, school_id: &str, category_id: &str, phase_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            competition_id: "CMP-T".to_string(),
            school_id: school_id.to_string(),
            category_id: category_id.to_string(),
            phase_id: phase_id.to_string(),
            name: format!("{}号队", team_id),
            team_code: format!("TC-{}", team_id),
            status: "APPROVED".to_string(),
            roster_locked: false,
            score: None,
            coach1_id: None,
        }
    }

    pub fn competition(mut self, competition_id: &str) -> Self {
        self.competition_id = competition_id.to_string();
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.roster_locked = locked;
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn coach1(mut self, coach_id: &str) -> Self {
        self.coach1_id = Some(coach_id.to_string());
        self
    }

    pub fn insert(self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute(
            r#"
            INSERT INTO teams (team_id, competition_id, school_id, category_id, phase_id, name, team_code, status, roster_locked, qualification_score, coach1_id, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'test', ?12, ?12)
            "#,
            params![
                self.team_id,
                self.competition_id,
                self.school_id,
                self.category_id,
                self.phase_id,
                self.name,
                self.team_code,
                self.status,
                self.roster_locked as i64,
                self.score,
                self.coach1_id,
                CREATED
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// MemberSeed - 选手 + 名册行构建器
// ==========================================
// 选手主数据按 participant_id 幂等插入, 名册行总是新增

pub struct MemberSeed {
    team_id: String,
    participant_id: String,
    school_id: String,
    full_name: String,
    grade_label: String,
    date_of_birth: Option<String>,
    role: String,
    status: String,
    eligibility_status: String,
    documents_complete: bool,
}

impl MemberSeed {
    pub fn new(team_id: &str, participant_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            participant_id: participant_id.to_string(),
            school_id: "SCH-E1".to_string(),
            full_name: format!("选手{}", participant_id),
            grade_label: "8年级".to_string(),
            date_of_birth: Some("2013-06-02".to_string()),
            role: "REGULAR".to_string(),
            status: "ACTIVE".to_string(),
            eligibility_status: "ELIGIBLE".to_string(),
            documents_complete: true,
        }
    }

    pub fn school(mut self, school_id: &str) -> Self {
        self.school_id = school_id.to_string();
        self
    }

    pub fn grade(mut self, grade_label: &str) -> Self {
        self.grade_label = grade_label.to_string();
        self
    }

    pub fn date_of_birth(mut self, dob: Option<&str>) -> Self {
        self.date_of_birth = dob.map(str::to_string);
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn documents_complete(mut self, complete: bool) -> Self {
        self.documents_complete = complete;
        self
    }

    pub fn insert(self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO participants (participant_id, school_id, full_name, grade_label, date_of_birth, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                self.participant_id,
                self.school_id,
                self.full_name,
                self.grade_label,
                self.date_of_birth,
                CREATED
            ],
        )?;
        conn.execute(
            r#"
            INSERT INTO team_participants (id, team_id, participant_id, role, status, eligibility_status, documents_complete, joined_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '2026-05-01', ?8, ?8)
            "#,
            params![
                format!("TP-{}-{}", self.team_id, self.participant_id),
                self.team_id,
                self.participant_id,
                self.role,
                self.status,
                self.eligibility_status,
                self.documents_complete as i64,
                CREATED
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// ParticipantSeed - 选手主数据构建器
// ==========================================
// 只建档不入队, 供加队/导入类测试使用

pub struct ParticipantSeed {
    participant_id: String,
    school_id: String,
    full_name: String,
    grade_label: String,
    date_of_birth: Option<String>,
}

impl ParticipantSeed {
    pub fn new(participant_id: &str) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            school_id: "SCH-E1".to_string(),
            full_name: format!("选手{}", participant_id),
            grade_label: "8年级".to_string(),
            date_of_birth: Some("2013-06-02".to_string()),
        }
    }

    pub fn school(mut self, school_id: &str) -> Self {
        self.school_id = school_id.to_string();
        self
    }

    pub fn grade(mut self, grade_label: &str) -> Self {
        self.grade_label = grade_label.to_string();
        self
    }

    pub fn insert(self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute(
            r#"
            INSERT INTO participants (participant_id, school_id, full_name, grade_label, date_of_birth, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                self.participant_id,
                self.school_id,
                self.full_name,
                self.grade_label,
                self.date_of_birth,
                CREATED
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// CoachAssignmentSeed - 教练挂队行构建器
// ==========================================
// 教练主数据按 coach_id 幂等插入

pub struct CoachAssignmentSeed {
    team_id: String,
    coach_id: String,
    school_id: String,
    coach_role: String,
    status: String,
    qualification_status: String,
    background_check_status: String,
    training_completed: bool,
}

impl CoachAssignmentSeed {
    pub fn new(team_id: &str, coach_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            coach_id: coach_id.to_string(),
            school_id: "SCH-E1".to_string(),
            coach_role: "PRIMARY".to_string(),
            status: "ACTIVE".to_string(),
            qualification_status: "QUALIFIED".to_string(),
            background_check_status: "VERIFIED".to_string(),
            training_completed: true,
        }
    }

    pub fn school(mut self, school_id: &str) -> Self {
        self.school_id = school_id.to_string();
        self
    }

    pub fn coach_role(mut self, role: &str) -> Self {
        self.coach_role = role.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn insert(self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO coaches (coach_id, school_id, full_name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![
                self.coach_id,
                self.school_id,
                format!("教练{}", self.coach_id),
                CREATED
            ],
        )?;
        conn.execute(
            r#"
            INSERT INTO team_coaches (id, team_id, user_id, coach_role, status, qualification_status, background_check_status, training_completed, assigned_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '2026-05-01', ?9, ?9)
            "#,
            params![
                format!("TC-{}-{}", self.team_id, self.coach_id),
                self.team_id,
                self.coach_id,
                self.coach_role,
                self.status,
                self.qualification_status,
                self.background_check_status,
                self.training_completed as i64,
                CREATED
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// DeadlineSeed - 截止规则行构建器
// ==========================================

pub struct DeadlineSeed {
    id: String,
    phase_name: String,
    category_id: Option<String>,
    deadline_type: String,
    deadline_date: String,
    notification_sent: bool,
    enforcement_active: bool,
}

impl DeadlineSeed {
    pub fn new(id: &str, phase_name: &str, deadline_type: &str, deadline_date: &str) -> Self {
        Self {
            id: id.to_string(),
            phase_name: phase_name.to_string(),
            category_id: None,
            deadline_type: deadline_type.to_string(),
            deadline_date: deadline_date.to_string(),
            notification_sent: false,
            enforcement_active: true,
        }
    }

    pub fn category(mut self, category_id: &str) -> Self {
        self.category_id = Some(category_id.to_string());
        self
    }

    pub fn notification_sent(mut self, sent: bool) -> Self {
        self.notification_sent = sent;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.enforcement_active = false;
        self
    }

    pub fn insert(self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute(
            r#"
            INSERT INTO registration_deadlines (id, phase_name, category_id, deadline_type, deadline_date, notification_sent, enforcement_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                self.id,
                self.phase_name,
                self.category_id,
                self.deadline_type,
                self.deadline_date,
                self.notification_sent as i64,
                self.enforcement_active as i64,
                CREATED
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// 组合构建
// ==========================================

/// 插入一支带完整名册的队伍: 指定人数的在役选手 (首位队长) + 一名主教练
pub fn insert_team_with_roster(
    conn: &Connection,
    team_id: &str,
    school_id: &str,
    category_id: &str,
    phase_id: &str,
    score: Option<f64>,
    member_count: usize,
) -> Result<(), Box<dyn Error>> {
    let mut seed = TeamSeed::new(team_id, school_id, category_id, phase_id)
        .coach1(&format!("COA-{}", school_id));
    if let Some(s) = score {
        seed = seed.score(s);
    }
    seed.insert(conn)?;

    for i in 0..member_count {
        let role = if i == 0 { "TEAM_LEADER" } else { "REGULAR" };
        MemberSeed::new(team_id, &format!("P-{}-{}", team_id, i + 1))
            .school(school_id)
            .role(role)
            .insert(conn)?;
    }

    CoachAssignmentSeed::new(team_id, &format!("COA-{}", school_id))
        .school(school_id)
        .insert(conn)?;
    Ok(())
}
