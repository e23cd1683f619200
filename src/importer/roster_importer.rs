// ==========================================
// 青少年科创竞赛管理系统 - 名册批量导入器
// ==========================================
// 职责: 名册 CSV 文件 → 逐行校验 → 逐行落库
// 流程: 解析 → 映射 → 选手复用/建档 → 构成校验 → 入册
// 红线: 逐行结算, 单行被拒不中断文件; 锁定队伍整文件拒绝
// ==========================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::config_manager::ConfigManager;
use crate::domain::category::Category;
use crate::domain::competition::Competition;
use crate::domain::participant::Participant;
use crate::domain::school::School;
use crate::domain::team::{Team, TeamCoach, TeamParticipant};
use crate::domain::types::{EligibilityStatus, MemberStatus, ValidationContext};
use crate::engine::composition::{CompositionReport, CompositionValidator, TeamCompositionInput};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::roster_file::{RawRosterRow, RosterFileParser, RosterRowMapper};
use crate::repository::category_repo::CategoryRepository;
use crate::repository::competition_repo::CompetitionRepository;
use crate::repository::participant_repo::ParticipantRepository;
use crate::repository::roster_repo::RosterRepository;
use crate::repository::school_repo::SchoolRepository;
use crate::repository::team_repo::TeamRepository;

// ==========================================
// 导入结果
// ==========================================

/// 被拒绝的名册行
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub row_number: usize,
    pub reason: String,
}

/// 单文件导入结果 (逐行结算)
#[derive(Debug, Clone, Serialize)]
pub struct RosterImportOutcome {
    pub team_id: String,
    pub file_name: String,
    pub total_rows: usize,
    pub imported: usize,
    pub rejected: Vec<RejectedRow>,
    pub elapsed_ms: u64,
}

/// 批量导入任务项
#[derive(Debug, Clone)]
pub struct RosterImportJob {
    pub team_id: String,
    pub file_path: PathBuf,
}

/// 单行处理结果
enum RowOutcome {
    Applied,
    Rejected(String),
}

/// 逐行推进中的队伍名册工作集
struct RosterWorkingSet {
    members: Vec<TeamParticipant>,
    coaches: Vec<TeamCoach>,
    participants: HashMap<String, Participant>,
    /// 学校在册选手复用索引: (姓名, 出生日期) → 选手
    known_by_key: HashMap<(String, Option<NaiveDate>), Participant>,
}

// ==========================================
// RosterImporter - 名册导入器
// ==========================================
pub struct RosterImporter {
    team_repo: Arc<TeamRepository>,
    competition_repo: Arc<CompetitionRepository>,
    category_repo: Arc<CategoryRepository>,
    school_repo: Arc<SchoolRepository>,
    participant_repo: Arc<ParticipantRepository>,
    roster_repo: Arc<RosterRepository>,
    validator: Arc<CompositionValidator<ConfigManager>>,
    parser: RosterFileParser,
    mapper: RosterRowMapper,
}

impl RosterImporter {
    /// 创建新的 RosterImporter 实例
    ///
    /// # 参数
    /// - team_repo: 队伍仓储
    /// - competition_repo: 赛事仓储
    /// - category_repo: 赛项仓储
    /// - school_repo: 学校仓储
    /// - participant_repo: 选手仓储
    /// - roster_repo: 名册仓储
    /// - validator: 构成校验引擎 (BulkImport 口径)
    pub fn new(
        team_repo: Arc<TeamRepository>,
        competition_repo: Arc<CompetitionRepository>,
        category_repo: Arc<CategoryRepository>,
        school_repo: Arc<SchoolRepository>,
        participant_repo: Arc<ParticipantRepository>,
        roster_repo: Arc<RosterRepository>,
        validator: Arc<CompositionValidator<ConfigManager>>,
    ) -> Self {
        Self {
            team_repo,
            competition_repo,
            category_repo,
            school_repo,
            participant_repo,
            roster_repo,
            validator,
            parser: RosterFileParser,
            mapper: RosterRowMapper,
        }
    }

    /// 导入单个队伍的名册文件
    ///
    /// # 流程
    /// 1. 解析 CSV 文件
    /// 2. 加载队伍上下文 (锁定名册整文件拒绝)
    /// 3. 逐行: 映射 → 选手复用/建档 → 构成校验 → 入册
    ///
    /// # 返回
    /// - Ok(RosterImportOutcome): 逐行结算 {imported, rejected}
    /// - Err: 文件级/基础设施错误 (解析失败, 队伍不存在, 数据库故障)
    #[instrument(skip(self, file_path), fields(team_id = %team_id))]
    pub async fn import_roster<P: AsRef<Path>>(
        &self,
        team_id: &str,
        file_path: P,
        today: NaiveDate,
    ) -> ImportResult<RosterImportOutcome> {
        let _perf = crate::perf::PerfGuard::new("importer.import_roster");
        let start = Instant::now();
        let path = file_path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        info!(file = %path.display(), "开始导入队伍名册");

        // === 步骤 1: 解析文件 ===
        let raw_rows = self.parser.parse_to_raw_records(path)?;
        let total_rows = raw_rows.len();
        info!(total_rows = total_rows, "名册文件解析完成");

        // === 步骤 2: 加载队伍上下文 ===
        let team = self
            .team_repo
            .find_by_id(team_id)?
            .ok_or_else(|| ImportError::TeamNotFound(team_id.to_string()))?;
        if team.roster_locked {
            return Err(ImportError::RosterLocked(team_id.to_string()));
        }
        let competition = self
            .competition_repo
            .find_by_id(&team.competition_id)?
            .ok_or_else(|| {
                ImportError::MasterDataMissing(format!("赛事(id={})", team.competition_id))
            })?;
        let category = self
            .category_repo
            .find_by_id(&team.category_id)?
            .ok_or_else(|| {
                ImportError::MasterDataMissing(format!("赛项(id={})", team.category_id))
            })?;
        let school = self
            .school_repo
            .find_by_id(&team.school_id)?
            .ok_or_else(|| {
                ImportError::MasterDataMissing(format!("学校(id={})", team.school_id))
            })?;

        let mut working = self.load_working_set(&team)?;

        // === 步骤 3: 逐行校验并落库 ===
        let mut imported = 0usize;
        let mut rejected = Vec::new();
        for (idx, raw) in raw_rows.iter().enumerate() {
            let row_number = idx + 1;
            let row = match self.mapper.map_row(raw, row_number) {
                Ok(row) => row,
                Err(e) => {
                    warn!(row_number = row_number, error = %e, "名册行映射失败");
                    rejected.push(RejectedRow {
                        row_number,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self
                .apply_row(&team, &competition, &category, &school, &row, &mut working, today)
                .await?
            {
                RowOutcome::Applied => imported += 1,
                RowOutcome::Rejected(reason) => {
                    warn!(row_number = row_number, reason = %reason, "名册行被拒绝");
                    rejected.push(RejectedRow { row_number, reason });
                }
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            total = total_rows,
            imported = imported,
            rejected = rejected.len(),
            elapsed_ms = elapsed_ms,
            "名册导入完成"
        );
        Ok(RosterImportOutcome {
            team_id: team.team_id,
            file_name,
            total_rows,
            imported,
            rejected,
            elapsed_ms,
        })
    }

    /// 批量导入多个名册文件（并发执行）
    pub async fn batch_import(
        &self,
        jobs: Vec<RosterImportJob>,
        today: NaiveDate,
    ) -> Vec<Result<RosterImportOutcome, String>> {
        use futures::future::join_all;

        info!(count = jobs.len(), "开始批量导入名册文件");

        let import_tasks = jobs.into_iter().map(|job| async move {
            let file_label = job.file_path.display().to_string();
            match self.import_roster(&job.team_id, &job.file_path, today).await {
                Ok(outcome) => {
                    info!(
                        file = %file_label,
                        imported = outcome.imported,
                        rejected = outcome.rejected.len(),
                        "名册文件导入成功"
                    );
                    Ok(outcome)
                }
                Err(e) => {
                    error!(file = %file_label, error = %e, "名册文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", file_label, e))
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn load_working_set(&self, team: &Team) -> ImportResult<RosterWorkingSet> {
        let members = self.roster_repo.list_active_participants(&team.team_id)?;
        let coaches = self.roster_repo.list_active_coaches(&team.team_id)?;

        let member_ids: Vec<String> = members.iter().map(|m| m.participant_id.clone()).collect();
        let participants: HashMap<String, Participant> = self
            .participant_repo
            .find_by_ids(&member_ids)?
            .into_iter()
            .map(|p| (p.participant_id.clone(), p))
            .collect();

        let known_by_key = self
            .participant_repo
            .list_by_school(&team.school_id)?
            .into_iter()
            .map(|p| ((p.full_name.clone(), p.date_of_birth), p))
            .collect();

        Ok(RosterWorkingSet {
            members,
            coaches,
            participants,
            known_by_key,
        })
    }

    /// 单行处理: 只有基础设施错误走 Err, 业务不通过走 Rejected
    async fn apply_row(
        &self,
        team: &Team,
        competition: &Competition,
        category: &Category,
        school: &School,
        row: &RawRosterRow,
        working: &mut RosterWorkingSet,
        today: NaiveDate,
    ) -> ImportResult<RowOutcome> {
        // 学校列填写时须与队伍归属一致
        if let Some(name) = &row.school_name {
            if name != &school.name {
                return Ok(RowOutcome::Rejected(format!(
                    "学校不匹配: 文件填写 {}, 队伍归属 {}",
                    name, school.name
                )));
            }
        }

        // 选手复用: 同校同名同生日视为同一人, 否则建档
        let key = (row.full_name.clone(), row.date_of_birth);
        let (candidate, is_new) = match working.known_by_key.get(&key) {
            Some(existing) => (existing.clone(), false),
            None => {
                let now = Utc::now();
                let participant = Participant {
                    participant_id: Uuid::new_v4().to_string(),
                    school_id: team.school_id.clone(),
                    full_name: row.full_name.clone(),
                    grade_label: row.grade_label.clone(),
                    date_of_birth: row.date_of_birth,
                    created_at: now,
                    updated_at: now,
                };
                (participant, true)
            }
        };

        if working
            .members
            .iter()
            .any(|m| m.participant_id == candidate.participant_id)
        {
            return Ok(RowOutcome::Rejected(format!(
                "选手 {} 已在本队名册中",
                row.full_name
            )));
        }

        // 跨队占位冲突 (同赛项同阶段)
        let mut duplicate_conflicts = HashMap::new();
        if !is_new {
            if let Some(other_team) = self.roster_repo.find_active_membership(
                &candidate.participant_id,
                &team.category_id,
                &team.phase_id,
                Some(&team.team_id),
            )? {
                duplicate_conflicts.insert(candidate.participant_id.clone(), other_team);
            }
        }

        let input = TeamCompositionInput {
            competition,
            category,
            team,
            members: &working.members,
            coaches: &working.coaches,
            participants: &working.participants,
            duplicate_conflicts: &duplicate_conflicts,
        };
        let report = self
            .validator
            .check_add_participant(&input, &candidate, row.role, ValidationContext::BulkImport, today)
            .await
            .map_err(|e| ImportError::ValidationEngineError(e.to_string()))?;
        if !report.is_valid {
            return Ok(RowOutcome::Rejected(first_issue(&report)));
        }

        // 校验通过后落库
        if is_new {
            self.participant_repo.insert(&candidate)?;
            working.known_by_key.insert(key, candidate.clone());
        }
        let now = Utc::now();
        let member = TeamParticipant {
            id: Uuid::new_v4().to_string(),
            team_id: team.team_id.clone(),
            participant_id: candidate.participant_id.clone(),
            role: row.role,
            status: MemberStatus::Active,
            eligibility_status: EligibilityStatus::Eligible,
            documents_complete: false,
            joined_date: today,
            created_at: now,
            updated_at: now,
        };
        self.roster_repo.insert_participant(&member)?;

        working
            .participants
            .insert(candidate.participant_id.clone(), candidate);
        working.members.push(member);
        Ok(RowOutcome::Applied)
    }
}

/// 报告摘要: 取第一条阻断性问题
fn first_issue(report: &CompositionReport) -> String {
    report
        .errors
        .iter()
        .next()
        .and_then(|(field, messages)| messages.first().map(|m| format!("{}: {}", field, m)))
        .unwrap_or_else(|| "构成校验未通过".to_string())
}
