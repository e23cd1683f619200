// ==========================================
// 青少年科创竞赛管理系统 - 截止执行器
// ==========================================
// 红线: 扫描幂等, 重复运行不产生重复清理或重复提醒
// 红线: 提醒先落台账占位 (唯一键), 再投递; 投递失败不回滚占位
// ==========================================
// 职责: 对 enforcement_active 的截止规则做四类动作:
//   1) 报名截止已过 → 过期草稿队伍
//   2) 锁定时刻已过 → 锁定名册
//   3) 材料截止已过 (阶段1) → 标记材料缺失队伍不符资格
//   4) 阈值日 (默认 7/3/1) → 发送提醒, 同日同类型同收件方只发一次
// ==========================================

use crate::config::CompetitionConfigReader;
use crate::domain::deadline::{NotificationLog, RegistrationDeadline};
use crate::domain::types::{DeadlineType, TeamStatus};
use crate::engine::notify::{ReminderNotice, ReminderSink};
use crate::i18n::t_with_args;
use crate::repository::{
    DeadlineRepository, NotificationRepository, PhaseRepository, TeamRepository,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// EnforcementOutcome - 单次扫描统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnforcementOutcome {
    /// 过期取消的草稿队伍数
    pub expired: usize,
    /// 锁定名册的队伍数
    pub locked: usize,
    /// 标记为资格不符的队伍数
    pub marked_ineligible: usize,
    /// 实际发出的提醒数
    pub reminders_sent: usize,
    /// 因当日去重被跳过的提醒数
    pub reminders_skipped: usize,
}

// ==========================================
// DeadlineEnforcer - 截止执行器
// ==========================================
pub struct DeadlineEnforcer<C>
where
    C: CompetitionConfigReader,
{
    deadline_repo: Arc<DeadlineRepository>,
    phase_repo: Arc<PhaseRepository>,
    team_repo: Arc<TeamRepository>,
    notification_repo: Arc<NotificationRepository>,
    config: Arc<C>,
    sink: Arc<dyn ReminderSink>,
}

impl<C> DeadlineEnforcer<C>
where
    C: CompetitionConfigReader,
{
    pub fn new(
        deadline_repo: Arc<DeadlineRepository>,
        phase_repo: Arc<PhaseRepository>,
        team_repo: Arc<TeamRepository>,
        notification_repo: Arc<NotificationRepository>,
        config: Arc<C>,
        sink: Arc<dyn ReminderSink>,
    ) -> Self {
        Self {
            deadline_repo,
            phase_repo,
            team_repo,
            notification_repo,
            config,
            sink,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行一轮截止扫描
    ///
    /// 单条规则失败只记日志, 不中断其余规则
    #[instrument(skip(self), fields(now = %now))]
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<EnforcementOutcome, Box<dyn Error>> {
        let thresholds = self.config.get_reminder_threshold_days().await?;
        let deadlines = self.deadline_repo.list_active()?;

        info!(
            active_rules = deadlines.len(),
            thresholds = ?thresholds,
            "开始截止扫描"
        );

        let mut outcome = EnforcementOutcome::default();
        for deadline in &deadlines {
            if let Err(e) = self.enforce_one(deadline, &thresholds, now, &mut outcome) {
                warn!(
                    deadline_id = %deadline.id,
                    phase_name = %deadline.phase_name,
                    error = %e,
                    "截止规则处理失败, 继续其余规则"
                );
            }
        }

        info!(
            expired = outcome.expired,
            locked = outcome.locked,
            marked_ineligible = outcome.marked_ineligible,
            reminders_sent = outcome.reminders_sent,
            reminders_skipped = outcome.reminders_skipped,
            "截止扫描完成"
        );
        Ok(outcome)
    }

    /// 处理单条截止规则
    fn enforce_one(
        &self,
        deadline: &RegistrationDeadline,
        thresholds: &[i64],
        now: DateTime<Utc>,
        outcome: &mut EnforcementOutcome,
    ) -> Result<(), Box<dyn Error>> {
        let phases = self.phase_repo.find_by_name(&deadline.phase_name)?;
        if phases.is_empty() {
            warn!(
                deadline_id = %deadline.id,
                phase_name = %deadline.phase_name,
                "截止规则无匹配阶段, 跳过"
            );
            return Ok(());
        }
        let category = deadline.category_id.as_deref();

        if deadline.is_past(now) {
            // === 1. 截止后总结通知的收件方在清理前采集 ===
            let mut closure_recipients = Vec::new();
            if !deadline.notification_sent {
                for phase in &phases {
                    closure_recipients.extend(self.recipients_for(&phase.phase_id, deadline)?);
                }
                closure_recipients.sort();
                closure_recipients.dedup();
            }

            // === 2. 行级清理 (UPDATE 带状态前置条件, 天然幂等) ===
            for phase in &phases {
                match deadline.deadline_type {
                    DeadlineType::TeamRegistration => {
                        let note = format!(
                            "EXPIRED: 报名截止 ({})",
                            deadline.deadline_date.format("%Y-%m-%d")
                        );
                        outcome.expired += self.team_repo.expire_drafts_in_phase(
                            &phase.phase_id,
                            category,
                            &note,
                            now,
                        )?;
                    }
                    DeadlineType::Lock => {
                        outcome.locked +=
                            self.team_repo
                                .lock_rosters_in_phase(&phase.phase_id, category, now)?;
                    }
                    DeadlineType::DocumentSubmission => {
                        // 材料核查只在阶段 1 执行, 晋级克隆行不重复追责
                        if phase.phase_order == 1 {
                            let note = format!(
                                "INELIGIBLE: 材料截止 ({})",
                                deadline.deadline_date.format("%Y-%m-%d")
                            );
                            outcome.marked_ineligible +=
                                self.team_repo.mark_ineligible_missing_documents(
                                    &phase.phase_id,
                                    category,
                                    &note,
                                    now,
                                )?;
                        }
                    }
                    DeadlineType::Modification => {
                        // 修改截止由状态机管控, 无行级清理
                    }
                }
            }

            // === 3. 截止后总结通知 (每条规则一次性) ===
            if !deadline.notification_sent {
                let days_remaining = deadline.days_until(now);
                let (sent, skipped) =
                    self.send_batch(&closure_recipients, deadline, days_remaining, now)?;
                outcome.reminders_sent += sent;
                outcome.reminders_skipped += skipped;
                self.deadline_repo.mark_notification_sent(&deadline.id, now)?;
            }
        } else {
            // === 截止前: 阈值日提醒 ===
            let days_remaining = deadline.days_until(now);
            if thresholds.contains(&days_remaining) {
                let mut recipients = Vec::new();
                for phase in &phases {
                    recipients.extend(self.recipients_for(&phase.phase_id, deadline)?);
                }
                recipients.sort();
                recipients.dedup();

                let (sent, skipped) =
                    self.send_batch(&recipients, deadline, days_remaining, now)?;
                outcome.reminders_sent += sent;
                outcome.reminders_skipped += skipped;
            }
        }

        Ok(())
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 规则的提醒收件方: 报名截止只提醒还有草稿的学校, 其余提醒所有在册学校
    fn recipients_for(
        &self,
        phase_id: &str,
        deadline: &RegistrationDeadline,
    ) -> Result<Vec<String>, Box<dyn Error>> {
        let status = match deadline.deadline_type {
            DeadlineType::TeamRegistration => Some(TeamStatus::Draft),
            _ => None,
        };
        Ok(self.team_repo.list_school_ids_in_phase(
            phase_id,
            deadline.category_id.as_deref(),
            status,
        )?)
    }

    /// 批量投递: 先落台账占位 (唯一键去重), 占位成功才投递
    fn send_batch(
        &self,
        recipients: &[String],
        deadline: &RegistrationDeadline,
        days_remaining: i64,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), Box<dyn Error>> {
        let mut sent = 0usize;
        let mut skipped = 0usize;

        for school_id in recipients {
            let notice = Self::build_notice(school_id, deadline, days_remaining);
            let log = NotificationLog {
                id: Uuid::new_v4().to_string(),
                recipient: school_id.clone(),
                notification_type: notice.notification_type(),
                dedupe_day: now.date_naive(),
                subject: notice.subject.clone(),
                body: notice.body.clone(),
                sent_at: now,
            };

            if self.notification_repo.try_insert(&log)? {
                if let Err(e) = self.sink.deliver(&notice) {
                    warn!(
                        recipient = %school_id,
                        notification_type = %log.notification_type,
                        error = %e,
                        "提醒投递失败, 台账占位保留"
                    );
                }
                sent += 1;
            } else {
                debug!(
                    recipient = %school_id,
                    notification_type = %log.notification_type,
                    "当日已提醒过, 跳过"
                );
                skipped += 1;
            }
        }

        Ok((sent, skipped))
    }

    /// 渲染提醒内容 (i18n 模板)
    fn build_notice(
        school_id: &str,
        deadline: &RegistrationDeadline,
        days_remaining: i64,
    ) -> ReminderNotice {
        let type_title = crate::i18n::t(&format!(
            "deadline.type_{}",
            deadline.deadline_type.to_db_str().to_lowercase()
        ));
        let date_str = deadline.deadline_date.format("%Y-%m-%d %H:%M").to_string();
        let days_str = days_remaining.to_string();

        let (subject, body) = if days_remaining > 0 {
            (
                t_with_args(
                    "deadline.reminder_subject",
                    &[("type", &type_title), ("days", &days_str)],
                ),
                t_with_args(
                    "deadline.reminder_body",
                    &[
                        ("phase", &deadline.phase_name),
                        ("type", &type_title),
                        ("days", &days_str),
                        ("date", &date_str),
                    ],
                ),
            )
        } else {
            (
                t_with_args("deadline.closed_subject", &[("type", &type_title)]),
                t_with_args(
                    "deadline.closed_body",
                    &[
                        ("phase", &deadline.phase_name),
                        ("type", &type_title),
                        ("date", &date_str),
                    ],
                ),
            )
        };

        ReminderNotice {
            recipient: school_id.to_string(),
            deadline_type: deadline.deadline_type,
            phase_name: deadline.phase_name.clone(),
            category_id: deadline.category_id.clone(),
            deadline_date: deadline.deadline_date,
            days_remaining,
            subject,
            body,
        }
    }
}
