use crate::{
    api::{ApiError, CheckIn},
    session::Session,
    tasks::{self, TaskDescriptor, TaskStatus},
};
use chrono::{Local, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    /// Expected outcome such as "already claimed today"; never counted as an error.
    Informational,
    Failed,
    /// The account had no bearer or nothing applied to it.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` for lines that concern the whole batch.
    pub account: Option<usize>,
    pub kind: OutcomeKind,
    pub message: String,
}

/// Every status line produced by one action across the account set.
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub action: &'static str,
    pub outcomes: Vec<Outcome>,
}

impl ActionReport {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, account: Option<usize>, kind: OutcomeKind, message: String) {
        match kind {
            OutcomeKind::Success | OutcomeKind::Informational => log::info!("{}", message),
            OutcomeKind::Failed => log::error!("{}", message),
            OutcomeKind::Skipped => log::debug!("{}", message),
        }
        self.outcomes.push(Outcome {
            account,
            kind,
            message,
        });
    }

    pub fn success(&mut self, index: usize, message: String) {
        self.push(Some(index), OutcomeKind::Success, message);
    }

    pub fn info(&mut self, index: usize, message: String) {
        self.push(Some(index), OutcomeKind::Informational, message);
    }

    pub fn failed(&mut self, index: usize, message: String) {
        self.push(Some(index), OutcomeKind::Failed, message);
    }

    pub fn skipped(&mut self, index: usize, message: String) {
        self.push(Some(index), OutcomeKind::Skipped, message);
    }

    pub fn note(&mut self, message: String) {
        self.push(None, OutcomeKind::Informational, message);
    }

    /// Informational remote errors are reported as such; the rest are failures.
    fn remote_error(&mut self, index: usize, context: String, err: ApiError) {
        if err.is_informational() {
            self.info(index, format!("{}: {}", context, err));
        } else {
            self.failed(index, format!("{}: {}", context, err));
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.iter().filter(|o| o.kind == kind).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(OutcomeKind::Failed)
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} succeeded, {} informational, {} failed, {} skipped",
            self.action,
            self.count(OutcomeKind::Success),
            self.count(OutcomeKind::Informational),
            self.error_count(),
            self.count(OutcomeKind::Skipped)
        )
    }

    /// Lines a user would see for one account; skips are not shown.
    #[cfg(test)]
    pub fn visible_for(&self, index: usize) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.account == Some(index) && o.kind != OutcomeKind::Skipped)
            .map(|o| o.message.as_str())
            .collect()
    }
}

/// Supplies the keyword for a keyword-gated task. An empty answer skips the task.
pub trait KeywordSource {
    fn keyword_for(&mut self, task: &TaskDescriptor) -> String;
}

fn floor_points(raw: &str) -> String {
    raw.trim()
        .parse::<f64>()
        .map(|value| format!("{}", value.floor() as i64))
        .unwrap_or_else(|_| raw.to_string())
}

fn local_time(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch_ms.to_string(),
    }
}

/// Account context handed to a per-account step.
struct Ready<'s> {
    index: usize,
    name: String,
    token: &'s str,
}

impl<'a> Session<'a> {
    /// Accounts that hold a bearer, in configured order. Accounts without one
    /// are recorded as skipped.
    fn ready_accounts(&self, report: &mut ActionReport) -> Vec<Ready<'_>> {
        let mut ready = Vec::new();
        for (index, account) in self.accounts().iter().enumerate() {
            match &account.token {
                Some(token) => ready.push(Ready {
                    index,
                    name: account.label(index).to_string(),
                    token,
                }),
                None => report.skipped(
                    index,
                    format!("{} has no bearer, skipping", account.label(index)),
                ),
            }
        }
        ready
    }

    /// Runs `step` for every account with a bearer, pacing between accounts.
    fn for_each_ready<F>(&self, action: &'static str, mut step: F) -> ActionReport
    where
        F: FnMut(&Ready<'_>, &mut ActionReport),
    {
        let mut report = ActionReport::new(action);
        let ready = self.ready_accounts(&mut report);
        for (n, account) in ready.iter().enumerate() {
            if n > 0 {
                self.pause(self.pacing.between_calls);
            }
            step(account, &mut report);
        }
        report
    }

    pub fn check_in_all(&self) -> ActionReport {
        self.for_each_ready("check-in", |account, report| {
            match self.api.check_in(account.token) {
                Ok(CheckIn {
                    streak: Some(streak),
                    points: Some(points),
                    passes: Some(passes),
                }) => report.success(
                    account.index,
                    format!(
                        "{} performed Check-In for {} consecutive days and obtained {} Play Chances & {} BP Points",
                        account.name, streak, passes, points
                    ),
                ),
                Ok(_) => report.success(
                    account.index,
                    format!("{} performed Check-In", account.name),
                ),
                Err(ApiError::AlreadyClaimedToday) => report.info(
                    account.index,
                    format!("Daily reward for {} was already claimed today", account.name),
                ),
                Err(err) => report.remote_error(
                    account.index,
                    format!("Failed to perform Check-In for {}", account.name),
                    err,
                ),
            }
        })
    }

    pub fn claim_farm_all(&self) -> ActionReport {
        self.for_each_ready("claim-farm", |account, report| {
            match self.api.claim_farm_rewards(account.token) {
                Ok(balance) => report.success(
                    account.index,
                    format!(
                        "{} has claimed Farming Rewards - points are now {} BP",
                        account.name,
                        floor_points(&balance)
                    ),
                ),
                Err(ApiError::TooEarly) => report.info(
                    account.index,
                    format!("It's too early to claim Farming Rewards for {}", account.name),
                ),
                Err(err) => report.remote_error(
                    account.index,
                    format!("Failed to claim Farming Rewards for {}", account.name),
                    err,
                ),
            }
        })
    }

    pub fn start_farm_all(&self) -> ActionReport {
        self.for_each_ready("start-farm", |account, report| {
            match self.api.start_farm(account.token) {
                Ok(window) => report.success(
                    account.index,
                    format!(
                        "{} has started farming at {} & will end at {}",
                        account.name,
                        local_time(window.start_ms),
                        local_time(window.end_ms)
                    ),
                ),
                Err(err) => report.remote_error(
                    account.index,
                    format!("Failed to start Farming for {}", account.name),
                    err,
                ),
            }
        })
    }

    pub fn auto_complete_tasks_all(&self) -> ActionReport {
        self.for_each_ready("auto-tasks", |account, report| {
            self.auto_complete_tasks(account, report)
        })
    }

    fn auto_complete_tasks(&self, account: &Ready<'_>, report: &mut ActionReport) {
        let sections = match self.api.list_tasks(account.token) {
            Ok(sections) => sections,
            Err(err) => {
                return report.remote_error(
                    account.index,
                    format!("Failed to fetch tasks for {}", account.name),
                    err,
                )
            }
        };
        let pending = tasks::automatic_pending(&sections);
        if pending.is_empty() {
            return report.info(
                account.index,
                format!("All automatic tasks are completed for {}", account.name),
            );
        }

        for task in &pending {
            // The start flag is not authoritative; the claim decides.
            let claimed = self
                .api
                .start_task(account.token, &task.id)
                .and_then(|_| self.api.claim_task(account.token, &task.id));
            match claimed {
                Ok(true) => report.success(
                    account.index,
                    format!(
                        "{} completed Task \"{}\" & claimed {} BP Points",
                        account.name, task.title, task.reward
                    ),
                ),
                Ok(false) => report.failed(
                    account.index,
                    format!("Failed to claim Task \"{}\" for {}", task.title, account.name),
                ),
                Err(ApiError::RequiresManualCompletion) => report.info(
                    account.index,
                    format!(
                        "Task \"{}\" can't be completed automatically for {}, complete it manually",
                        task.title, account.name
                    ),
                ),
                Err(err) => report.remote_error(
                    account.index,
                    format!("Failed to complete Task \"{}\" for {}", task.title, account.name),
                    err,
                ),
            }
        }

        match self.api.fetch_balance(account.token) {
            Ok(balance) => report.info(
                account.index,
                format!(
                    "Automatic tasks processed for {} - points are now {}",
                    account.name,
                    balance.points.as_deref().unwrap_or("N/A")
                ),
            ),
            Err(err) => {
                log::debug!("balance unavailable for {}: {}", account.name, err);
                report.info(
                    account.index,
                    format!("Automatic tasks processed for {}", account.name),
                )
            }
        }
    }

    pub fn claim_referral_all(&self) -> ActionReport {
        self.for_each_ready("claim-referral", |account, report| {
            let balance = match self.api.fetch_referral_balance(account.token) {
                Ok(balance) => balance,
                Err(err) => {
                    return report.remote_error(
                        account.index,
                        format!("Failed to fetch Referral Rewards for {}", account.name),
                        err,
                    )
                }
            };
            let claimable = balance.claimable.trim().parse::<f64>().unwrap_or(0.0);
            if !balance.can_claim || claimable <= 0.0 {
                return report.info(
                    account.index,
                    format!("{} doesn't have referral rewards to claim now", account.name),
                );
            }
            match self.api.claim_referral(account.token) {
                Ok(amount) => report.success(
                    account.index,
                    format!(
                        "{} has claimed {:.2} BP Points from Referral Rewards",
                        account.name,
                        amount.trim().parse::<f64>().unwrap_or(claimable)
                    ),
                ),
                Err(err) => report.remote_error(
                    account.index,
                    format!("Failed to claim Referral Rewards for {}", account.name),
                    err,
                ),
            }
        })
    }

    /// Walks every keyword-gated task across all accounts. Task statuses are
    /// per account, so each account's task list is fetched for each task.
    pub fn run_keyword_tasks(&self, keywords: &mut dyn KeywordSource) -> ActionReport {
        let mut report = ActionReport::new("keyword-tasks");
        let ready = self.ready_accounts(&mut report);
        let first = match ready.first() {
            Some(first) => first,
            None => {
                report.note("No bearers available to complete manual tasks".to_string());
                return report;
            }
        };

        let catalog = match self.api.list_tasks(first.token) {
            Ok(sections) => tasks::keyword_tasks(&sections),
            Err(err) => {
                report.remote_error(
                    first.index,
                    format!("Failed to fetch tasks for {}", first.name),
                    err,
                );
                return report;
            }
        };
        report.note(format!(
            "Found {} manual task(s) requiring a keyword",
            catalog.len()
        ));

        for task in &catalog {
            let mut statuses = Vec::with_capacity(ready.len());
            for (n, account) in ready.iter().enumerate() {
                if n > 0 {
                    self.pause(self.pacing.between_calls);
                }
                statuses.push(self.task_status(account, task, &mut report));
            }

            if statuses.iter().all(|status| *status == TaskStatus::Finished) {
                report.note(format!(
                    "Task \"{}\" is already completed for all accounts",
                    task.title
                ));
                continue;
            }

            let answer = keywords.keyword_for(task);
            let keyword = answer.trim();
            if keyword.is_empty() {
                report.note(format!(
                    "No keyword entered for Task \"{}\", skipping",
                    task.title
                ));
                continue;
            }

            let mut paced = false;
            for (account, status) in ready.iter().zip(statuses) {
                let needs_calls = matches!(status, TaskStatus::NotStarted | TaskStatus::ReadyForVerify);
                if needs_calls {
                    if paced {
                        self.pause(self.pacing.between_calls);
                    }
                    paced = true;
                }
                self.advance_keyword_task(account, task, status, keyword, &mut report);
            }
        }

        report
    }

    fn task_status(
        &self,
        account: &Ready<'_>,
        task: &TaskDescriptor,
        report: &mut ActionReport,
    ) -> TaskStatus {
        match self.api.list_tasks(account.token) {
            Ok(sections) => tasks::status_of(&sections, &task.id),
            Err(err) => {
                report.remote_error(
                    account.index,
                    format!("Failed to fetch the status of \"{}\" for {}", task.title, account.name),
                    err,
                );
                TaskStatus::Unknown
            }
        }
    }

    /// One step of the per-(task, account) state machine:
    /// not-started -> start -> validate -> (ready-to-claim) -> claim.
    fn advance_keyword_task(
        &self,
        account: &Ready<'_>,
        task: &TaskDescriptor,
        status: TaskStatus,
        keyword: &str,
        report: &mut ActionReport,
    ) {
        match status {
            TaskStatus::Finished => report.info(
                account.index,
                format!("Task \"{}\" is already completed for {}", task.title, account.name),
            ),
            TaskStatus::ReadyForVerify => self.submit_keyword(account, task, keyword, report),
            TaskStatus::NotStarted => {
                if let Err(err) = self.api.start_task(account.token, &task.id) {
                    return report.remote_error(
                        account.index,
                        format!("Failed to start Task \"{}\" for {}", task.title, account.name),
                        err,
                    );
                }
                log::info!("{} started Task \"{}\"", account.name, task.title);
                self.submit_keyword(account, task, keyword, report);
            }
            TaskStatus::ReadyForClaim | TaskStatus::Unknown => report.skipped(
                account.index,
                format!(
                    "No keyword step for Task \"{}\" on {} ({:?})",
                    task.title, account.name, status
                ),
            ),
        }
    }

    fn submit_keyword(
        &self,
        account: &Ready<'_>,
        task: &TaskDescriptor,
        keyword: &str,
        report: &mut ActionReport,
    ) {
        match self.api.validate_task(account.token, &task.id, keyword) {
            Ok(true) => {}
            Ok(false) => {
                return report.failed(
                    account.index,
                    format!(
                        "Keyword rejected for Task \"{}\" on {}",
                        task.title, account.name
                    ),
                )
            }
            Err(err) => {
                return report.remote_error(
                    account.index,
                    format!("Failed to validate Task \"{}\" for {}", task.title, account.name),
                    err,
                )
            }
        }

        let status = match self.api.list_tasks(account.token) {
            Ok(sections) => tasks::status_of(&sections, &task.id),
            Err(err) => {
                return report.remote_error(
                    account.index,
                    format!("Failed to refresh Task \"{}\" for {}", task.title, account.name),
                    err,
                )
            }
        };
        if status != TaskStatus::ReadyForClaim {
            return report.info(
                account.index,
                format!(
                    "Task \"{}\" is validated but not yet claimable for {}",
                    task.title, account.name
                ),
            );
        }

        match self.api.claim_task(account.token, &task.id) {
            Ok(true) => report.success(
                account.index,
                format!(
                    "{} completed & claimed Task \"{}\" and obtained {} BP Points",
                    account.name, task.title, task.reward
                ),
            ),
            Ok(false) => report.failed(
                account.index,
                format!("Failed to claim Task \"{}\" for {}", task.title, account.name),
            ),
            Err(err) => report.remote_error(
                account.index,
                format!("Failed to claim Task \"{}\" for {}", task.title, account.name),
                err,
            ),
        }
    }
}
