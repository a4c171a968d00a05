//! In-memory doubles shared by the unit tests.

use crate::{
    actions::KeywordSource,
    api::{ApiError, Balance, CheckIn, FarmWindow, GameApi, Profile, ReferralBalance, Wallet},
    session::Sleeper,
    tasks::{TaskDescriptor, TaskSection, TaskStatus, ValidationMode},
};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub token: String,
    pub arg: Option<String>,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    failing_auth: HashSet<String>,
    token_suffix: String,
    usernames: HashMap<String, String>,
    groups: HashMap<String, String>,
    errors: HashMap<(&'static str, String), ApiError>,
    tasks: HashMap<String, Vec<TaskSection>>,
    referrals: HashMap<String, ReferralBalance>,
    rejected_keyword: Option<String>,
    check_in: Option<CheckIn>,
}

/// Scripted [`GameApi`]. Seeds authenticate to `tok-<seed>`; every call is logged.
#[derive(Default)]
pub struct MockApi {
    state: RefCell<State>,
}

const ANY: &str = "*";

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_auth(&self, seed: &str) {
        self.state.borrow_mut().failing_auth.insert(seed.to_string());
    }

    pub fn set_token_suffix(&self, suffix: &str) {
        self.state.borrow_mut().token_suffix = suffix.to_string();
    }

    pub fn set_username(&self, token: &str, name: &str) {
        self.state
            .borrow_mut()
            .usernames
            .insert(token.to_string(), name.to_string());
    }

    pub fn set_group(&self, token: &str, group: Option<&str>) {
        let mut state = self.state.borrow_mut();
        match group {
            Some(group) => state.groups.insert(token.to_string(), group.to_string()),
            None => state.groups.remove(token),
        };
    }

    /// Fails `op` for every token.
    pub fn fail_fetch(&self, op: &'static str, err: ApiError) {
        self.fail_on(op, ANY, err);
    }

    pub fn fail_on(&self, op: &'static str, token: &str, err: ApiError) {
        self.state
            .borrow_mut()
            .errors
            .insert((op, token.to_string()), err);
    }

    pub fn set_tasks(&self, token: &str, sections: Vec<TaskSection>) {
        self.state
            .borrow_mut()
            .tasks
            .insert(token.to_string(), sections);
    }

    pub fn set_referral(&self, token: &str, can_claim: bool, claimable: &str) {
        self.state.borrow_mut().referrals.insert(
            token.to_string(),
            ReferralBalance {
                can_claim,
                claimable: claimable.to_string(),
            },
        );
    }

    pub fn set_check_in(&self, reward: CheckIn) {
        self.state.borrow_mut().check_in = Some(reward);
    }

    pub fn reject_keyword(&self, keyword: &str) {
        self.state.borrow_mut().rejected_keyword = Some(keyword.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn ops_for(&self, token: &str) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter(|call| call.token == token)
            .map(|call| call.op)
            .collect()
    }

    pub fn auth_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == "authenticate")
            .map(|call| call.token)
            .collect()
    }

    fn record(&self, op: &'static str, token: &str, arg: Option<&str>) -> Result<(), ApiError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call {
            op,
            token: token.to_string(),
            arg: arg.map(str::to_string),
        });
        let scripted = state
            .errors
            .get(&(op, token.to_string()))
            .or_else(|| state.errors.get(&(op, ANY.to_string())))
            .cloned();
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_status(&self, token: &str, task_id: &str, status: TaskStatus) {
        fn walk(sections: &mut [TaskSection], task_id: &str, status: TaskStatus) {
            for section in sections {
                for task in section.tasks.iter_mut().filter(|t| t.id == task_id) {
                    task.status = status;
                }
                walk(&mut section.sub_sections, task_id, status);
            }
        }
        if let Some(sections) = self.state.borrow_mut().tasks.get_mut(token) {
            walk(sections, task_id, status);
        }
    }
}

impl GameApi for MockApi {
    fn authenticate(&self, seed: &str) -> Result<String, ApiError> {
        self.record("authenticate", seed, None)?;
        let state = self.state.borrow();
        if state.failing_auth.contains(seed) {
            return Err(ApiError::Auth("Error 401: invalid init data".to_string()));
        }
        Ok(format!("tok-{}{}", seed, state.token_suffix))
    }

    fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError> {
        self.record("profile", token, None)?;
        let username = self
            .state
            .borrow()
            .usernames
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.replacen("tok-", "user-", 1));
        Ok(Profile {
            username: Some(username),
        })
    }

    fn fetch_balance(&self, token: &str) -> Result<Balance, ApiError> {
        self.record("balance", token, None)?;
        Ok(Balance {
            points: Some("1500.75".to_string()),
            play_passes: Some(3),
        })
    }

    fn fetch_group(&self, token: &str) -> Result<Option<String>, ApiError> {
        self.record("group", token, None)?;
        Ok(self.state.borrow().groups.get(token).cloned())
    }

    fn fetch_wallet(&self, token: &str) -> Result<Wallet, ApiError> {
        self.record("wallet", token, None)?;
        Ok(Wallet { linked: false })
    }

    fn check_in(&self, token: &str) -> Result<CheckIn, ApiError> {
        self.record("check_in", token, None)?;
        Ok(self.state.borrow().check_in.clone().unwrap_or(CheckIn {
            streak: Some(4),
            points: Some("25".to_string()),
            passes: Some(1),
        }))
    }

    fn claim_farm_rewards(&self, token: &str) -> Result<String, ApiError> {
        self.record("claim_farm", token, None)?;
        Ok("2071.09".to_string())
    }

    fn start_farm(&self, token: &str) -> Result<FarmWindow, ApiError> {
        self.record("start_farm", token, None)?;
        Ok(FarmWindow {
            start_ms: 1_700_000_000_000,
            end_ms: 1_700_028_800_000,
        })
    }

    fn list_tasks(&self, token: &str) -> Result<Vec<TaskSection>, ApiError> {
        self.record("list_tasks", token, None)?;
        Ok(self
            .state
            .borrow()
            .tasks
            .get(token)
            .cloned()
            .unwrap_or_default())
    }

    fn start_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError> {
        self.record("start_task", token, Some(task_id))?;
        self.set_status(token, task_id, TaskStatus::ReadyForVerify);
        Ok(true)
    }

    fn claim_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError> {
        self.record("claim_task", token, Some(task_id))?;
        self.set_status(token, task_id, TaskStatus::Finished);
        Ok(true)
    }

    fn validate_task(&self, token: &str, task_id: &str, keyword: &str) -> Result<bool, ApiError> {
        self.record("validate_task", token, Some(keyword))?;
        if self.state.borrow().rejected_keyword.as_deref() == Some(keyword) {
            return Ok(false);
        }
        self.set_status(token, task_id, TaskStatus::ReadyForClaim);
        Ok(true)
    }

    fn fetch_referral_balance(&self, token: &str) -> Result<ReferralBalance, ApiError> {
        self.record("referral_balance", token, None)?;
        Ok(self
            .state
            .borrow()
            .referrals
            .get(token)
            .cloned()
            .unwrap_or(ReferralBalance {
                can_claim: false,
                claimable: "0".to_string(),
            }))
    }

    fn claim_referral(&self, token: &str) -> Result<String, ApiError> {
        self.record("claim_referral", token, None)?;
        let state = self.state.borrow();
        Ok(state
            .referrals
            .get(token)
            .map_or_else(|| "0".to_string(), |r| r.claimable.clone()))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// Answers keyword prompts from a queue, remembering which tasks were asked about.
#[derive(Default)]
pub struct ScriptedKeywords {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedKeywords {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

impl KeywordSource for ScriptedKeywords {
    fn keyword_for(&mut self, task: &TaskDescriptor) -> String {
        self.asked.push(task.id.clone());
        self.answers.pop_front().unwrap_or_default()
    }
}

pub fn task(id: &str, validation: ValidationMode, status: TaskStatus) -> TaskDescriptor {
    TaskDescriptor {
        id: id.to_string(),
        title: format!("Task {}", id),
        reward: "100".to_string(),
        validation,
        status,
    }
}

pub fn section(tasks: Vec<TaskDescriptor>, sub_sections: Vec<TaskSection>) -> TaskSection {
    TaskSection {
        tasks,
        sub_sections,
    }
}
