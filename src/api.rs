use crate::tasks::TaskSection;
use thiserror::Error;

/// Failure of a single remote call, classified once where the HTTP response is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("already claimed today")]
    AlreadyClaimedToday,

    #[error("too early to claim")]
    TooEarly,

    #[error("task must be completed manually")]
    RequiresManualCompletion,

    #[error("{0}")]
    Action(String),
}

impl ApiError {
    /// Expected outcomes that are reported to the user but are not failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ApiError::AlreadyClaimedToday | ApiError::TooEarly | ApiError::RequiresManualCompletion
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub points: Option<String>,
    pub play_passes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wallet {
    pub linked: bool,
}

/// Fields are `None` when the response leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub streak: Option<u64>,
    pub points: Option<String>,
    pub passes: Option<u64>,
}

/// Farming window as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralBalance {
    pub can_claim: bool,
    pub claimable: String,
}

/// One blocking request/response exchange per game operation.
pub trait GameApi {
    fn authenticate(&self, seed: &str) -> Result<String, ApiError>;

    fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError>;
    fn fetch_balance(&self, token: &str) -> Result<Balance, ApiError>;
    /// `None` when the account has not joined a tribe.
    fn fetch_group(&self, token: &str) -> Result<Option<String>, ApiError>;
    fn fetch_wallet(&self, token: &str) -> Result<Wallet, ApiError>;

    fn check_in(&self, token: &str) -> Result<CheckIn, ApiError>;
    /// Returns the new point balance.
    fn claim_farm_rewards(&self, token: &str) -> Result<String, ApiError>;
    fn start_farm(&self, token: &str) -> Result<FarmWindow, ApiError>;

    fn list_tasks(&self, token: &str) -> Result<Vec<TaskSection>, ApiError>;
    fn start_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError>;
    fn claim_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError>;
    fn validate_task(&self, token: &str, task_id: &str, keyword: &str)
        -> Result<bool, ApiError>;

    fn fetch_referral_balance(&self, token: &str) -> Result<ReferralBalance, ApiError>;
    /// Returns the claimed amount.
    fn claim_referral(&self, token: &str) -> Result<String, ApiError>;
}
