use crate::{
    api::{ApiError, Balance, CheckIn, FarmWindow, GameApi, Profile, ReferralBalance, Wallet},
    tasks::TaskSection,
};
use anyhow::Result;
use reqwest::{
    blocking::{Client, RequestBuilder},
    header::ACCEPT,
};
use serde_json::{json, Value};
use std::time::Duration;

const USER_DOMAIN: &str = "https://user-domain.blum.codes/api/v1";
const GAME_DOMAIN: &str = "https://game-domain.blum.codes/api/v1";
const TRIBE_DOMAIN: &str = "https://tribe-domain.blum.codes/api/v1";
const WALLET_DOMAIN: &str = "https://wallet-domain.blum.codes/api/v1";
const EARN_DOMAIN: &str = "https://earn-domain.blum.codes/api/v1";

/// Raw outcome of a non-2xx exchange, before it is mapped to an [`ApiError`].
#[derive(Debug)]
struct Failure {
    status: Option<u16>,
    message: String,
}

impl Failure {
    /// Pulls the server's message from a non-2xx body, JSON or plain text.
    fn from_body(status: u16, body: &Value) -> Self {
        let message = body["message"]
            .as_str()
            .or_else(|| body.as_str())
            .unwrap_or("unexpected response")
            .to_string();
        Self {
            status: Some(status),
            message,
        }
    }

    fn network(err: reqwest::Error) -> Self {
        Self {
            status: None,
            message: format!("Network error: {}", err),
        }
    }

    fn malformed(what: &str) -> Self {
        Self {
            status: None,
            message: format!("Malformed response: missing {}", what),
        }
    }

    fn status_in(&self, codes: &[u16]) -> bool {
        self.status.map_or(false, |status| codes.contains(&status))
    }

    fn describe(&self) -> String {
        match self.status {
            Some(status) => format!("Error {}: {}", status, self.message),
            None => self.message.clone(),
        }
    }

    fn into_auth(self) -> ApiError {
        ApiError::Auth(self.describe())
    }

    fn into_fetch(self) -> ApiError {
        ApiError::Fetch(self.describe())
    }

    fn into_action(self) -> ApiError {
        ApiError::Action(self.describe())
    }

    /// Task endpoints answer 400/412 for tasks that need a human in the loop.
    fn into_task(self) -> ApiError {
        if self.status_in(&[400, 412]) {
            ApiError::RequiresManualCompletion
        } else {
            self.into_action()
        }
    }

    fn into_check_in(self) -> ApiError {
        if self.message.trim() == "same day" {
            ApiError::AlreadyClaimedToday
        } else {
            self.into_action()
        }
    }

    fn into_farm_claim(self) -> ApiError {
        if self.status_in(&[400, 425]) {
            ApiError::TooEarly
        } else {
            self.into_action()
        }
    }

    /// Accounts outside any tribe get a 404 or a `NOT_FOUND` message.
    fn group_absent(&self) -> bool {
        self.status_in(&[404]) || self.message == "NOT_FOUND"
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    }
}

pub struct Blum {
    client: Client,
}

impl Blum {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str, token: &str) -> Result<Value, Failure> {
        self.exchange(self.client.get(url).bearer_auth(token))
    }

    fn post(&self, url: &str, token: &str, body: &Value) -> Result<Value, Failure> {
        self.exchange(self.client.post(url).bearer_auth(token).json(body))
    }

    fn exchange(&self, request: RequestBuilder) -> Result<Value, Failure> {
        let res = request
            .header(ACCEPT, "application/json")
            .send()
            .map_err(Failure::network)?;
        let status = res.status().as_u16();
        let url = res.url().path().to_string();
        let text = res.text().map_err(Failure::network)?;
        log::debug!("{} -> {}", url, status);
        let body = parse_body(text);
        if !(200..300).contains(&status) {
            return Err(Failure::from_body(status, &body));
        }
        Ok(body)
    }
}

/// Amounts arrive as decimal strings, occasionally as numbers.
fn amount(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn task_status_is(body: &Value, expected: &str) -> bool {
    body["status"].as_str() == Some(expected)
}

impl GameApi for Blum {
    fn authenticate(&self, seed: &str) -> Result<String, ApiError> {
        let url = format!("{}/auth/provider/PROVIDER_TELEGRAM_MINI_APP", USER_DOMAIN);
        let res = self
            .exchange(self.client.post(&url).json(&json!({ "query": seed })))
            .map_err(Failure::into_auth)?;
        res["token"]["access"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Failure::malformed("token.access").into_auth())
    }

    fn fetch_profile(&self, token: &str) -> Result<Profile, ApiError> {
        let res = self
            .get(&format!("{}/user/me", USER_DOMAIN), token)
            .map_err(Failure::into_fetch)?;
        Ok(Profile {
            username: res["username"].as_str().map(str::to_string),
        })
    }

    fn fetch_balance(&self, token: &str) -> Result<Balance, ApiError> {
        let res = self
            .get(&format!("{}/user/balance", GAME_DOMAIN), token)
            .map_err(Failure::into_fetch)?;
        Ok(Balance {
            points: amount(&res["availableBalance"]),
            play_passes: res["playPasses"].as_u64(),
        })
    }

    fn fetch_group(&self, token: &str) -> Result<Option<String>, ApiError> {
        let res = match self.get(&format!("{}/tribe/my", TRIBE_DOMAIN), token) {
            Ok(res) => res,
            Err(failure) if failure.group_absent() => return Ok(None),
            Err(failure) => return Err(failure.into_fetch()),
        };
        if res["message"].as_str() == Some("NOT_FOUND") {
            return Ok(None);
        }
        Ok(res["title"].as_str().map(str::to_string))
    }

    fn fetch_wallet(&self, token: &str) -> Result<Wallet, ApiError> {
        let res = self
            .get(&format!("{}/wallet/my", WALLET_DOMAIN), token)
            .map_err(Failure::into_fetch)?;
        let linked = res["address"]
            .as_str()
            .map_or(false, |address| !address.is_empty());
        Ok(Wallet { linked })
    }

    fn check_in(&self, token: &str) -> Result<CheckIn, ApiError> {
        let url = format!("{}/daily-reward?offset=-420", GAME_DOMAIN);
        let res = self
            .exchange(self.client.post(&url).bearer_auth(token))
            .map_err(Failure::into_check_in)?;
        Ok(CheckIn {
            streak: res["ordinal"].as_u64(),
            points: amount(&res["reward"]["points"]),
            passes: res["reward"]["passes"].as_u64(),
        })
    }

    fn claim_farm_rewards(&self, token: &str) -> Result<String, ApiError> {
        let res = self
            .post(&format!("{}/farming/claim", GAME_DOMAIN), token, &json!({}))
            .map_err(Failure::into_farm_claim)?;
        amount(&res["availableBalance"])
            .ok_or_else(|| Failure::malformed("availableBalance").into_action())
    }

    fn start_farm(&self, token: &str) -> Result<FarmWindow, ApiError> {
        let res = self
            .post(&format!("{}/farming/start", GAME_DOMAIN), token, &json!({}))
            .map_err(Failure::into_action)?;
        match (res["startTime"].as_i64(), res["endTime"].as_i64()) {
            (Some(start_ms), Some(end_ms)) => Ok(FarmWindow { start_ms, end_ms }),
            _ => Err(Failure::malformed("startTime/endTime").into_action()),
        }
    }

    fn list_tasks(&self, token: &str) -> Result<Vec<TaskSection>, ApiError> {
        let res = self
            .get(&format!("{}/tasks", EARN_DOMAIN), token)
            .map_err(Failure::into_fetch)?;
        serde_json::from_value(res).map_err(|err| ApiError::Fetch(err.to_string()))
    }

    fn start_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError> {
        let url = format!("{}/tasks/{}/start", EARN_DOMAIN, task_id);
        let res = self
            .post(&url, token, &json!({}))
            .map_err(Failure::into_task)?;
        Ok(task_status_is(&res, "STARTED"))
    }

    fn claim_task(&self, token: &str, task_id: &str) -> Result<bool, ApiError> {
        let url = format!("{}/tasks/{}/claim", EARN_DOMAIN, task_id);
        let res = self
            .post(&url, token, &json!({}))
            .map_err(Failure::into_task)?;
        Ok(task_status_is(&res, "FINISHED"))
    }

    fn validate_task(&self, token: &str, task_id: &str, keyword: &str) -> Result<bool, ApiError> {
        let url = format!("{}/tasks/{}/validate", EARN_DOMAIN, task_id);
        let res = self
            .post(&url, token, &json!({ "keyword": keyword }))
            .map_err(Failure::into_task)?;
        Ok(task_status_is(&res, "READY_FOR_CLAIM"))
    }

    fn fetch_referral_balance(&self, token: &str) -> Result<ReferralBalance, ApiError> {
        let res = self
            .get(&format!("{}/friends/balance", USER_DOMAIN), token)
            .map_err(Failure::into_action)?;
        Ok(ReferralBalance {
            can_claim: res["canClaim"].as_bool().unwrap_or(false),
            claimable: amount(&res["amountForClaim"]).unwrap_or_else(|| "0".to_string()),
        })
    }

    fn claim_referral(&self, token: &str) -> Result<String, ApiError> {
        let res = self
            .post(&format!("{}/friends/claim", USER_DOMAIN), token, &json!({}))
            .map_err(Failure::into_action)?;
        amount(&res["claimBalance"]).ok_or_else(|| Failure::malformed("claimBalance").into_action())
    }
}
