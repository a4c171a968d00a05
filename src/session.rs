use crate::{api::GameApi, fileio::TokenStore};
use std::{fmt, thread, time::Duration};

/// Blocking wait, injected so that pacing and cycle cadence can be observed in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between consecutive authentication calls and between accounts within an action.
    pub between_calls: Duration,
    /// Between two actions of one unattended cycle.
    pub cooldown: Duration,
    /// Between unattended cycles.
    pub cycle_interval: Duration,
    /// Before the interactive menu is shown again.
    pub menu_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_calls: Duration::from_millis(500),
            cooldown: Duration::from_secs(30),
            cycle_interval: Duration::from_secs(9 * 60 * 60),
            menu_pause: Duration::from_millis(300),
        }
    }
}

/// Cached view of one account. `None` means the field could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub username: Option<String>,
    pub points: Option<String>,
    pub group: Option<String>,
    pub play_passes: Option<u64>,
    pub wallet_linked: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub seed: String,
    pub token: Option<String>,
    pub snapshot: AccountSnapshot,
}

/// Name used in status lines; falls back to the 1-based position.
pub struct Label<'a>(pub usize, pub &'a AccountSnapshot);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.1.username {
            Some(name) => f.write_str(name),
            None => write!(f, "account #{}", self.0 + 1),
        }
    }
}

impl Account {
    pub fn label(&self, index: usize) -> Label<'_> {
        Label(index, &self.snapshot)
    }
}

/// Owns the ordered accounts together with their bearer tokens and snapshots.
/// Index `i` refers to the same account for the whole run.
pub struct Session<'a> {
    pub(crate) api: &'a dyn GameApi,
    pub(crate) sleeper: &'a dyn Sleeper,
    pub(crate) pacing: Pacing,
    store: TokenStore,
    accounts: Vec<Account>,
}

impl<'a> Session<'a> {
    pub fn new(
        api: &'a dyn GameApi,
        sleeper: &'a dyn Sleeper,
        pacing: Pacing,
        store: TokenStore,
        seeds: Vec<String>,
    ) -> Self {
        let accounts = seeds
            .into_iter()
            .map(|seed| Account {
                seed,
                token: None,
                snapshot: AccountSnapshot::default(),
            })
            .collect();
        Self {
            api,
            sleeper,
            pacing,
            store,
            accounts,
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.accounts.iter().map(|a| a.token.clone()).collect()
    }

    pub(crate) fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }

    /// Single re-authentication; failures are logged and yield `None`.
    pub fn refresh_one(&self, index: usize) -> Option<String> {
        let account = self.accounts.get(index)?;
        match self.api.authenticate(&account.seed) {
            Ok(token) => Some(token),
            Err(err) => {
                log::warn!("Could not obtain a bearer for account #{}: {}", index + 1, err);
                None
            }
        }
    }

    /// Authenticates every account in order, replacing all tokens, then
    /// persists the whole batch.
    pub fn acquire_all(&mut self) -> Vec<Option<String>> {
        for index in 0..self.accounts.len() {
            if index > 0 {
                self.pause(self.pacing.between_calls);
            }
            self.accounts[index].token = self.refresh_one(index);
        }
        self.persist();
        let tokens = self.tokens();
        log::info!(
            "Generated bearers for {}/{} accounts",
            tokens.iter().filter(|t| t.is_some()).count(),
            tokens.len()
        );
        tokens
    }

    /// Reuses cached bearers when the cache lines up with the seed list,
    /// authenticating only the accounts whose bearer is missing.
    pub fn load_or_initialize(&mut self) -> Vec<Option<String>> {
        let stored = self.store.load();
        if stored.len() != self.accounts.len() {
            log::info!(
                "Bearer cache holds {} entries for {} accounts, regenerating",
                stored.len(),
                self.accounts.len()
            );
            return self.acquire_all();
        }

        let mut filled = 0;
        for (index, token) in stored.into_iter().enumerate() {
            self.accounts[index].token = match token {
                Some(token) => Some(token),
                None => {
                    if filled > 0 {
                        self.pause(self.pacing.between_calls);
                    }
                    filled += 1;
                    self.refresh_one(index)
                }
            };
        }
        if filled > 0 {
            self.persist();
        }
        self.tokens()
    }

    /// Re-authenticates every account, keeping the previous bearer when a
    /// refresh fails.
    pub fn rotate_tokens(&mut self) {
        for index in 0..self.accounts.len() {
            if index > 0 {
                self.pause(self.pacing.between_calls);
            }
            if let Some(token) = self.refresh_one(index) {
                self.accounts[index].token = Some(token);
            }
        }
        self.persist();
    }

    pub fn rebuild_snapshots(&mut self) {
        for index in 0..self.accounts.len() {
            let snapshot = match &self.accounts[index].token {
                Some(token) => build_snapshot(self.api, token),
                None => AccountSnapshot::default(),
            };
            self.accounts[index].snapshot = snapshot;
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.tokens()) {
            log::warn!("Bearer cache not updated: {:#}", err);
        }
    }
}

/// Each field is fetched independently; a failed fetch leaves only that field unknown.
pub fn build_snapshot(api: &dyn GameApi, token: &str) -> AccountSnapshot {
    let mut snapshot = AccountSnapshot::default();

    match api.fetch_profile(token) {
        Ok(profile) => snapshot.username = profile.username,
        Err(err) => log::debug!("profile unavailable: {}", err),
    }
    match api.fetch_balance(token) {
        Ok(balance) => {
            snapshot.points = balance.points;
            snapshot.play_passes = balance.play_passes;
        }
        Err(err) => log::debug!("balance unavailable: {}", err),
    }
    match api.fetch_group(token) {
        Ok(group) => snapshot.group = group,
        Err(err) => log::debug!("tribe unavailable: {}", err),
    }
    match api.fetch_wallet(token) {
        Ok(wallet) => snapshot.wallet_linked = Some(wallet.linked),
        Err(err) => log::debug!("wallet unavailable: {}", err),
    }

    snapshot
}
