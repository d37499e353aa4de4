//! Main ledger orchestration layer
//!
//! This module ties together storage, the writer actor, randomness and
//! metrics into the API the command dispatcher calls.
//!
//! # Example
//!
//! ```no_run
//! use coin_ledger::{AccountId, Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> coin_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     let balance = ledger.balance(AccountId::new("1001")).await?;
//!     assert_eq!(balance, 1000);
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    accounts::{self, AdminOutcome, TransferReceipt},
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    ranking::{self, RankEntry},
    settings::PlatformRole,
    storage::{open_store, LedgerStore},
    types::{AccountId, Snapshot},
    wager::{DrawResult, Parity, RollSource, WagerOutcome},
    Config, Error, Result,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for mutations
    handle: LedgerHandle,

    /// Direct store access (for reads)
    store: Arc<dyn LedgerStore>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let store = open_store(&config.data_dir, &config.storage)?;
        Self::with_store(store, Box::new(StdRng::from_entropy()), config)
    }

    /// Build a ledger over an existing store and roll source
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_store(
        store: Arc<dyn LedgerStore>,
        rolls: Box<dyn RollSource>,
        config: Config,
    ) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;
        let handle = spawn_ledger_actor(store.clone(), rolls, config.ledger.mailbox_capacity);

        Ok(Self {
            handle,
            store,
            metrics,
            config,
        })
    }

    /// Caller's balance, opening the account if needed
    pub async fn balance(&self, account: AccountId) -> Result<u64> {
        self.bounded(self.handle.balance(account)).await
    }

    /// Give `amount` coins from `from` to `to`
    pub async fn give(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt> {
        let receipt = self.bounded(self.handle.transfer(from, to, amount)).await?;
        self.metrics.record_transfer();
        tracing::info!(
            from = %receipt.from,
            to = %receipt.to,
            amount = receipt.amount,
            "Coins transferred"
        );
        Ok(receipt)
    }

    /// Dice duel between `initiator` and `opponent`
    pub async fn dice_duel(
        &self,
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
    ) -> Result<WagerOutcome> {
        let result = self
            .bounded(self.handle.dice_duel(initiator, opponent, stake))
            .await;
        self.record_wager(&result);
        result
    }

    /// Odd/even with `initiator` calling `call`
    pub async fn odd_even(
        &self,
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
        call: Parity,
    ) -> Result<WagerOutcome> {
        let result = self
            .bounded(self.handle.odd_even(initiator, opponent, stake, call))
            .await;
        self.record_wager(&result);
        result
    }

    /// Admin-only weighted draw; no balance effect
    pub async fn draw(&self, caller: AccountId) -> Result<DrawResult> {
        self.bounded(self.handle.draw(caller)).await
    }

    /// Admin mint; returns the target's new balance
    pub async fn grant(&self, caller: AccountId, target: AccountId, amount: u64) -> Result<u64> {
        let balance = self
            .bounded(self.handle.grant(caller.clone(), target.clone(), amount))
            .await?;
        tracing::info!(caller = %caller, target = %target, amount, balance, "Coins granted");
        Ok(balance)
    }

    /// Change the fee rate; returns the previous rate
    pub async fn set_fee_rate(&self, caller: AccountId, rate: f64) -> Result<f64> {
        self.bounded(self.handle.set_fee_rate(caller, rate)).await
    }

    /// Add an application admin; needs the platform administrator role
    pub async fn add_admin(
        &self,
        caller: AccountId,
        role: PlatformRole,
        target: AccountId,
    ) -> Result<AdminOutcome> {
        self.bounded(self.handle.add_admin(caller, role, target)).await
    }

    /// Leaderboard with the configured length
    pub fn leaderboard(&self) -> Result<Vec<RankEntry>> {
        self.top(self.config.ledger.leaderboard_size)
    }

    /// Top `n` accounts by balance
    pub fn top(&self, n: usize) -> Result<Vec<RankEntry>> {
        Ok(ranking::top(&self.store.load()?, n))
    }

    /// Is `account` an application admin
    pub fn is_admin(&self, account: &AccountId) -> Result<bool> {
        Ok(accounts::is_admin(&self.store.load()?, account))
    }

    /// Current fee rate
    pub fn fee_rate(&self) -> Result<f64> {
        Ok(self.store.load()?.config.fee_rate)
    }

    /// Copy of the durable snapshot
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.store.load()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    ///
    /// Returns once the store has been released, so it can be reopened.
    pub async fn shutdown(self) -> Result<()> {
        let Ledger { handle, store, .. } = self;
        drop(store);
        handle.shutdown().await
    }

    /// Run `op` under the configured deadline and record its latency
    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout_ms = self.config.ledger.operation_timeout_ms;
        let started = Instant::now();

        let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_ms, "Ledger operation timed out");
                Err(Error::Timeout(timeout_ms))
            }
        };

        self.metrics.record_duration(started.elapsed().as_secs_f64());
        result
    }

    fn record_wager(&self, result: &Result<WagerOutcome>) {
        match result {
            Ok(WagerOutcome::Settled(settlement)) => {
                self.metrics.record_settled(settlement.quote.fee)
            }
            Ok(WagerOutcome::Tied { .. }) => self.metrics.record_tied(),
            Err(e) if e.is_validation() => self.metrics.record_rejected(),
            Err(e) => tracing::warn!("Wager failed: {}", e),
        }
    }
}
