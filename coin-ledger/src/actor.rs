//! Actor-based concurrency for the ledger
//!
//! Every mutating operation runs inside one task, one message at a time:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                   │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)               │
//! │   store.load() → mutate snapshot → store.save()      │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Because the whole load-mutate-save cycle of one message finishes before
//! the next message is taken, two wagers touching the same account can
//! never both start from the same stale snapshot. A failed save is
//! reported and the mutated snapshot is dropped; the next message reloads.

use crate::{
    accounts::{self, AdminOutcome, TransferReceipt},
    settings::{self, PlatformRole},
    storage::LedgerStore,
    types::{AccountId, Snapshot},
    wager::{self, DrawResult, Parity, RollSource, WagerOutcome},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Get-or-create balance
    Balance {
        account: AccountId,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Move coins between accounts
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u64,
        response: oneshot::Sender<Result<TransferReceipt>>,
    },

    /// Dice duel
    DiceDuel {
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
        response: oneshot::Sender<Result<WagerOutcome>>,
    },

    /// Odd/even
    OddEven {
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
        call: Parity,
        response: oneshot::Sender<Result<WagerOutcome>>,
    },

    /// Admin-only weighted draw
    Draw {
        caller: AccountId,
        response: oneshot::Sender<Result<DrawResult>>,
    },

    /// Admin mint
    Grant {
        caller: AccountId,
        target: AccountId,
        amount: u64,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Change fee rate
    SetFeeRate {
        caller: AccountId,
        rate: f64,
        response: oneshot::Sender<Result<f64>>,
    },

    /// Add an application admin
    AddAdmin {
        caller: AccountId,
        role: PlatformRole,
        target: AccountId,
        response: oneshot::Sender<Result<AdminOutcome>>,
    },

    /// Shutdown actor; acknowledged once the store is released
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Actor that owns every write to the store
pub struct LedgerActor {
    /// Storage backend
    store: Arc<dyn LedgerStore>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Randomness for wagers and draws
    rolls: Box<dyn RollSource>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        rolls: Box<dyn RollSource>,
    ) -> Self {
        Self {
            store,
            mailbox,
            rolls,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let mut ack = None;
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown { response } = msg {
                tracing::info!("Ledger actor shutting down");
                ack = Some(response);
                break;
            }
            self.handle_message(msg);
        }

        drop(self);
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Balance { account, response } => {
                let result =
                    self.apply(|snapshot, _| Ok(accounts::get_balance(snapshot, &account)));
                let _ = response.send(result);
            }

            LedgerMessage::Transfer {
                from,
                to,
                amount,
                response,
            } => {
                let result = self.apply(|snapshot, _| {
                    accounts::transfer(snapshot, &from, &to, amount).map(|r| (r, true))
                });
                let _ = response.send(result);
            }

            LedgerMessage::DiceDuel {
                initiator,
                opponent,
                stake,
                response,
            } => {
                let result = self.apply(|snapshot, rolls| {
                    let outcome = wager::dice_duel(snapshot, &initiator, &opponent, stake, rolls)?;
                    let settled = outcome.is_settled();
                    Ok((outcome, settled))
                });
                let _ = response.send(result);
            }

            LedgerMessage::OddEven {
                initiator,
                opponent,
                stake,
                call,
                response,
            } => {
                let result = self.apply(|snapshot, rolls| {
                    let outcome =
                        wager::odd_even(snapshot, &initiator, &opponent, stake, call, rolls)?;
                    let settled = outcome.is_settled();
                    Ok((outcome, settled))
                });
                let _ = response.send(result);
            }

            LedgerMessage::Draw { caller, response } => {
                let result = self.apply(|snapshot, rolls| {
                    wager::draw(snapshot, &caller, rolls).map(|d| (d, false))
                });
                let _ = response.send(result);
            }

            LedgerMessage::Grant {
                caller,
                target,
                amount,
                response,
            } => {
                let result = self.apply(|snapshot, _| {
                    accounts::grant(snapshot, &caller, &target, amount).map(|b| (b, true))
                });
                let _ = response.send(result);
            }

            LedgerMessage::SetFeeRate {
                caller,
                rate,
                response,
            } => {
                let result = self.apply(|snapshot, _| {
                    settings::set_fee_rate(snapshot, &caller, rate).map(|p| (p, true))
                });
                let _ = response.send(result);
            }

            LedgerMessage::AddAdmin {
                caller,
                role,
                target,
                response,
            } => {
                let result = self.apply(|snapshot, _| {
                    let outcome = settings::add_admin(snapshot, &caller, role, &target)?;
                    Ok((outcome, outcome == AdminOutcome::Added))
                });
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown { .. } => {
                // Handled in run loop
            }
        }
    }

    /// One load-mutate-save cycle
    ///
    /// `op` returns its value and whether it changed the snapshot. Newly
    /// opened accounts also count as a change. Nothing is saved when `op`
    /// fails.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Snapshot, &mut dyn RollSource) -> Result<(T, bool)>,
    ) -> Result<T> {
        let mut snapshot = self.store.load()?;
        let accounts_before = snapshot.users.len();

        let (value, changed) = op(&mut snapshot, self.rolls.as_mut())?;

        if changed || snapshot.users.len() != accounts_before {
            self.store.save(&snapshot).map_err(|e| {
                tracing::warn!("Snapshot save failed, operation discarded: {}", e);
                e
            })?;
        }
        Ok(value)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get-or-create balance
    pub async fn balance(&self, account: AccountId) -> Result<u64> {
        self.request(|response| LedgerMessage::Balance { account, response })
            .await
    }

    /// Transfer coins
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt> {
        self.request(|response| LedgerMessage::Transfer {
            from,
            to,
            amount,
            response,
        })
        .await
    }

    /// Dice duel
    pub async fn dice_duel(
        &self,
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
    ) -> Result<WagerOutcome> {
        self.request(|response| LedgerMessage::DiceDuel {
            initiator,
            opponent,
            stake,
            response,
        })
        .await
    }

    /// Odd/even
    pub async fn odd_even(
        &self,
        initiator: AccountId,
        opponent: AccountId,
        stake: u64,
        call: Parity,
    ) -> Result<WagerOutcome> {
        self.request(|response| LedgerMessage::OddEven {
            initiator,
            opponent,
            stake,
            call,
            response,
        })
        .await
    }

    /// Weighted draw
    pub async fn draw(&self, caller: AccountId) -> Result<DrawResult> {
        self.request(|response| LedgerMessage::Draw { caller, response })
            .await
    }

    /// Admin mint
    pub async fn grant(&self, caller: AccountId, target: AccountId, amount: u64) -> Result<u64> {
        self.request(|response| LedgerMessage::Grant {
            caller,
            target,
            amount,
            response,
        })
        .await
    }

    /// Change fee rate
    pub async fn set_fee_rate(&self, caller: AccountId, rate: f64) -> Result<f64> {
        self.request(|response| LedgerMessage::SetFeeRate {
            caller,
            rate,
            response,
        })
        .await
    }

    /// Add an application admin
    pub async fn add_admin(
        &self,
        caller: AccountId,
        role: PlatformRole,
        target: AccountId,
    ) -> Result<AdminOutcome> {
        self.request(|response| LedgerMessage::AddAdmin {
            caller,
            role,
            target,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Actor dropped shutdown".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    store: Arc<dyn LedgerStore>,
    rolls: Box<dyn RollSource>,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(store, rx, rolls);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
