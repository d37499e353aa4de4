//! Wager engine
//!
//! Two-party games share one shape:
//!
//! 1. Reject self-play, a zero stake, or either side short of the stake.
//!    Nothing is rolled and nothing changes.
//! 2. Roll one die in `[1, 100]` per participant.
//! 3. Either tie (dice duel only, nothing changes) or settle: the winner
//!    gains `prize - stake`, the loser pays `stake`, the fee is burned.
//!
//! The weighted draw is a single-party, admin-only roll with no balance
//! effect.

use crate::{
    accounts::{get_balance, require_admin, set_balance},
    error::{Error, Result},
    fee::{self, FeeQuote},
    types::{AccountId, Snapshot},
};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Faces of the duel die
pub const DIE_FACES: u32 = 100;

/// Lowest weighted-draw multiplier
pub const DRAW_MIN: u32 = 50;

/// Highest weighted-draw multiplier
pub const DRAW_MAX: u32 = 300;

/// Source of randomness for the engine
///
/// Every `rand` generator is one; [`ScriptedRolls`] replays fixed values.
pub trait RollSource: Send {
    /// Uniform integer in `[low, high]`
    fn roll(&mut self, low: u32, high: u32) -> u32;

    /// Uniform float in `[0, 1)`
    fn unit(&mut self) -> f64;
}

impl<R: RngCore + Send> RollSource for R {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        self.gen_range(low..=high)
    }

    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Predetermined rolls, for replays and tests
///
/// Values are clamped into the requested range. Once a queue runs dry it
/// keeps returning the lowest value (`low`, or `0.0`).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    rolls: VecDeque<u32>,
    units: VecDeque<f64>,
}

impl ScriptedRolls {
    /// Script integer rolls
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            units: VecDeque::new(),
        }
    }

    /// Script unit draws
    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    /// Integer rolls not yet consumed
    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self, low: u32, high: u32) -> u32 {
        self.rolls.pop_front().unwrap_or(low).clamp(low, high)
    }

    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0).clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// Declared parity in odd/even
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// Odd sum
    Odd,
    /// Even sum
    Even,
}

impl Parity {
    /// Parity of `n`
    pub fn of(n: u32) -> Self {
        if n % 2 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }
}

impl FromStr for Parity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "odd" | "홀" => Ok(Parity::Odd),
            "even" | "짝" => Ok(Parity::Even),
            other => Err(Error::InvalidChoice(other.to_string())),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::Odd => write!(f, "odd"),
            Parity::Even => write!(f, "even"),
        }
    }
}

/// Which game produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Game {
    /// Higher roll wins
    DiceDuel,
    /// Initiator calls the parity of the roll sum
    OddEven {
        /// Initiator's call
        call: Parity,
    },
}

/// Balance changes of a settled wager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Correlation id for logs
    pub wager_id: Uuid,
    /// Game played
    pub game: Game,
    /// Initiator's roll
    pub initiator_roll: u32,
    /// Opponent's roll
    pub opponent_roll: u32,
    /// Winner
    pub winner: AccountId,
    /// Loser
    pub loser: AccountId,
    /// Stake, fee and prize
    pub quote: FeeQuote,
    /// Winner's balance after settlement
    pub winner_balance: u64,
    /// Loser's balance after settlement
    pub loser_balance: u64,
}

/// Terminal state of a two-party wager that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WagerOutcome {
    /// Equal rolls; stakes untouched
    Tied {
        /// Initiator's roll
        initiator_roll: u32,
        /// Opponent's roll
        opponent_roll: u32,
    },
    /// One winner, one loser
    Settled(Settlement),
}

impl WagerOutcome {
    /// Does the snapshot need saving
    pub fn is_settled(&self) -> bool {
        matches!(self, WagerOutcome::Settled(_))
    }
}

/// Play a dice duel between `initiator` and `opponent`
pub fn dice_duel(
    snapshot: &mut Snapshot,
    initiator: &AccountId,
    opponent: &AccountId,
    stake: u64,
    rolls: &mut dyn RollSource,
) -> Result<WagerOutcome> {
    validate(snapshot, initiator, opponent, stake)?;

    let initiator_roll = rolls.roll(1, DIE_FACES);
    let opponent_roll = rolls.roll(1, DIE_FACES);

    let (winner, loser) = match initiator_roll.cmp(&opponent_roll) {
        std::cmp::Ordering::Greater => (initiator, opponent),
        std::cmp::Ordering::Less => (opponent, initiator),
        std::cmp::Ordering::Equal => {
            return Ok(WagerOutcome::Tied {
                initiator_roll,
                opponent_roll,
            })
        }
    };

    settle(
        snapshot,
        Game::DiceDuel,
        (initiator_roll, opponent_roll),
        winner,
        loser,
        stake,
    )
    .map(WagerOutcome::Settled)
}

/// Play odd/even; `initiator` wins if the roll sum has parity `call`
pub fn odd_even(
    snapshot: &mut Snapshot,
    initiator: &AccountId,
    opponent: &AccountId,
    stake: u64,
    call: Parity,
    rolls: &mut dyn RollSource,
) -> Result<WagerOutcome> {
    validate(snapshot, initiator, opponent, stake)?;

    let initiator_roll = rolls.roll(1, DIE_FACES);
    let opponent_roll = rolls.roll(1, DIE_FACES);

    let (winner, loser) = if Parity::of(initiator_roll + opponent_roll) == call {
        (initiator, opponent)
    } else {
        (opponent, initiator)
    };

    settle(
        snapshot,
        Game::OddEven { call },
        (initiator_roll, opponent_roll),
        winner,
        loser,
        stake,
    )
    .map(WagerOutcome::Settled)
}

/// Pre-roll checks shared by the two-party games
fn validate(
    snapshot: &mut Snapshot,
    initiator: &AccountId,
    opponent: &AccountId,
    stake: u64,
) -> Result<()> {
    if initiator == opponent {
        return Err(Error::SelfWager);
    }
    if stake == 0 {
        return Err(Error::NonPositiveAmount);
    }

    for account in [initiator, opponent] {
        let (balance, _) = get_balance(snapshot, account);
        if balance < stake {
            return Err(Error::InsufficientFunds {
                account: account.clone(),
                balance,
                required: stake,
            });
        }
    }
    Ok(())
}

fn settle(
    snapshot: &mut Snapshot,
    game: Game,
    (initiator_roll, opponent_roll): (u32, u32),
    winner: &AccountId,
    loser: &AccountId,
    stake: u64,
) -> Result<Settlement> {
    let quote = fee::compute(stake, snapshot.config.fee_rate);

    let (winner_before, _) = get_balance(snapshot, winner);
    let (loser_before, _) = get_balance(snapshot, loser);

    let winner_balance = winner_before
        .checked_add(quote.net_gain())
        .ok_or_else(|| Error::InvalidArgument(format!("balance of {} would overflow", winner)))?;
    let loser_balance = loser_before.checked_sub(stake).ok_or_else(|| Error::InsufficientFunds {
        account: loser.clone(),
        balance: loser_before,
        required: stake,
    })?;

    set_balance(snapshot, winner, winner_balance);
    set_balance(snapshot, loser, loser_balance);

    let settlement = Settlement {
        wager_id: Uuid::now_v7(),
        game,
        initiator_roll,
        opponent_roll,
        winner: winner.clone(),
        loser: loser.clone(),
        quote,
        winner_balance,
        loser_balance,
    };

    tracing::info!(
        wager_id = %settlement.wager_id,
        winner = %winner,
        loser = %loser,
        stake,
        fee = quote.fee,
        "Wager settled"
    );

    Ok(settlement)
}

/// Weighted-draw rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Below 100
    Common,
    /// 100 to 149
    Advanced,
    /// 150 to 199
    Rare,
    /// 200 to 249
    Heroic,
    /// 250 and above
    Legendary,
}

impl Tier {
    /// Tier of a drawn multiplier
    pub fn for_multiplier(multiplier: u32) -> Self {
        match multiplier {
            m if m >= 250 => Tier::Legendary,
            m if m >= 200 => Tier::Heroic,
            m if m >= 150 => Tier::Rare,
            m if m >= 100 => Tier::Advanced,
            _ => Tier::Common,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Common => "common",
            Tier::Advanced => "advanced",
            Tier::Rare => "rare",
            Tier::Heroic => "heroic",
            Tier::Legendary => "legendary",
        };
        write!(f, "{}", label)
    }
}

/// Result of a weighted draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    /// Multiplier in `[DRAW_MIN, DRAW_MAX]`
    pub multiplier: u32,
    /// Its tier
    pub tier: Tier,
}

/// Cumulative weights for inverse-transform sampling
///
/// Multiplier `m` has weight `(m - 49)^-1.5`.
#[derive(Debug, Clone)]
pub struct DrawTable {
    cumulative: Vec<f64>,
}

impl DrawTable {
    /// Build the table for `[DRAW_MIN, DRAW_MAX]`
    pub fn new() -> Self {
        let mut total = 0.0;
        let cumulative = (DRAW_MIN..=DRAW_MAX)
            .map(|m| {
                total += f64::from(m - (DRAW_MIN - 1)).powf(-1.5);
                total
            })
            .collect();
        Self { cumulative }
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Probability of drawing exactly `multiplier`
    pub fn probability(&self, multiplier: u32) -> f64 {
        if !(DRAW_MIN..=DRAW_MAX).contains(&multiplier) {
            return 0.0;
        }
        let i = (multiplier - DRAW_MIN) as usize;
        let below = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
        (self.cumulative[i] - below) / self.total()
    }

    /// Multiplier for a uniform `u` in `[0, 1)`
    pub fn sample(&self, u: f64) -> u32 {
        let target = u * self.total();
        let index = self
            .cumulative
            .partition_point(|&c| c <= target)
            .min(self.cumulative.len() - 1);
        DRAW_MIN + index as u32
    }
}

impl Default for DrawTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted draw for `caller`, who must be an application admin
pub fn draw(
    snapshot: &Snapshot,
    caller: &AccountId,
    rolls: &mut dyn RollSource,
) -> Result<DrawResult> {
    require_admin(snapshot, caller)?;

    let multiplier = DrawTable::new().sample(rolls.unit());
    let result = DrawResult {
        multiplier,
        tier: Tier::for_multiplier(multiplier),
    };

    tracing::info!(caller = %caller, multiplier, tier = %result.tier, "Weighted draw");
    Ok(result)
}
