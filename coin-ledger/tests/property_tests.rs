//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Supply conservation: transfers never create or destroy coins
//! - Fee burn: a settled wager lowers supply by exactly its fee
//! - Atomic rejection: refused operations leave balances untouched
//! - Leaderboard ordering

use coin_ledger::{
    accounts,
    fee,
    ranking,
    storage::MemoryStore,
    types::{AccountId, Snapshot},
    wager::{self, Parity, ScriptedRolls},
    Config, Error, Ledger, WagerOutcome,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Strategy for fee rates in the accepted range
fn fee_rate_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(0.05),
        Just(1.0),
        (0u32..=1000).prop_map(|permille| permille as f64 / 1000.0),
    ]
}

/// Strategy for a small population of accounts with balances
fn population_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..5_000, 2..8)
}

fn id(i: usize) -> AccountId {
    AccountId::new(format!("user-{}", i))
}

fn snapshot_with(balances: &[u64], fee_rate: f64) -> Snapshot {
    let mut snapshot = Snapshot::new();
    snapshot.config.fee_rate = fee_rate;
    for (i, balance) in balances.iter().enumerate() {
        accounts::set_balance(&mut snapshot, &id(i), *balance);
    }
    snapshot
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: any sequence of transfers conserves total supply
    #[test]
    fn prop_transfers_conserve_supply(
        balances_in in population_strategy(),
        moves in prop::collection::vec((0usize..8, 0usize..8, 0u64..2_000), 1..30),
    ) {
        let count = balances_in.len();
        let mut snapshot = snapshot_with(&balances_in, 0.05);
        let supply = snapshot.total_supply();

        for (from, to, amount) in moves {
            let before = snapshot.clone();
            let (from, to) = (id(from % count), id(to % count));
            let result = accounts::transfer(&mut snapshot, &from, &to, amount);
            if result.is_err() {
                prop_assert_eq!(&snapshot, &before);
            }
            prop_assert_eq!(snapshot.total_supply(), supply);
        }
    }

    /// Property: fee is bounded by the stake and monotonic in the rate
    #[test]
    fn prop_fee_bounds(
        stake in 1u64..10_000_000,
        a in fee_rate_strategy(),
        b in fee_rate_strategy(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let q_low = fee::compute(stake, low);
        let q_high = fee::compute(stake, high);

        prop_assert!(q_low.fee <= q_high.fee);
        prop_assert!(q_high.fee <= stake);
        prop_assert!(q_low.prize >= stake);
        prop_assert_eq!(q_low.prize + q_low.fee, 2 * stake);
        prop_assert_eq!(fee::compute(stake, 0.0).fee, 0);
    }

    /// Property: a settled wager burns exactly its fee; a tie burns nothing
    #[test]
    fn prop_wager_burns_fee(
        stake in 1u64..1_000,
        rate in fee_rate_strategy(),
        seed in any::<u64>(),
        odd_even in any::<bool>(),
    ) {
        let mut snapshot = snapshot_with(&[1_000, 1_000], rate);
        let supply = snapshot.total_supply();
        let mut rng = StdRng::seed_from_u64(seed);

        let outcome = if odd_even {
            wager::odd_even(&mut snapshot, &id(0), &id(1), stake, Parity::Odd, &mut rng)
        } else {
            wager::dice_duel(&mut snapshot, &id(0), &id(1), stake, &mut rng)
        }
        .unwrap();

        match outcome {
            WagerOutcome::Settled(s) => {
                prop_assert_eq!(s.quote.fee, fee::compute(stake, rate).fee);
                prop_assert_eq!(snapshot.total_supply(), supply - s.quote.fee as u128);
                prop_assert_eq!(s.loser_balance, 1_000 - stake);
            }
            WagerOutcome::Tied { initiator_roll, opponent_roll } => {
                prop_assert_eq!(initiator_roll, opponent_roll);
                prop_assert_eq!(snapshot.total_supply(), supply);
            }
        }
    }

    /// Property: a stake above either balance is refused with nothing changed
    #[test]
    fn prop_underfunded_wager_rejected(
        a in 0u64..500,
        b in 0u64..500,
        extra in 1u64..500,
    ) {
        let mut snapshot = snapshot_with(&[a, b], 0.05);
        let before = snapshot.clone();
        let stake = a.min(b) + extra;
        let mut rolls = ScriptedRolls::new([90, 10]);

        let err = wager::dice_duel(&mut snapshot, &id(0), &id(1), stake, &mut rolls).unwrap_err();
        let is_insufficient = matches!(err, Error::InsufficientFunds { .. });
        prop_assert!(is_insufficient);
        prop_assert_eq!(&snapshot, &before);
        prop_assert_eq!(rolls.remaining(), 2);
    }

    /// Property: wagering against yourself is always refused
    #[test]
    fn prop_self_wager_rejected(stake in 0u64..5_000, who in 0usize..2) {
        let mut snapshot = snapshot_with(&[1_000, 1_000], 0.05);
        let before = snapshot.clone();
        let mut rolls = ScriptedRolls::default();

        let player = id(who);
        let err = wager::odd_even(&mut snapshot, &player, &player, stake, Parity::Even, &mut rolls)
            .unwrap_err();
        let is_self = matches!(err, Error::SelfWager);
        prop_assert!(is_self);
        prop_assert_eq!(&snapshot, &before);
    }

    /// Property: leaderboard is sorted, bounded and ranked from 1
    #[test]
    fn prop_top_sorted(balances_in in population_strategy(), n in 0usize..12) {
        let snapshot = snapshot_with(&balances_in, 0.05);
        let board = ranking::top(&snapshot, n);

        prop_assert_eq!(board.len(), n.min(balances_in.len()));
        for pair in board.windows(2) {
            prop_assert!(pair[0].balance >= pair[1].balance);
        }
        for (i, entry) in board.iter().enumerate() {
            prop_assert_eq!(entry.rank, i + 1);
        }
    }

    /// Property: draws land in range and never move coins
    #[test]
    fn prop_draw_in_range(seed in any::<u64>()) {
        let mut snapshot = snapshot_with(&[1_000], 0.05);
        accounts::add_admin(&mut snapshot, &id(0));
        let before = snapshot.clone();
        let mut rng = StdRng::seed_from_u64(seed);

        let result = wager::draw(&snapshot, &id(0), &mut rng).unwrap();
        prop_assert!((wager::DRAW_MIN..=wager::DRAW_MAX).contains(&result.multiplier));
        prop_assert_eq!(&snapshot, &before);
    }

    /// Property: wagers through the actor lower supply by the fees burned
    #[test]
    fn prop_ledger_accounting(
        stakes in prop::collection::vec(1u64..200, 1..10),
        seed in any::<u64>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = Ledger::with_store(
                Arc::new(MemoryStore::new()),
                Box::new(StdRng::seed_from_u64(seed)),
                Config::default(),
            )
            .unwrap();

            let mut burned = 0u128;
            for stake in &stakes {
                match ledger.dice_duel(id(0), id(1), *stake).await {
                    Ok(WagerOutcome::Settled(s)) => burned += s.quote.fee as u128,
                    Ok(WagerOutcome::Tied { .. }) => {}
                    Err(e) => {
                        prop_assert!(e.is_validation());
                    }
                }
            }

            let snapshot = ledger.snapshot().unwrap();
            prop_assert_eq!(snapshot.total_supply() + burned, 2_000);
            prop_assert_eq!(ledger.metrics().fees_burned.get() as u128, burned);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
