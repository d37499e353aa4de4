//! End-to-end tests through the ledger facade and command dispatcher

use coin_ledger::{
    config::StorageBackend,
    dispatch,
    storage::{JsonFileStore, LedgerStore, MemoryStore},
    wager::ScriptedRolls,
    AccountId, Command, Config, Error, Ledger, PlatformRole, Reply, WagerOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;

fn disk_config(dir: &Path, backend: StorageBackend) -> Config {
    let mut config = Config::default();
    config.data_dir = dir.to_path_buf();
    config.storage.backend = backend;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wagers_conserve_coins() {
    let ledger = Arc::new(
        Ledger::with_store(
            Arc::new(MemoryStore::new()),
            Box::new(StdRng::seed_from_u64(7)),
            Config::default(),
        )
        .unwrap(),
    );
    let players: Vec<AccountId> = (0..6).map(|i| AccountId::new(format!("p{}", i))).collect();
    for player in &players {
        ledger.balance(player.clone()).await.unwrap();
    }
    let supply = ledger.snapshot().unwrap().total_supply();

    let mut tasks = Vec::new();
    for round in 0..60usize {
        let ledger = ledger.clone();
        let a = players[round % players.len()].clone();
        let b = players[(round + 1) % players.len()].clone();
        tasks.push(tokio::spawn(async move { ledger.dice_duel(a, b, 40).await }));
    }

    let mut burned = 0u128;
    for task in tasks {
        match task.await.unwrap() {
            Ok(WagerOutcome::Settled(s)) => burned += s.quote.fee as u128,
            Ok(WagerOutcome::Tied { .. }) => {}
            Err(e) => assert!(e.is_validation(), "unexpected error: {}", e),
        }
    }

    let snapshot = ledger.snapshot().unwrap();
    assert_eq!(snapshot.total_supply() + burned, supply);
    assert_eq!(ledger.metrics().fees_burned.get() as u128, burned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_do_not_lose_updates() {
    let ledger = Arc::new(
        Ledger::with_store(
            Arc::new(MemoryStore::new()),
            Box::new(ScriptedRolls::default()),
            Config::default(),
        )
        .unwrap(),
    );
    let sink = AccountId::new("sink");

    let mut tasks = Vec::new();
    for i in 0..50 {
        let ledger = ledger.clone();
        let sink = sink.clone();
        tasks.push(tokio::spawn(async move {
            ledger.give(AccountId::new(format!("s{}", i)), sink, 10).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(ledger.balance(sink).await.unwrap(), 1000 + 50 * 10);
    assert_eq!(ledger.snapshot().unwrap().total_supply(), 51 * 1000);
}

#[tokio::test]
async fn test_rocksdb_persists_across_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");

    let ledger = Ledger::open(disk_config(temp_dir.path(), StorageBackend::RocksDb))
        .await
        .unwrap();
    ledger.give(alice.clone(), bob.clone(), 300).await.unwrap();
    ledger
        .add_admin(AccountId::new("owner"), PlatformRole::Administrator, alice.clone())
        .await
        .unwrap();
    ledger.set_fee_rate(alice.clone(), 0.1).await.unwrap();
    ledger.shutdown().await.unwrap();

    let ledger = Ledger::open(disk_config(temp_dir.path(), StorageBackend::RocksDb))
        .await
        .unwrap();
    assert_eq!(ledger.balance(alice.clone()).await.unwrap(), 700);
    assert_eq!(ledger.balance(bob).await.unwrap(), 1300);
    assert!(ledger.is_admin(&alice).unwrap());
    assert_eq!(ledger.fee_rate().unwrap(), 0.1);
    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_json_document_layout() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = disk_config(temp_dir.path(), StorageBackend::Json);
    let path = temp_dir.path().join(&config.storage.file_name);

    let ledger = Ledger::open(config).await.unwrap();
    ledger
        .add_admin(AccountId::new("owner"), PlatformRole::Administrator, AccountId::new("42"))
        .await
        .unwrap();
    ledger
        .grant(AccountId::new("42"), AccountId::new("7"), 250)
        .await
        .unwrap();
    ledger.shutdown().await.unwrap();

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(document["users"]["7"]["balance"], 1250);
    assert_eq!(document["config"]["fee_rate"], 0.05);
    assert_eq!(document["config"]["admin_ids"][0], "42");

    let reopened = JsonFileStore::open(&path).unwrap().load().unwrap();
    assert_eq!(
        reopened.account(&AccountId::new("7")).map(|a| a.balance),
        Some(1250)
    );
}

#[tokio::test]
async fn test_json_accepts_numeric_admin_ids() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("economy_data.json");
    std::fs::write(
        &path,
        r#"{
            "users": {"123": {"balance": 50, "last_daily": null}},
            "config": {"fee_rate": 0.05, "admin_ids": [123]}
        }"#,
    )
    .unwrap();

    let ledger = Ledger::open(disk_config(temp_dir.path(), StorageBackend::Json))
        .await
        .unwrap();
    assert!(ledger.is_admin(&AccountId::new("123")).unwrap());
    assert_eq!(ledger.balance(AccountId::new("123")).await.unwrap(), 50);

    let err = ledger
        .grant(AccountId::new("123"), AccountId::new("123"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NonPositiveAmount));
    ledger.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_command_session() {
    let ledger = Ledger::with_store(
        Arc::new(MemoryStore::new()),
        Box::new(ScriptedRolls::new([60, 30, 3, 4]).with_units([0.0])),
        Config::default(),
    )
    .unwrap();
    let owner = AccountId::new("owner");
    let alice = AccountId::new("alice");

    let run = |caller: &AccountId, role: PlatformRole, line: &str| {
        let command = Command::parse_line(line);
        let caller = caller.clone();
        let ledger = &ledger;
        async move { dispatch(ledger, &caller, role, command?).await }
    };

    let reply = run(&alice, PlatformRole::Member, "dice-duel bob 100").await.unwrap();
    assert_eq!(
        reply.to_string(),
        "Rolls 60 - 30: alice wins 195 coins (fee 5), bob loses 100"
    );

    // 3 + 4 is odd, so alice's call of even loses
    let reply = run(&alice, PlatformRole::Member, "odd-even bob 100 even").await.unwrap();
    let Reply::Wager(WagerOutcome::Settled(s)) = reply else {
        panic!("expected settlement");
    };
    assert_eq!(s.winner, AccountId::new("bob"));

    let err = run(&alice, PlatformRole::Member, "draw").await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    run(&owner, PlatformRole::Administrator, "add-admin <@alice>").await.unwrap();
    let reply = run(&alice, PlatformRole::Member, "draw").await.unwrap();
    assert_eq!(reply.to_string(), "Drew 50 (common)");

    let reply = run(&alice, PlatformRole::Member, "leaderboard").await.unwrap();
    let Reply::Leaderboard(rows) = reply else {
        panic!("expected leaderboard");
    };
    // Both sit at 995; alice opened first
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].account, alice);
    assert_eq!(rows[0].balance, 995);
    assert_eq!(rows[1].balance, 995);

    let err = run(&alice, PlatformRole::Member, "give bob 0").await.unwrap_err();
    assert!(matches!(err, Error::NonPositiveAmount));
}
