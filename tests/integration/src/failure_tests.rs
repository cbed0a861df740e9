//! Failure handling across whole passes
//!
//! Covers submission errors, ledger lookup errors, store outages and lost
//! submission records. None of these may stop the pipeline or leak state
//! across a failed store write.

use crate::test_utils::{entries_with, epoch, staking_mission, wallet, Fixture};
use chrono::Duration;
use stakeline_core::{EngineConfig, MissionStatus, TxLabel};

#[tokio::test]
async fn test_submission_error_reverts_without_touching_siblings() {
    let mut fx = Fixture::new(
        vec![
            staking_mission("a", MissionStatus::Staking),
            staking_mission("b", MissionStatus::Staking),
            staking_mission("c", MissionStatus::Staking),
        ],
        epoch() + Duration::hours(30),
    )
    .await;
    fx.ledger.script_submission_error(&wallet("b"), "connection reset");
    fx.ledger.script_signature(&wallet("a"), "complete-a");
    fx.ledger.confirm("complete-a");

    let report = fx.pass().await;
    let staked = report.phase("staked").unwrap();
    assert_eq!(staked.selected, 3);
    assert_eq!(staked.advanced, 2);
    assert_eq!(staked.rolled_back, 1);

    assert_eq!(fx.status("a").await, MissionStatus::Completed);
    assert_eq!(fx.status("b").await, MissionStatus::Staking);
    assert_eq!(fx.status("c").await, MissionStatus::PendingComplete);

    // b goes around again on the next pass
    fx.pass().await;
    assert_eq!(fx.status("b").await, MissionStatus::PendingComplete);
    assert_eq!(fx.ledger.transfers_for(&wallet("b")).len(), 2);
}

#[tokio::test]
async fn test_store_failure_keeps_tracker_and_row() {
    let mut mission = staking_mission("p1", MissionStatus::Pending);
    mission.transactions.clear();
    let mut fx = Fixture::new(vec![mission], epoch()).await;

    fx.pass().await;
    fx.pass().await;
    assert_eq!(fx.misses("pending", "p1"), 2);

    // the give-up write is the first write of the pass
    fx.store.fail_next_writes(1);
    let report = fx.pass().await;
    assert_eq!(report.failed_phases(), vec!["pending"]);
    assert_eq!(fx.misses("pending", "p1"), 2);
    assert_eq!(fx.status("p1").await, MissionStatus::Pending);

    fx.pass().await;
    assert_eq!(fx.status("p1").await, MissionStatus::Canceled);
    assert_eq!(fx.misses("pending", "p1"), 0);
}

#[tokio::test]
async fn test_full_outage_is_retried_next_pass() {
    let mut fx = Fixture::new(
        vec![staking_mission("c1", MissionStatus::CancelPending)],
        epoch() + Duration::hours(12),
    )
    .await;

    fx.store.fail_next(u32::MAX);
    let report = fx.pass().await;
    assert_eq!(report.failed_phases().len(), 6);
    assert!(fx.ledger.transfers().is_empty());

    fx.store.fail_next(0);
    let report = fx.pass().await;
    assert!(report.failed_phases().is_empty());
    assert_eq!(fx.status("c1").await, MissionStatus::CancelVerify);
}

#[tokio::test]
async fn test_lost_submission_record_rolls_back() {
    // submitted, but the store never saw the log entry
    let mut fx = Fixture::new(
        vec![staking_mission("s1", MissionStatus::PendingComplete)],
        epoch() + Duration::hours(30),
    )
    .await;

    for _ in 0..3 {
        fx.pass().await;
    }
    assert_eq!(fx.status("s1").await, MissionStatus::Staking);
    assert!(fx.ledger.transfers().is_empty());

    fx.pass().await;
    let mission = fx.mission("s1").await;
    assert_eq!(mission.status, MissionStatus::PendingComplete);
    assert_eq!(entries_with(&mission, TxLabel::StakingComplete).len(), 1);
    assert_eq!(fx.ledger.transfers_for(&wallet("s1")).len(), 1);
}

#[tokio::test]
async fn test_lookup_errors_exhaust_retries() {
    let mut mission = staking_mission("c1", MissionStatus::CancelVerify);
    mission
        .transactions
        .push(stakeline_core::TransactionEntry::new("cancel-c1", TxLabel::StakingCanceled));
    mission.reward = 3.0;
    let mut fx = Fixture::new(vec![mission], epoch() + Duration::hours(9)).await;
    fx.ledger.script_lookup_error("cancel-c1", "rpc timeout");

    for expected in 1..=2 {
        let report = fx.pass().await;
        assert!(report.failed_phases().is_empty());
        assert_eq!(fx.misses("cancel_verify", "c1"), expected);
    }

    fx.pass().await;
    let mission = fx.mission("c1").await;
    assert_eq!(mission.status, MissionStatus::CancelPending);
    assert_eq!(mission.reward, 8.0);
}

#[tokio::test]
async fn test_retry_bound_is_configurable() {
    let config = EngineConfig {
        retry_bound: 5,
        ..EngineConfig::default()
    };
    let mut mission = staking_mission("p1", MissionStatus::Pending);
    mission.transactions.clear();
    let mut fx = Fixture::with_config(vec![mission], epoch(), config).await;

    for _ in 0..4 {
        fx.pass().await;
    }
    assert_eq!(fx.status("p1").await, MissionStatus::Pending);
    assert_eq!(fx.misses("pending", "p1"), 4);

    fx.pass().await;
    assert_eq!(fx.status("p1").await, MissionStatus::Canceled);
}
