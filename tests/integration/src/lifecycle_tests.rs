//! End-to-end lifecycle scenarios
//!
//! Every test runs complete passes, so a mission can move through more than
//! one phase in the same pass (for example `canceled` submits and
//! `cancel_verify` polls immediately afterwards).

use crate::test_utils::{entries_with, epoch, staking_mission, wallet, Fixture};
use chrono::Duration;
use stakeline_core::{MissionStatus, TxLabel};
use stakeline_ledger::TransferKind;

#[tokio::test]
async fn test_cancellation_confirms_after_two_misses() {
    let mut fx = Fixture::new(
        vec![staking_mission("c1", MissionStatus::CancelPending)],
        epoch() + Duration::hours(12),
    )
    .await;
    fx.ledger.script_signature(&wallet("c1"), "cancel-c1");

    // submit, then first poll misses
    fx.pass().await;
    assert_eq!(fx.status("c1").await, MissionStatus::CancelVerify);
    assert_eq!(fx.misses("cancel_verify", "c1"), 1);

    fx.pass().await;
    assert_eq!(fx.misses("cancel_verify", "c1"), 2);

    fx.ledger.confirm("cancel-c1");
    let report = fx.pass().await;
    assert_eq!(report.phase("cancel_verify").unwrap().advanced, 1);

    let mission = fx.mission("c1").await;
    assert_eq!(mission.status, MissionStatus::Canceled);
    assert_eq!(mission.reward, 4.0);
    assert_eq!(entries_with(&mission, TxLabel::StakingCanceled).len(), 1);
    assert!(fx.engine.tracker("cancel_verify").unwrap().is_empty());

    let transfers = fx.ledger.transfers_for(&wallet("c1"));
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, 4.0);
}

#[tokio::test]
async fn test_cancellation_gives_up_and_resubmits() {
    let mut fx = Fixture::new(
        vec![staking_mission("c1", MissionStatus::CancelPending)],
        epoch() + Duration::hours(6),
    )
    .await;
    fx.ledger.script_signature(&wallet("c1"), "cancel-lost");

    for _ in 0..3 {
        fx.pass().await;
    }

    let mission = fx.mission("c1").await;
    assert_eq!(mission.status, MissionStatus::CancelPending);
    assert_eq!(mission.reward, 8.0);
    assert!(entries_with(&mission, TxLabel::StakingCanceled).is_empty());
    assert_eq!(entries_with(&mission, TxLabel::StakingStarted).len(), 1);
    assert!(fx.engine.tracker("cancel_verify").unwrap().is_empty());

    // next pass submits a fresh cancellation
    fx.ledger.script_signature(&wallet("c1"), "cancel-retry");
    fx.ledger.confirm("cancel-retry");
    fx.pass().await;

    let mission = fx.mission("c1").await;
    assert_eq!(mission.status, MissionStatus::Canceled);
    let cancels = entries_with(&mission, TxLabel::StakingCanceled);
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].tx, "cancel-retry");
    assert_eq!(fx.ledger.transfers_for(&wallet("c1")).len(), 2);
}

#[tokio::test]
async fn test_staking_completes_in_one_pass_when_confirmed() {
    let mut fx = Fixture::new(
        vec![staking_mission("s1", MissionStatus::Staking)],
        epoch() + Duration::hours(25),
    )
    .await;
    fx.ledger.script_signature(&wallet("s1"), "complete-s1");
    fx.ledger.confirm("complete-s1");

    let report = fx.pass().await;
    assert_eq!(report.phase("staked").unwrap().advanced, 1);
    assert_eq!(report.phase("stake_pending").unwrap().advanced, 1);

    let mission = fx.mission("s1").await;
    assert_eq!(mission.status, MissionStatus::Completed);
    assert_eq!(entries_with(&mission, TxLabel::StakingComplete).len(), 1);

    let transfers = fx.ledger.transfers_for(&wallet("s1"));
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, 8.0);
    assert_eq!(
        transfers[0].kind,
        TransferKind::AssetReturn {
            mints: vec!["mint-s1-1".to_string(), "mint-s1-2".to_string()]
        }
    );
}

#[tokio::test]
async fn test_staking_waits_for_window_end() {
    let mut fx = Fixture::new(
        vec![staking_mission("s1", MissionStatus::Staking)],
        epoch() + Duration::hours(23),
    )
    .await;

    fx.pass().await;
    assert_eq!(fx.status("s1").await, MissionStatus::Staking);
    assert!(fx.ledger.transfers().is_empty());

    fx.clock.advance(Duration::hours(2));
    fx.pass().await;
    assert_eq!(fx.status("s1").await, MissionStatus::PendingComplete);
}

#[tokio::test]
async fn test_completion_gives_up_and_resubmits() {
    let mut fx = Fixture::new(
        vec![staking_mission("s1", MissionStatus::Staking)],
        epoch() + Duration::hours(30),
    )
    .await;
    fx.ledger.script_invalid(&wallet("s1"));

    // pass 1 submits (sentinel), passes 1-3 count misses, pass 3 rolls back
    for _ in 0..3 {
        fx.pass().await;
    }
    let mission = fx.mission("s1").await;
    assert_eq!(mission.status, MissionStatus::Staking);
    assert!(entries_with(&mission, TxLabel::StakingComplete).is_empty());

    fx.ledger.script_signature(&wallet("s1"), "complete-retry");
    fx.ledger.confirm("complete-retry");
    fx.pass().await;

    assert_eq!(fx.status("s1").await, MissionStatus::Completed);
    assert_eq!(fx.ledger.transfers_for(&wallet("s1")).len(), 2);
}

#[tokio::test]
async fn test_pending_start_confirmed_begins_restaking() {
    let mut fx = Fixture::new(
        vec![staking_mission("p1", MissionStatus::Pending)],
        epoch() + Duration::minutes(5),
    )
    .await;
    fx.ledger.confirm("start-p1");

    fx.pass().await;

    assert_eq!(fx.status("p1").await, MissionStatus::Restaking);
    assert!(fx.engine.tracker("pending").unwrap().is_empty());
    // window has not ended, so no restake payout yet
    assert!(fx.ledger.transfers().is_empty());
}

#[tokio::test]
async fn test_pending_without_start_is_canceled() {
    let mut mission = staking_mission("p1", MissionStatus::Pending);
    mission.transactions.clear();
    let mut fx = Fixture::new(vec![mission], epoch()).await;

    fx.pass().await;
    fx.pass().await;
    assert_eq!(fx.status("p1").await, MissionStatus::Pending);
    assert_eq!(fx.misses("pending", "p1"), 2);

    fx.pass().await;
    assert_eq!(fx.status("p1").await, MissionStatus::Canceled);
    assert!(fx.ledger.transfers().is_empty());
}

#[tokio::test]
async fn test_restaking_pays_each_cycle() {
    let mut fx = Fixture::new(
        vec![staking_mission("r1", MissionStatus::Restaking)],
        epoch() + Duration::hours(26),
    )
    .await;
    let first_payout = epoch() + Duration::hours(26);

    fx.pass().await;
    let mission = fx.mission("r1").await;
    assert_eq!(mission.started_at, first_payout);
    assert_eq!(mission.extract_at, first_payout + Duration::hours(24));
    assert_eq!(entries_with(&mission, TxLabel::RestakeReward).len(), 1);

    // same cycle: nothing to do
    fx.clock.advance(Duration::hours(1));
    fx.pass().await;
    assert_eq!(fx.ledger.transfers_for(&wallet("r1")).len(), 1);

    fx.clock.advance(Duration::hours(24));
    fx.pass().await;
    let mission = fx.mission("r1").await;
    assert_eq!(mission.status, MissionStatus::Restaking);
    assert_eq!(entries_with(&mission, TxLabel::RestakeReward).len(), 2);

    let transfers = fx.ledger.transfers_for(&wallet("r1"));
    assert_eq!(transfers.len(), 2);
    assert!(transfers
        .iter()
        .all(|t| t.kind == TransferKind::Reward && t.amount == 8.0));
}

#[tokio::test]
async fn test_finished_missions_stay_quiet() {
    let mut fx = Fixture::new(
        vec![
            staking_mission("s1", MissionStatus::Staking),
            staking_mission("done", MissionStatus::Completed),
            staking_mission("gone", MissionStatus::Canceled),
        ],
        epoch() + Duration::hours(48),
    )
    .await;
    fx.ledger.script_signature(&wallet("s1"), "complete-s1");
    fx.ledger.confirm("complete-s1");

    fx.pass().await;
    assert_eq!(fx.status("s1").await, MissionStatus::Completed);

    let writes = fx.store.mutation_count();
    let transfers = fx.ledger.transfers().len();
    for _ in 0..3 {
        let report = fx.pass().await;
        assert_eq!(report.advanced(), 0);
    }

    assert_eq!(fx.store.mutation_count(), writes);
    assert_eq!(fx.ledger.transfers().len(), transfers);
    for phase in ["pending", "stake_pending", "cancel_verify"] {
        assert!(fx.engine.tracker(phase).unwrap().is_empty());
    }
}
