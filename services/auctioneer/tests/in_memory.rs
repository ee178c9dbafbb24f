//! End-to-end runs against the in-memory store and the local auction runner.

use std::sync::Arc;
use std::time::Duration;

use auctioneer::{Auctioneer, AuctioneerConfig};
use auctioneer_auction::LocalAuctionRunner;
use auctioneer_bbs::{InMemoryBbs, RequestState};
use auctioneer_models::{PlacementOutcome, PlacementRequest, Rep};
use auctioneer_testing::eventually;
use tokio::sync::{oneshot, watch};

fn rep(id: &str, stack: &str) -> Rep {
    Rep::new(id.parse().unwrap(), stack.parse().unwrap())
}

fn request(guid: &str, stack: &str) -> PlacementRequest {
    PlacementRequest::new(guid.parse().unwrap(), stack.parse().unwrap())
}

fn is_resolved(bbs: &InMemoryBbs, guid: &str) -> bool {
    matches!(
        bbs.request_state(&guid.parse().unwrap()),
        Some(RequestState::Resolved { .. })
    )
}

#[tokio::test]
async fn test_standby_takes_over_after_leader_shuts_down() {
    let bbs = Arc::new(InMemoryBbs::new());
    bbs.register_rep(rep("first-rep", "lucid64"));
    bbs.register_rep(rep("second-rep", ".Net"));

    let leader = Auctioneer::new(
        bbs.clone(),
        Arc::new(LocalAuctionRunner::new()),
        AuctioneerConfig::default(),
    )
    .unwrap();
    let standby = Auctioneer::new(
        bbs.clone(),
        Arc::new(LocalAuctionRunner::new()),
        AuctioneerConfig::default(),
    )
    .unwrap();
    let (leader_id, standby_id) = (leader.id(), standby.id());
    let standby_status = standby.status();

    let (leader_stop, leader_stop_rx) = watch::channel(false);
    let (leader_ready, leader_ready_rx) = oneshot::channel();
    let leader_run = tokio::spawn(leader.run(leader_stop_rx, leader_ready));
    leader_ready_rx.await.unwrap();

    let (standby_stop, standby_stop_rx) = watch::channel(false);
    let (standby_ready, mut standby_ready_rx) = oneshot::channel();
    let standby_run = tokio::spawn(standby.run(standby_stop_rx, standby_ready));

    assert!(eventually(|| bbs.active_watchers() == 1).await);
    assert_eq!(bbs.lock_holder("auctioneer"), Some(leader_id));
    assert!(standby_ready_rx.try_recv().is_err());

    bbs.desire_placement(request("web", "lucid64")).unwrap();
    assert!(eventually(|| is_resolved(&bbs, "web")).await);
    assert_eq!(
        bbs.request_state(&"web".parse().unwrap()),
        Some(RequestState::Resolved {
            outcome: PlacementOutcome::Placed {
                winner: "first-rep".parse().unwrap()
            }
        })
    );

    leader_stop.send_replace(true);
    assert!(leader_run.await.unwrap().is_ok());

    assert!(eventually(|| standby_status.is_ready()).await);
    assert_eq!(bbs.lock_holder("auctioneer"), Some(standby_id));

    bbs.desire_placement(request("worker", "windows")).unwrap();
    assert!(eventually(|| is_resolved(&bbs, "worker")).await);
    assert_eq!(
        bbs.request_state(&"worker".parse().unwrap()),
        Some(RequestState::Resolved {
            outcome: PlacementOutcome::Failed
        })
    );

    standby_stop.send_replace(true);
    let result = tokio::time::timeout(Duration::from_secs(2), standby_run)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(bbs.lock_holder("auctioneer"), None);
}

#[tokio::test]
async fn test_pending_requests_are_picked_up_on_acquisition() {
    let bbs = Arc::new(InMemoryBbs::new());
    bbs.register_rep(rep("first-rep", "lucid64"));
    bbs.desire_placement(request("early", "lucid64")).unwrap();

    let auctioneer = Auctioneer::new(
        bbs.clone(),
        Arc::new(LocalAuctionRunner::new()),
        AuctioneerConfig::default(),
    )
    .unwrap();

    let (stop, stop_rx) = watch::channel(false);
    let (ready, _ready_rx) = oneshot::channel();
    let run = tokio::spawn(auctioneer.run(stop_rx, ready));

    assert!(eventually(|| is_resolved(&bbs, "early")).await);

    // Expiry cycles the lock back to the sole contender, which re-subscribes.
    bbs.expire_lock("auctioneer");
    bbs.desire_placement(request("late", "lucid64")).unwrap();
    assert!(eventually(|| is_resolved(&bbs, "late")).await);

    stop.send_replace(true);
    assert!(run.await.unwrap().is_ok());
}
