//! Relay actor behaviour tests
//!
//! Drive the relay through a manual upstream feed, without any sockets.
//! Timing-sensitive tests run on a paused clock.

mod common;

use book_relay::ClientSubscription;
use common::*;
use relay_core::SubscriptionTarget;
use std::time::Duration;
use tokio::time::{Instant, sleep};

fn drain(subscription: &mut ClientSubscription) -> Vec<String> {
    let mut messages = Vec::new();
    while let Ok(message) = subscription.messages.try_recv() {
        messages.push(message.to_string());
    }
    messages
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_burst_is_coalesced_into_one_broadcast() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let mut client = relay.connect(None).await.unwrap();

    for price in 1..=3 {
        assert!(feed.deliver(delta("kraken", "ETH-USD", price)));
        sleep(Duration::from_millis(30)).await;
    }

    sleep(INTERVAL).await;
    let messages = drain(&mut client);
    assert_eq!(messages.len(), 1);
    assert_eq!(bid_price(&messages[0]), 3.0);

    // Nothing new arrived, so nothing more is sent
    sleep(INTERVAL * 4).await;
    assert!(drain(&mut client).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_only_last_of_many_deltas_is_delivered() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let mut client = relay.connect(None).await.unwrap();

    for price in 1..=50 {
        feed.deliver(delta("kraken", "ETH-USD", price));
    }

    sleep(INTERVAL + Duration::from_millis(10)).await;
    let messages = drain(&mut client);
    assert_eq!(messages.len(), 1);
    assert_eq!(bid_price(&messages[0]), 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_no_broadcast_without_delta() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let mut client = relay.connect(None).await.unwrap();

    sleep(INTERVAL * 4).await;
    assert!(drain(&mut client).is_empty());
    assert_eq!(relay.status().await.unwrap().broadcasts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_broadcast_without_clients() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    relay.status().await.unwrap();

    feed.deliver(delta("kraken", "ETH-USD", 7));
    sleep(INTERVAL * 2).await;

    let status = relay.status().await.unwrap();
    assert!(status.has_delta);
    assert_eq!(status.broadcasts, 0);

    // The first subscriber gets the held delta straight away
    let mut client = relay.connect(None).await.unwrap();
    let message = client.messages.recv().await.unwrap();
    assert_eq!(bid_price(&message), 7.0);
}

#[tokio::test(start_paused = true)]
async fn test_broadcasts_are_spaced_by_interval() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let mut client = relay.connect(None).await.unwrap();

    let collector = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(message) = client.messages.recv().await {
            received.push((Instant::now(), bid_price(&message)));
        }
        received
    });

    for price in 1..=40 {
        feed.deliver(delta("kraken", "ETH-USD", price));
        sleep(Duration::from_millis(70)).await;
    }
    sleep(INTERVAL * 2).await;
    relay.shutdown();

    let received = collector.await.unwrap();
    assert!(received.len() >= 4, "only {} broadcasts", received.len());
    for window in received.windows(2) {
        assert!(window[1].0 - window[0].0 >= INTERVAL);
    }
    // The trailing flush carries the final delta
    assert_eq!(received.last().unwrap().1, 40.0);
}

// ============================================================================
// Overrides
// ============================================================================

#[tokio::test]
async fn test_override_switches_target_and_evicts_existing_clients() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let mut first = relay.connect(None).await.unwrap();
    assert_eq!(first.target, kraken_eth());

    let second = relay.connect(Some(coinbase_btc())).await.unwrap();
    assert_eq!(second.target, coinbase_btc());

    let status = relay.status().await.unwrap();
    assert_eq!(status.target, coinbase_btc());
    assert_eq!(status.state, "active");
    assert_eq!(status.clients, 1);

    // Old session shut down before the new one started
    let sessions = feed.sessions();
    assert_eq!(sessions.len(), 2);
    assert!(!sessions[0].is_open());
    assert_eq!(sessions[1].exchange, coinbase_btc().exchange);
    assert_eq!(sessions[1].pair, coinbase_btc().pair);
    assert_eq!(feed.open_sessions(), 1);

    // Evicted client's queue is closed
    assert!(first.messages.recv().await.is_none());
}

#[tokio::test]
async fn test_override_for_current_target_is_not_a_switch() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let _first = relay.connect(None).await.unwrap();
    let _second = relay
        .connect(Some(SubscriptionTarget::new("KRAKEN", "eth/usd")))
        .await
        .unwrap();

    let status = relay.status().await.unwrap();
    assert_eq!(status.clients, 2);
    assert_eq!(feed.opened(), 1);
}

#[tokio::test]
async fn test_unknown_exchange_leaves_relay_idle_but_serving() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    relay.status().await.unwrap();
    feed.deliver(delta("kraken", "ETH-USD", 1));
    assert!(relay.status().await.unwrap().has_delta);

    let unknown = SubscriptionTarget::new("Foo", "XX-YY");
    let client = relay.connect(Some(unknown.clone())).await.unwrap();
    assert_eq!(client.target, unknown);

    let status = relay.status().await.unwrap();
    assert_eq!(status.target, unknown);
    assert_eq!(status.state, "no_session");
    assert!(!status.session_active);
    assert!(!status.has_delta);
    assert_eq!(status.clients, 1);
    assert_eq!(feed.open_sessions(), 0);

    // Still accepts connections, including one that restores a valid target
    let recovered = relay.connect(Some(kraken_eth())).await.unwrap();
    assert_eq!(recovered.target, kraken_eth());
    let status = relay.status().await.unwrap();
    assert_eq!(status.state, "active");
    assert_eq!(feed.open_sessions(), 1);
}

#[tokio::test]
async fn test_rejected_pair_leaves_no_session() {
    let feed = ManualFeed::new();
    feed.reject_pair("XX-YY");
    let relay = spawn_relay(&feed, config());

    let target = SubscriptionTarget::new("kraken", "XX-YY");
    relay.connect(Some(target.clone())).await.unwrap();

    let status = relay.status().await.unwrap();
    assert_eq!(status.target, target);
    assert_eq!(status.state, "no_session");
    assert_eq!(feed.open_sessions(), 0);
}

// ============================================================================
// Delta filtering
// ============================================================================

#[tokio::test]
async fn test_delta_for_other_pair_is_discarded() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    relay.status().await.unwrap();

    feed.deliver(delta("kraken", "BTC-USD", 1));
    assert!(!relay.status().await.unwrap().has_delta);

    feed.deliver(delta("kraken", "ETH-USD", 1));
    assert!(relay.status().await.unwrap().has_delta);
}

#[tokio::test]
async fn test_stale_session_delta_is_discarded_even_for_same_pair() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    // Same pair, different exchange
    let coinbase_eth = SubscriptionTarget::new("coinbase", "ETH-USD");
    relay.connect(Some(coinbase_eth)).await.unwrap();

    let stale = feed.sessions()[0].clone();
    assert_eq!(feed.opened(), 2);
    assert!(!stale.is_open());
    stale.sink.deliver(delta("kraken", "ETH-USD", 1));
    assert!(!relay.status().await.unwrap().has_delta);

    feed.deliver(delta("coinbase", "ETH-USD", 2));
    assert!(relay.status().await.unwrap().has_delta);
}

// ============================================================================
// Client registry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_drops_only_that_client() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let mut first = relay.connect(None).await.unwrap();
    let gone = relay.connect(None).await.unwrap();
    let mut third = relay.connect(None).await.unwrap();
    drop(gone.messages);

    feed.deliver(delta("kraken", "ETH-USD", 5));
    sleep(INTERVAL + Duration::from_millis(10)).await;

    assert_eq!(bid_price(&first.messages.recv().await.unwrap()), 5.0);
    assert_eq!(bid_price(&third.messages.recv().await.unwrap()), 5.0);
    assert_eq!(relay.status().await.unwrap().clients, 2);
}

#[tokio::test(start_paused = true)]
async fn test_flush_nobody_received_does_not_delay_next_client() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let gone = relay.connect(None).await.unwrap();
    drop(gone.messages);
    feed.deliver(delta("kraken", "ETH-USD", 8));
    sleep(INTERVAL + Duration::from_millis(10)).await;

    let status = relay.status().await.unwrap();
    assert_eq!(status.clients, 0);
    assert_eq!(status.broadcasts, 0);

    // The emission clock never advanced, so the newcomer is flushed on connect
    let mut late = relay.connect(None).await.unwrap();
    relay.status().await.unwrap();
    assert_eq!(bid_price(&late.messages.try_recv().unwrap()), 8.0);
    assert_eq!(relay.status().await.unwrap().broadcasts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_client_is_dropped_when_queue_is_full() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config().with_client_queue_capacity(1));

    let mut reader = relay.connect(None).await.unwrap();
    let mut stalled = relay.connect(None).await.unwrap();

    for price in 1..=2 {
        feed.deliver(delta("kraken", "ETH-USD", price));
        sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(bid_price(&reader.messages.recv().await.unwrap()), price as f64);
    }

    assert_eq!(relay.status().await.unwrap().clients, 1);
    // The queued message is still readable, then the queue ends
    assert!(stalled.messages.recv().await.is_some());
    assert!(stalled.messages.recv().await.is_none());
}

#[tokio::test]
async fn test_registry_tracks_connect_disconnect_interleavings() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let mut live = Vec::new();
    for round in 0..20 {
        let subscription = relay.connect(None).await.unwrap();
        if round % 3 == 0 {
            relay.disconnect(subscription.id);
            // Repeated disconnects are harmless
            relay.disconnect(subscription.id);
        } else {
            live.push(subscription);
        }
        if round % 5 == 4 {
            let removed = live.remove(0);
            relay.disconnect(removed.id);
        }
        assert_eq!(relay.status().await.unwrap().clients, live.len());
    }
}

#[tokio::test]
async fn test_client_ids_are_unique() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());

    let a = relay.connect(None).await.unwrap();
    relay.disconnect(a.id);
    let b = relay.connect(Some(coinbase_btc())).await.unwrap();
    let c = relay.connect(None).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
    assert_ne!(a.id, c.id);
}

// ============================================================================
// Upstream faults
// ============================================================================

#[tokio::test]
async fn test_fault_moves_relay_to_no_session() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let _client = relay.connect(None).await.unwrap();

    feed.deliver(delta("kraken", "ETH-USD", 1));
    feed.fault("connection reset");

    let status = relay.status().await.unwrap();
    assert_eq!(status.state, "no_session");
    assert!(!status.session_active);
    assert!(!status.has_delta);
    assert_eq!(status.target, kraken_eth());
    assert_eq!(feed.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_restores_session_after_fault() {
    let feed = ManualFeed::new();
    let config = config().with_reconnect(Duration::from_secs(1), 3);
    let relay = spawn_relay(&feed, config);
    let mut client = relay.connect(None).await.unwrap();

    feed.fault("connection reset");
    sleep(Duration::from_millis(1500)).await;

    let status = relay.status().await.unwrap();
    assert_eq!(status.state, "active");
    assert_eq!(feed.opened(), 2);

    // Deltas from the new session reach existing subscribers
    feed.deliver(delta("kraken", "ETH-USD", 9));
    assert_eq!(bid_price(&client.messages.recv().await.unwrap()), 9.0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_gives_up_after_max_attempts() {
    let feed = ManualFeed::new();
    let config = config().with_reconnect(Duration::from_secs(1), 2);
    let relay = spawn_relay(&feed, config);
    relay.status().await.unwrap();

    feed.set_failing(true);
    feed.fault("connection reset");
    sleep(Duration::from_secs(5)).await;
    assert_eq!(relay.status().await.unwrap().state, "no_session");

    // Exchange comes back, but no attempts remain
    feed.set_failing(false);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(relay.status().await.unwrap().state, "no_session");
    assert_eq!(feed.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_switch_cancels_pending_reconnect() {
    let feed = ManualFeed::new();
    let config = config().with_reconnect(Duration::from_secs(1), 3);
    let relay = spawn_relay(&feed, config);
    relay.status().await.unwrap();

    feed.fault("connection reset");
    relay.connect(Some(coinbase_btc())).await.unwrap();
    sleep(Duration::from_secs(3)).await;

    let status = relay.status().await.unwrap();
    assert_eq!(status.target, coinbase_btc());
    assert_eq!(feed.opened(), 2);
    assert_eq!(feed.open_sessions(), 1);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    relay.status().await.unwrap();

    feed.fault("connection reset");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(relay.status().await.unwrap().state, "no_session");
    assert_eq!(feed.opened(), 1);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_clients_and_session() {
    let feed = ManualFeed::new();
    let relay = spawn_relay(&feed, config());
    let mut client = relay.connect(None).await.unwrap();

    relay.shutdown();
    assert!(client.messages.recv().await.is_none());
    assert_eq!(feed.open_sessions(), 0);
    assert!(relay.connect(None).await.is_err());
}
