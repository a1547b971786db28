//! Keep-alive driver against a scripted connection

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use conduit_client::config::KeepAliveConfig;
use conduit_client::keepalive::{
    CloseReason, ConnectionState, KeepAliveConnection, KeepAliveDriver, Protocol,
};
use futures::future::BoxFuture;
use parking_lot::Mutex;

#[derive(Default)]
struct FakeConnection {
    busy: AtomicBool,
    pings: Mutex<Vec<u64>>,
    closes: Mutex<Vec<CloseReason>>,
}

impl KeepAliveConnection for FakeConnection {
    fn send_ping(&self, seq: u64) -> BoxFuture<'static, io::Result<()>> {
        self.pings.lock().push(seq);
        Box::pin(async { Ok(()) })
    }

    fn close(&self, reason: CloseReason) -> BoxFuture<'static, ()> {
        self.closes.lock().push(reason);
        Box::pin(async {})
    }

    fn has_requests_in_progress(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_ping_closes_connection() {
    let connection = Arc::new(FakeConnection::default());
    let config = KeepAliveConfig::default().with_ping_interval(Some(Duration::from_secs(10)));
    let driver = KeepAliveDriver::spawn(config, Protocol::Http2, connection.clone())
        .expect("valid keep-alive config");

    driver.closed().await;

    assert_eq!(*connection.pings.lock(), vec![1]);
    assert_eq!(*connection.closes.lock(), vec![CloseReason::PingTimeout]);
    let status = driver.status();
    assert_eq!(status.state, ConnectionState::Closed);
    assert!(status.needs_disconnection);
    assert_eq!(status.close_reason, Some(CloseReason::PingTimeout));
}

#[tokio::test(start_paused = true)]
async fn test_busy_connection_outlives_idle_timeout() {
    let connection = Arc::new(FakeConnection::default());
    connection.busy.store(true, Ordering::SeqCst);
    let config = KeepAliveConfig::default().with_idle_timeout(Some(Duration::from_secs(30)));
    let driver = KeepAliveDriver::spawn(config, Protocol::Http1, connection.clone())
        .expect("valid keep-alive config");

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(driver.status().state, ConnectionState::Active);
    assert!(connection.closes.lock().is_empty());

    connection.busy.store(false, Ordering::SeqCst);
    driver.closed().await;
    assert_eq!(*connection.closes.lock(), vec![CloseReason::IdleTimeout]);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_when_finished_is_visible_immediately() {
    let connection = Arc::new(FakeConnection::default());
    connection.busy.store(true, Ordering::SeqCst);
    let driver = KeepAliveDriver::spawn(KeepAliveConfig::default(), Protocol::Http2, connection)
        .expect("valid keep-alive config");

    let mut status = driver.subscribe();
    driver.disconnect_when_finished();
    status
        .wait_for(|s| s.needs_disconnection)
        .await
        .expect("driver publishes the request");
    assert_eq!(driver.status().state, ConnectionState::Active);
}

#[tokio::test]
async fn test_destroy_stops_the_driver() {
    let connection = Arc::new(FakeConnection::default());
    let driver = KeepAliveDriver::spawn(KeepAliveConfig::default(), Protocol::Http1, connection.clone())
        .expect("valid keep-alive config");

    driver.destroy();
    driver.destroy();
    driver.closed().await;

    assert_eq!(driver.status().close_reason, Some(CloseReason::Destroyed));
    assert!(driver.needs_disconnection());
    assert!(connection.closes.lock().is_empty(), "destroy does not re-close");
}

#[tokio::test(start_paused = true)]
async fn test_finished_request_lets_pending_disconnect_close() {
    let connection = Arc::new(FakeConnection::default());
    connection.busy.store(true, Ordering::SeqCst);
    let driver = KeepAliveDriver::spawn(KeepAliveConfig::default(), Protocol::Http2, connection.clone())
        .expect("valid keep-alive config");

    driver.disconnect_when_finished();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(driver.status().state, ConnectionState::Active);

    connection.busy.store(false, Ordering::SeqCst);
    driver.on_request_finished();
    tokio::time::timeout(Duration::from_secs(1), driver.closed())
        .await
        .expect("closes once the last request finished");
    assert_eq!(*connection.closes.lock(), vec![CloseReason::DisconnectRequested]);
}

#[tokio::test(start_paused = true)]
async fn test_finished_request_lets_request_limit_close() {
    let connection = Arc::new(FakeConnection::default());
    connection.busy.store(true, Ordering::SeqCst);
    let config = KeepAliveConfig::default().with_max_requests_per_connection(1);
    let driver = KeepAliveDriver::spawn(config, Protocol::Http1, connection.clone())
        .expect("valid keep-alive config");

    driver.on_request();
    let mut status = driver.subscribe();
    status
        .wait_for(|s| s.needs_disconnection)
        .await
        .expect("limit reached");

    connection.busy.store(false, Ordering::SeqCst);
    driver.on_request_finished();
    tokio::time::timeout(Duration::from_secs(1), driver.closed())
        .await
        .expect("closes once idle");
    assert_eq!(*connection.closes.lock(), vec![CloseReason::MaxRequests]);
}

#[tokio::test]
async fn test_spawn_rejects_invalid_config() {
    let config = KeepAliveConfig::default().with_ping_interval(Some(Duration::ZERO));
    let err = KeepAliveDriver::spawn(config, Protocol::Http2, Arc::new(FakeConnection::default()))
        .expect_err("zero ping interval");
    assert!(err.is_builder());
}
