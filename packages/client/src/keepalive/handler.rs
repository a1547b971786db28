//! Connection liveness state machine
//!
//! The handler does no I/O and reads no clock: every time-dependent call takes
//! the current instant, and [`KeepAliveHandler::poll`] returns the action the
//! owner has to carry out. Callers must serialize all calls for one connection.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::KeepAliveConfig;

/// Wire protocol of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Any read or write also counts as a ping answer.
    Http1,
    /// Only a ping acknowledgement answers a ping.
    Http2,
}

impl Protocol {
    fn activity_resets_ping(self) -> bool {
        matches!(self, Protocol::Http1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    /// Closing was decided; the connection has not been torn down yet.
    Closing,
    /// Terminal.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    IdleTimeout,
    PingTimeout,
    MaxConnectionAge,
    MaxRequests,
    DisconnectRequested,
    PeerClosing,
    Destroyed,
}

/// What the owner of the connection has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    None,
    SendPing(u64),
    Close(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PingState {
    Idle,
    PendingAck { seq: u64, sent_at: Instant },
}

/// Per-connection liveness tracking
#[derive(Debug)]
pub struct KeepAliveHandler {
    config: KeepAliveConfig,
    protocol: Protocol,
    state: ConnectionState,
    ping: PingState,
    ping_seq: u64,
    created_at: Instant,
    last_activity: Instant,
    last_ping_activity: Instant,
    requests: u64,
    disconnect_requested: bool,
    max_age_exceeded: bool,
    close_reason: Option<CloseReason>,
}

impl KeepAliveHandler {
    /// A zero interval or timeout disables the corresponding timer.
    pub fn new(mut config: KeepAliveConfig, protocol: Protocol, now: Instant) -> Self {
        for timer in [
            &mut config.ping_interval,
            &mut config.idle_timeout,
            &mut config.max_connection_age,
        ] {
            *timer = timer.filter(|d| !d.is_zero());
        }
        Self {
            config,
            protocol,
            state: ConnectionState::Active,
            ping: PingState::Idle,
            ping_seq: 0,
            created_at: now,
            last_activity: now,
            last_ping_activity: now,
            requests: 0,
            disconnect_requested: false,
            max_age_exceeded: false,
            close_reason: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn is_closing(&self) -> bool {
        self.state != ConnectionState::Active
    }

    pub fn is_pending_ping_ack(&self) -> bool {
        matches!(self.ping, PingState::PendingAck { .. })
    }

    /// Bytes were read or written.
    pub fn on_read_or_write(&mut self, now: Instant) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.last_activity = now;
        if self.protocol.activity_resets_ping() {
            self.ping = PingState::Idle;
            self.last_ping_activity = now;
        }
    }

    /// A ping acknowledgement arrived. Returns whether it matched the
    /// outstanding ping.
    pub fn on_ping_ack(&mut self, seq: u64, now: Instant) -> bool {
        match self.ping {
            PingState::PendingAck { seq: expected, .. } if expected == seq => {
                self.ping = PingState::Idle;
                self.last_ping_activity = now;
                true
            }
            _ => false,
        }
    }

    /// A new request was started on the connection.
    pub fn on_request(&mut self, now: Instant) {
        self.last_activity = now;
        if self.config.max_requests_per_connection > 0 {
            self.requests += 1;
        }
    }

    /// A request completed; the connection may now be idle.
    pub fn on_request_finished(&mut self, now: Instant) {
        if self.state == ConnectionState::Active {
            self.last_activity = now;
        }
    }

    /// The peer announced it is going away (GOAWAY, `Connection: close`).
    pub fn on_peer_closing(&mut self) {
        self.start_closing(CloseReason::PeerClosing);
    }

    /// Close once in-flight requests are done.
    pub fn disconnect_when_finished(&mut self) {
        self.disconnect_requested = true;
    }

    /// Whether the connection must not take new requests.
    pub fn needs_disconnection(&self) -> bool {
        self.state == ConnectionState::Closed
            || self.disconnect_requested
            || self.max_age_exceeded
            || self.max_requests_reached()
    }

    /// Forces the terminal state. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        self.ping = PingState::Idle;
        self.close_reason.get_or_insert(CloseReason::Destroyed);
    }

    /// Evaluates the timers at `now`.
    ///
    /// A `Close` action is returned once; the handler is `Closing` afterwards
    /// until [`destroy`](Self::destroy) is called.
    pub fn poll(&mut self, now: Instant, has_requests_in_progress: bool) -> KeepAliveAction {
        if self.state != ConnectionState::Active {
            return KeepAliveAction::None;
        }

        if let Some(age) = self.config.max_connection_age
            && !self.max_age_exceeded
            && now.saturating_duration_since(self.created_at) >= age
        {
            debug!("connection exceeded max age {:?}", age);
            self.max_age_exceeded = true;
        }

        if let (PingState::PendingAck { sent_at, .. }, Some(interval)) =
            (self.ping, self.config.ping_interval)
            && now.saturating_duration_since(sent_at) >= interval
        {
            return self.close(CloseReason::PingTimeout);
        }

        if let Some(idle) = self.config.idle_timeout
            && now.saturating_duration_since(self.last_activity) >= idle
        {
            if !has_requests_in_progress {
                return self.close(CloseReason::IdleTimeout);
            }
            // Busy but silent: start a new idle period.
            self.last_activity = now;
        }

        if !has_requests_in_progress {
            if self.max_age_exceeded {
                return self.close(CloseReason::MaxConnectionAge);
            }
            if self.max_requests_reached() {
                return self.close(CloseReason::MaxRequests);
            }
            if self.disconnect_requested {
                return self.close(CloseReason::DisconnectRequested);
            }
        }

        if let (PingState::Idle, Some(interval)) = (self.ping, self.config.ping_interval)
            && now.saturating_duration_since(self.last_ping_activity) >= interval
        {
            self.ping_seq += 1;
            self.ping = PingState::PendingAck {
                seq: self.ping_seq,
                sent_at: now,
            };
            debug!("sending keep-alive ping {}", self.ping_seq);
            return KeepAliveAction::SendPing(self.ping_seq);
        }

        KeepAliveAction::None
    }

    /// Writing the ping failed; stop waiting for its acknowledgement.
    pub fn on_ping_write_failed(&mut self, now: Instant) {
        if self.is_pending_ping_ack() {
            self.ping = PingState::Idle;
            self.last_ping_activity = now;
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) may act on a timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state != ConnectionState::Active {
            return None;
        }

        let after = |from: Instant, d: Option<Duration>| d.map(|d| from + d);
        let ping = match self.ping {
            PingState::Idle => after(self.last_ping_activity, self.config.ping_interval),
            PingState::PendingAck { sent_at, .. } => after(sent_at, self.config.ping_interval),
        };
        let age = if self.max_age_exceeded {
            None
        } else {
            after(self.created_at, self.config.max_connection_age)
        };

        [ping, after(self.last_activity, self.config.idle_timeout), age]
            .into_iter()
            .flatten()
            .min()
    }

    fn max_requests_reached(&self) -> bool {
        self.config.max_requests_per_connection > 0
            && self.requests >= self.config.max_requests_per_connection
    }

    fn close(&mut self, reason: CloseReason) -> KeepAliveAction {
        self.start_closing(reason);
        KeepAliveAction::Close(reason)
    }

    fn start_closing(&mut self, reason: CloseReason) {
        if self.state == ConnectionState::Active {
            debug!("closing connection: {:?}", reason);
            self.state = ConnectionState::Closing;
            self.close_reason = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn pinging(protocol: Protocol) -> (KeepAliveHandler, Instant) {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default().with_ping_interval(Some(secs(10)));
        (KeepAliveHandler::new(config, protocol, t0), t0)
    }

    #[test]
    fn ping_is_sent_after_interval_and_acked() {
        let (mut handler, t0) = pinging(Protocol::Http2);

        assert_eq!(handler.poll(t0 + secs(5), false), KeepAliveAction::None);
        assert_eq!(handler.poll(t0 + secs(10), false), KeepAliveAction::SendPing(1));
        assert!(handler.is_pending_ping_ack());

        assert!(!handler.on_ping_ack(7, t0 + secs(11)), "stale ack is ignored");
        assert!(handler.on_ping_ack(1, t0 + secs(11)));
        assert_eq!(handler.poll(t0 + secs(15), false), KeepAliveAction::None);
        assert_eq!(handler.poll(t0 + secs(21), false), KeepAliveAction::SendPing(2));
    }

    #[test]
    fn unanswered_ping_closes() {
        let (mut handler, t0) = pinging(Protocol::Http2);
        assert_eq!(handler.poll(t0 + secs(10), false), KeepAliveAction::SendPing(1));

        assert_eq!(handler.poll(t0 + secs(19), true), KeepAliveAction::None);
        assert_eq!(
            handler.poll(t0 + secs(20), true),
            KeepAliveAction::Close(CloseReason::PingTimeout)
        );
        assert_eq!(handler.state(), ConnectionState::Closing);
        assert_eq!(handler.poll(t0 + secs(30), false), KeepAliveAction::None);
    }

    #[test]
    fn http1_activity_counts_as_ping_answer() {
        let (mut h1, t0) = pinging(Protocol::Http1);
        h1.on_read_or_write(t0 + secs(8));
        assert_eq!(h1.poll(t0 + secs(10), false), KeepAliveAction::None);
        assert_eq!(h1.poll(t0 + secs(18), false), KeepAliveAction::SendPing(1));
        h1.on_read_or_write(t0 + secs(19));
        assert!(!h1.is_pending_ping_ack());

        let (mut h2, t0) = pinging(Protocol::Http2);
        h2.on_read_or_write(t0 + secs(8));
        assert_eq!(h2.poll(t0 + secs(10), false), KeepAliveAction::SendPing(1));
        h2.on_read_or_write(t0 + secs(12));
        assert!(h2.is_pending_ping_ack());
    }

    #[test]
    fn idle_close_waits_for_requests_to_finish() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default().with_idle_timeout(Some(secs(30)));
        let mut handler = KeepAliveHandler::new(config, Protocol::Http1, t0);

        assert_eq!(handler.poll(t0 + secs(30), true), KeepAliveAction::None);
        assert_eq!(handler.poll(t0 + secs(45), false), KeepAliveAction::None);
        assert_eq!(
            handler.poll(t0 + secs(60), false),
            KeepAliveAction::Close(CloseReason::IdleTimeout)
        );
    }

    #[test]
    fn max_age_flags_then_closes_when_idle() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default().with_max_connection_age(Some(secs(60)));
        let mut handler = KeepAliveHandler::new(config, Protocol::Http2, t0);

        assert!(!handler.needs_disconnection());
        assert_eq!(handler.poll(t0 + secs(60), true), KeepAliveAction::None);
        assert!(handler.needs_disconnection());
        assert_eq!(
            handler.poll(t0 + secs(61), false),
            KeepAliveAction::Close(CloseReason::MaxConnectionAge)
        );
    }

    #[test]
    fn request_limit_and_disconnect_request() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default().with_max_requests_per_connection(2);
        let mut handler = KeepAliveHandler::new(config, Protocol::Http1, t0);
        handler.on_request(t0);
        assert!(!handler.needs_disconnection());
        handler.on_request(t0);
        assert!(handler.needs_disconnection());
        assert_eq!(handler.poll(t0, true), KeepAliveAction::None);
        assert_eq!(
            handler.poll(t0, false),
            KeepAliveAction::Close(CloseReason::MaxRequests)
        );

        let mut handler = KeepAliveHandler::new(KeepAliveConfig::default(), Protocol::Http1, t0);
        handler.disconnect_when_finished();
        assert!(handler.needs_disconnection());
        assert_eq!(handler.poll(t0, true), KeepAliveAction::None);
        assert_eq!(
            handler.poll(t0, false),
            KeepAliveAction::Close(CloseReason::DisconnectRequested)
        );
    }

    #[test]
    fn destroy_is_terminal_and_idempotent() {
        let (mut handler, t0) = pinging(Protocol::Http2);
        handler.destroy();
        handler.destroy();

        assert_eq!(handler.state(), ConnectionState::Closed);
        assert_eq!(handler.close_reason(), Some(CloseReason::Destroyed));
        assert!(handler.needs_disconnection());
        assert_eq!(handler.poll(t0 + secs(100), false), KeepAliveAction::None);
        assert!(handler.next_deadline().is_none());
    }

    #[test]
    fn next_deadline_is_earliest_timer() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default()
            .with_ping_interval(Some(secs(10)))
            .with_idle_timeout(Some(secs(30)))
            .with_max_connection_age(Some(secs(5)));
        let handler = KeepAliveHandler::new(config, Protocol::Http2, t0);
        assert_eq!(handler.next_deadline(), Some(t0 + secs(5)));

        let handler = KeepAliveHandler::new(KeepAliveConfig::default(), Protocol::Http2, t0);
        assert!(handler.next_deadline().is_none());
    }

    #[test]
    fn zero_durations_disable_timers() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default()
            .with_ping_interval(Some(Duration::ZERO))
            .with_idle_timeout(Some(Duration::ZERO));
        let mut handler = KeepAliveHandler::new(config, Protocol::Http2, t0);

        assert!(handler.next_deadline().is_none());
        assert_eq!(handler.poll(t0 + secs(100), false), KeepAliveAction::None);
    }

    #[test]
    fn finished_request_restarts_idle_period() {
        let t0 = Instant::now();
        let config = KeepAliveConfig::default().with_idle_timeout(Some(secs(30)));
        let mut handler = KeepAliveHandler::new(config, Protocol::Http1, t0);

        handler.on_request_finished(t0 + secs(20));
        assert_eq!(handler.next_deadline(), Some(t0 + secs(50)));
        assert_eq!(handler.poll(t0 + secs(40), false), KeepAliveAction::None);
    }
}
