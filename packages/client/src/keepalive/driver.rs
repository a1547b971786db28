//! Task that owns a [`KeepAliveHandler`] for one connection
//!
//! Events from the connection are funneled through a channel, so the handler
//! sees them one at a time. Timers are evaluated between events.

use std::io;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::handler::{CloseReason, ConnectionState, KeepAliveAction, KeepAliveHandler, Protocol};
use crate::config::{KeepAliveConfig, Validator};

/// The connection side the driver acts upon.
pub trait KeepAliveConnection: Send + Sync + 'static {
    fn send_ping(&self, seq: u64) -> BoxFuture<'static, io::Result<()>>;

    fn close(&self, reason: CloseReason) -> BoxFuture<'static, ()>;

    fn has_requests_in_progress(&self) -> bool;
}

/// Snapshot published after every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveStatus {
    pub state: ConnectionState,
    pub needs_disconnection: bool,
    pub close_reason: Option<CloseReason>,
}

impl KeepAliveStatus {
    fn of(handler: &KeepAliveHandler) -> Self {
        Self {
            state: handler.state(),
            needs_disconnection: handler.needs_disconnection(),
            close_reason: handler.close_reason(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    ReadOrWrite,
    PingAck(u64),
    Request,
    RequestFinished,
    PeerClosing,
    DisconnectWhenFinished,
    Destroy,
}

/// Handle to a running keep-alive task
#[derive(Debug)]
pub struct KeepAliveDriver {
    events: mpsc::UnboundedSender<Event>,
    status: watch::Receiver<KeepAliveStatus>,
    task: JoinHandle<()>,
}

impl KeepAliveDriver {
    /// Starts the task. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// A `Builder` error when `config` does not validate.
    pub fn spawn<C: KeepAliveConnection>(
        config: KeepAliveConfig,
        protocol: Protocol,
        connection: Arc<C>,
    ) -> crate::Result<Self> {
        config.validate()?;
        let handler = KeepAliveHandler::new(config, protocol, Instant::now());
        let (status_tx, status) = watch::channel(KeepAliveStatus::of(&handler));
        let (events, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(handler, connection, rx, status_tx));
        Ok(Self {
            events,
            status,
            task,
        })
    }

    fn send(&self, event: Event) {
        // The task is gone once the connection is closed; late events are moot.
        let _ = self.events.send(event);
    }

    pub fn on_read_or_write(&self) {
        self.send(Event::ReadOrWrite);
    }

    pub fn on_ping_ack(&self, seq: u64) {
        self.send(Event::PingAck(seq));
    }

    pub fn on_request(&self) {
        self.send(Event::Request);
    }

    /// Lets a pending disconnect or limit close the connection once it is idle.
    pub fn on_request_finished(&self) {
        self.send(Event::RequestFinished);
    }

    pub fn on_peer_closing(&self) {
        self.send(Event::PeerClosing);
    }

    pub fn disconnect_when_finished(&self) {
        self.send(Event::DisconnectWhenFinished);
    }

    /// The connection is gone; stops the task.
    pub fn destroy(&self) {
        self.send(Event::Destroy);
    }

    pub fn status(&self) -> KeepAliveStatus {
        *self.status.borrow()
    }

    pub fn needs_disconnection(&self) -> bool {
        self.status().needs_disconnection
    }

    pub fn subscribe(&self) -> watch::Receiver<KeepAliveStatus> {
        self.status.clone()
    }

    /// Waits until the connection reached the terminal state.
    pub async fn closed(&self) {
        let mut status = self.status.clone();
        // An error means the task ended, which only happens once closed.
        let _ = status
            .wait_for(|s| s.state == ConnectionState::Closed)
            .await;
    }
}

impl Drop for KeepAliveDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<C: KeepAliveConnection>(
    mut handler: KeepAliveHandler,
    connection: Arc<C>,
    mut events: mpsc::UnboundedReceiver<Event>,
    status: watch::Sender<KeepAliveStatus>,
) {
    loop {
        let now = Instant::now();
        match handler.poll(now, connection.has_requests_in_progress()) {
            KeepAliveAction::None => {}
            KeepAliveAction::SendPing(seq) => {
                if let Err(e) = connection.send_ping(seq).await {
                    debug!("keep-alive ping {} write failed: {}", seq, e);
                    handler.on_ping_write_failed(Instant::now());
                }
            }
            KeepAliveAction::Close(reason) => {
                status.send_replace(KeepAliveStatus::of(&handler));
                connection.close(reason).await;
                handler.destroy();
                status.send_replace(KeepAliveStatus::of(&handler));
                return;
            }
        }
        status.send_replace(KeepAliveStatus::of(&handler));

        let deadline = handler.next_deadline();
        let timer = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => futures::future::pending::<()>().await,
            }
        };

        tokio::select! {
            event = events.recv() => {
                let now = Instant::now();
                match event {
                    Some(Event::ReadOrWrite) => handler.on_read_or_write(now),
                    Some(Event::PingAck(seq)) => {
                        if !handler.on_ping_ack(seq, now) {
                            debug!("ignoring ping ack {} with unexpected sequence", seq);
                        }
                    }
                    Some(Event::Request) => handler.on_request(now),
                    Some(Event::RequestFinished) => handler.on_request_finished(now),
                    Some(Event::PeerClosing) => handler.on_peer_closing(),
                    Some(Event::DisconnectWhenFinished) => handler.disconnect_when_finished(),
                    Some(Event::Destroy) | None => {
                        handler.destroy();
                        status.send_replace(KeepAliveStatus::of(&handler));
                        return;
                    }
                }
            }
            () = timer => {}
        }
    }
}
