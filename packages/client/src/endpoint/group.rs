use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;

use super::Endpoint;

/// What subscribers of a group observe.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub endpoints: Arc<[Endpoint]>,
    pub ready: bool,
    pub closed: bool,
}

/// An observable set of endpoints.
///
/// Snapshots are replaced whole. Once closed a group publishes nothing more.
pub trait EndpointGroup: Send + Sync + fmt::Debug {
    /// The current snapshot.
    fn endpoints(&self) -> Arc<[Endpoint]>;

    /// Receives every snapshot replacement and lifecycle change.
    fn subscribe(&self) -> watch::Receiver<GroupState>;

    /// Stops publishing. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool {
        self.subscribe().borrow().closed
    }

    /// Completes with the first ready snapshot.
    ///
    /// Fails with `EndpointGroupClosed` if the group closes before it is ready.
    fn when_ready(&self) -> BoxFuture<'static, crate::Result<Arc<[Endpoint]>>> {
        let mut rx = self.subscribe();
        Box::pin(async move {
            let (ready, endpoints) = {
                let state = rx
                    .wait_for(|s| s.ready || s.closed)
                    .await
                    .map_err(|_| crate::error::endpoint_group_closed())?;
                (state.ready, Arc::clone(&state.endpoints))
            };
            if ready {
                Ok(endpoints)
            } else {
                Err(crate::error::endpoint_group_closed())
            }
        })
    }
}

/// The sending half every group implementation publishes through.
#[derive(Debug)]
pub(crate) struct Publisher {
    tx: watch::Sender<GroupState>,
}

impl Publisher {
    pub(crate) fn new(initial: GroupState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.tx.subscribe()
    }

    pub(crate) fn endpoints(&self) -> Arc<[Endpoint]> {
        Arc::clone(&self.tx.borrow().endpoints)
    }

    /// Replaces the snapshot; `false` once the group is closed.
    pub(crate) fn update(&self, endpoints: Arc<[Endpoint]>, ready: bool) -> bool {
        let mut open = true;
        self.tx.send_if_modified(|state| {
            if state.closed {
                open = false;
                return false;
            }
            let changed = *state.endpoints != *endpoints || (ready && !state.ready);
            state.endpoints = endpoints;
            state.ready |= ready;
            changed
        });
        open
    }

    /// Marks the group closed; `true` only for the first call.
    pub(crate) fn close(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.closed = true;
            true
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }
}
