use std::sync::Arc;

use tokio::sync::watch;

use super::group::{EndpointGroup, GroupState, Publisher};
use super::Endpoint;

/// A fixed set of endpoints, ready from the start even when empty.
#[derive(Debug)]
pub struct StaticEndpointGroup {
    publisher: Publisher,
}

impl StaticEndpointGroup {
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        Self {
            publisher: Publisher::new(GroupState {
                endpoints: endpoints.into_iter().collect(),
                ready: true,
                closed: false,
            }),
        }
    }

    pub fn of(endpoint: Endpoint) -> Self {
        Self::new([endpoint])
    }
}

impl EndpointGroup for StaticEndpointGroup {
    fn endpoints(&self) -> Arc<[Endpoint]> {
        self.publisher.endpoints()
    }

    fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.publisher.subscribe()
    }

    fn close(&self) {
        self.publisher.close();
    }

    fn is_closed(&self) -> bool {
        self.publisher.is_closed()
    }
}
