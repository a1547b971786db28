use std::sync::Arc;

use futures::future::select_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::group::{EndpointGroup, GroupState, Publisher};
use super::Endpoint;

/// The concatenation of several groups, ready as soon as any of them is.
#[derive(Debug)]
pub struct CompositeEndpointGroup {
    children: Vec<Arc<dyn EndpointGroup>>,
    publisher: Arc<Publisher>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CompositeEndpointGroup {
    /// Must be called within a tokio runtime.
    pub fn new(children: Vec<Arc<dyn EndpointGroup>>) -> Self {
        let receivers: Vec<_> = children.iter().map(|c| c.subscribe()).collect();
        let (endpoints, ready) = combine(receivers.iter().map(|rx| rx.borrow().clone()));
        let publisher = Arc::new(Publisher::new(GroupState {
            endpoints,
            ready: ready || children.is_empty(),
            closed: false,
        }));

        let task = tokio::spawn(follow(receivers, Arc::clone(&publisher)));

        Self {
            children,
            publisher,
            task: Mutex::new(Some(task)),
        }
    }
}

fn combine(states: impl Iterator<Item = GroupState>) -> (Arc<[Endpoint]>, bool) {
    let mut endpoints = Vec::new();
    let mut ready = false;
    for state in states {
        endpoints.extend(state.endpoints.iter().cloned());
        ready |= state.ready;
    }
    (endpoints.into(), ready)
}

enum Child {
    Live(watch::Receiver<GroupState>),
    /// The child's sender is gone; its last snapshot keeps its position.
    Frozen(GroupState),
}

impl Child {
    fn state(&self) -> GroupState {
        match self {
            Child::Live(rx) => rx.borrow().clone(),
            Child::Frozen(state) => state.clone(),
        }
    }
}

async fn follow(receivers: Vec<watch::Receiver<GroupState>>, publisher: Arc<Publisher>) {
    let mut children: Vec<Child> = receivers.into_iter().map(Child::Live).collect();

    loop {
        let changes: Vec<_> = children
            .iter_mut()
            .enumerate()
            .filter_map(|(index, child)| match child {
                Child::Live(rx) => {
                    Some(Box::pin(async move { (index, rx.changed().await.is_ok()) }))
                }
                Child::Frozen(_) => None,
            })
            .collect();
        if changes.is_empty() {
            return;
        }

        let ((index, open), _, pending) = select_all(changes).await;
        drop(pending);
        if !open {
            children[index] = Child::Frozen(children[index].state());
        }

        let (endpoints, ready) = combine(children.iter().map(Child::state));
        if !publisher.update(endpoints, ready) {
            return;
        }
    }
}

impl EndpointGroup for CompositeEndpointGroup {
    fn endpoints(&self) -> Arc<[Endpoint]> {
        self.publisher.endpoints()
    }

    fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.publisher.subscribe()
    }

    fn close(&self) {
        self.publisher.close();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        for child in &self.children {
            child.close();
        }
    }

    fn is_closed(&self) -> bool {
        self.publisher.is_closed()
    }
}

impl Drop for CompositeEndpointGroup {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
